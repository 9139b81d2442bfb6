//! gilrs-backed Controller Driver
//!
//! The gilrs context lives on a dedicated polling thread. The thread folds the
//! selected pad's button and axis state into [`ControllerState`] snapshots and
//! forwards them over the state sequence: immediately on a change, and once
//! per report interval otherwise, since gilrs is silent while a stick is held
//! still. Rumble requests reach the thread through a command channel.
//!
//! ```text
//! gilrs ──► StateCollector<Collecting> ──► mpsc<ControllerState> ──► event loop
//!                 ▲
//!           DriverCommand (rumble, close)
//! ```

use crate::controller::buttons::{Button, ButtonMask};
use crate::controller::driver::{
    Capabilities, ControllerDriver, ControllerEvents, ControllerState, DeviceInfo, DeviceKind,
    DriverError, SensorSample, StickSample,
};
use crate::controller::rumble::RumbleSet;
use chrono::Local;
use gilrs::ff::{BaseEffect, BaseEffectType, Effect, EffectBuilder, Replay, Ticks};
use gilrs::{Axis, Event, EventType, GamepadId, Gilrs, PowerInfo};
use statum::{machine, state};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const EVENT_BUFFER: usize = 1000;
const RUMBLE_MS: u32 = 200;

/// Report-layout bit for every gilrs button a Joy-Con exposes
const BUTTON_MAP: [(gilrs::Button, Button); 18] = [
    (gilrs::Button::West, Button::Y),
    (gilrs::Button::North, Button::X),
    (gilrs::Button::South, Button::B),
    (gilrs::Button::East, Button::A),
    (gilrs::Button::Select, Button::Minus),
    (gilrs::Button::Start, Button::Plus),
    (gilrs::Button::RightThumb, Button::RightStick),
    (gilrs::Button::LeftThumb, Button::LeftStick),
    (gilrs::Button::Mode, Button::Home),
    (gilrs::Button::Z, Button::Capture),
    (gilrs::Button::DPadDown, Button::Down),
    (gilrs::Button::DPadUp, Button::Up),
    (gilrs::Button::DPadRight, Button::Right),
    (gilrs::Button::DPadLeft, Button::Left),
    (gilrs::Button::RightTrigger2, Button::Sr),
    (gilrs::Button::RightTrigger, Button::Sl),
    (gilrs::Button::LeftTrigger, Button::L),
    (gilrs::Button::LeftTrigger2, Button::Zl),
];

#[derive(Clone, Debug)]
pub struct CollectorSettings {
    pub poll_interval: Duration,
    /// Longest gap between two snapshots
    pub report_interval: Duration,
    /// Gyro pointer motion is enabled downstream
    pub gyro_requested: bool,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_micros(100),
            report_interval: Duration::from_millis(15),
            gyro_requested: false,
        }
    }
}

/// Paces snapshots to the report interval
#[derive(Debug, Clone, Copy)]
struct ReportTimer {
    interval: Duration,
    last: Option<Instant>,
}

impl ReportTimer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether a snapshot goes out at `now`; starts a new period if so.
    fn due(&mut self, changed: bool, now: Instant) -> bool {
        let elapsed = self
            .last
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if changed || elapsed {
            self.last = Some(now);
        }
        changed || elapsed
    }
}

const NO_GYRO_NOTICE: &str =
    "gyro_apply is set, but gilrs exposes no motion sensors; the gyro will not move the pointer";

fn gyro_unavailable_notice(settings: &CollectorSettings) -> Option<&'static str> {
    settings.gyro_requested.then_some(NO_GYRO_NOTICE)
}

#[derive(Debug)]
enum DriverCommand {
    Rumble(RumbleSet),
    Close,
}

/// Creates the gilrs context used for discovery and connect.
pub fn open() -> Result<Gilrs, DriverError> {
    info!("Initializing gilrs controller interface");
    Gilrs::new().map_err(|e| {
        error!("Failed to initialize gilrs: {}", e);
        DriverError::InitializationError(e.to_string())
    })
}

fn device_path(id: GamepadId) -> String {
    format!("gilrs:{}", usize::from(id))
}

/// Lists connected pads of the requested category, in enumeration order.
pub fn search(gilrs: &Gilrs, kind: DeviceKind) -> Result<Vec<DeviceInfo>, DriverError> {
    let devices: Vec<DeviceInfo> = gilrs
        .gamepads()
        .filter_map(|(id, gamepad)| {
            debug!("Found gamepad {}: {} ({:?})", id, gamepad.name(), gamepad.uuid());
            let found = DeviceKind::from_name(gamepad.name())?;
            (found == kind).then(|| DeviceInfo {
                path: device_path(id),
                name: gamepad.name().to_string(),
                kind: found,
            })
        })
        .collect();

    if devices.is_empty() {
        return Err(DriverError::NoDeviceError(format!(
            "no connected gamepad matches \"{}\"",
            kind.name_pattern()
        )));
    }
    info!("Found {} matching gamepad(s)", devices.len());
    Ok(devices)
}

#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
pub struct StateCollector<S: CollectionState> {
    gilrs: Gilrs,
    gamepad: GamepadId,
    kind: DeviceKind,
    settings: CollectorSettings,
    state_sender: mpsc::Sender<ControllerState>,
    sensor_sender: mpsc::Sender<SensorSample>,
    commands: std_mpsc::Receiver<DriverCommand>,
    battery: u8,
    effect: Option<Effect>,
    timer: ReportTimer,
}

impl StateCollector<Initializing> {
    fn create(
        gilrs: Gilrs,
        device: &DeviceInfo,
        settings: CollectorSettings,
        state_sender: mpsc::Sender<ControllerState>,
        sensor_sender: mpsc::Sender<SensorSample>,
        commands: std_mpsc::Receiver<DriverCommand>,
    ) -> Result<Self, DriverError> {
        let gamepad = gilrs
            .gamepads()
            .find(|(id, _)| device_path(*id) == device.path)
            .map(|(id, _)| id)
            .ok_or_else(|| DriverError::ConnectError {
                path: device.path.clone(),
                reason: "device is no longer connected".to_string(),
            })?;

        debug!("Creating state collector for {} ({})", device.name, device.path);
        let timer = ReportTimer::new(settings.report_interval);
        Ok(Self::new(
            gilrs,
            gamepad,
            device.kind,
            settings,
            state_sender,
            sensor_sender,
            commands,
            100,
            None,
            timer,
        ))
    }

    fn initialize(mut self) -> Result<StateCollector<Collecting>, DriverError> {
        let gamepad = self.gilrs.gamepad(self.gamepad);
        if !gamepad.is_connected() {
            return Err(DriverError::ConnectError {
                path: device_path(self.gamepad),
                reason: "gamepad disconnected during handshake".to_string(),
            });
        }
        info!(
            "Collector bound to {} (force feedback: {})",
            gamepad.name(),
            gamepad.is_ff_supported()
        );
        match gyro_unavailable_notice(&self.settings) {
            Some(notice) => info!("{}", notice),
            None => debug!("gilrs exposes no motion sensors; sensor sequence stays idle"),
        }

        if let Some(level) = battery_percent(gamepad.power_info()) {
            self.battery = level;
        }
        Ok(self.transition())
    }
}

impl StateCollector<Collecting> {
    fn run_collection_loop(&mut self) {
        info!("Starting state collection loop");
        loop {
            match self.commands.try_recv() {
                Ok(DriverCommand::Rumble(set)) => {
                    if let Err(e) = self.play_rumble(&set) {
                        warn!("Rumble failed: {}", e);
                    }
                }
                Ok(DriverCommand::Close) | Err(std_mpsc::TryRecvError::Disconnected) => {
                    info!("Driver closed, stopping collection loop");
                    return;
                }
                Err(std_mpsc::TryRecvError::Empty) => {}
            }

            let mut changed = false;
            while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
                if id != self.gamepad {
                    continue;
                }
                match event {
                    EventType::Disconnected => {
                        warn!("Controller disconnected");
                        return;
                    }
                    EventType::ButtonPressed(..)
                    | EventType::ButtonReleased(..)
                    | EventType::AxisChanged(..) => changed = true,
                    _ => {}
                }
            }

            if self.timer.due(changed, Instant::now()) {
                let snapshot = self.snapshot();
                if self.state_sender.blocking_send(snapshot).is_err() {
                    debug!("State receiver dropped, stopping collection loop");
                    return;
                }
            }
            if self.sensor_sender.is_closed() {
                debug!("Sensor receiver dropped, stopping collection loop");
                return;
            }

            std::thread::sleep(self.settings.poll_interval);
        }
    }

    fn snapshot(&mut self) -> ControllerState {
        let gamepad = self.gilrs.gamepad(self.gamepad);
        let buttons = BUTTON_MAP
            .iter()
            .filter(|(source, _)| gamepad.is_pressed(*source))
            .fold(ButtonMask::EMPTY, |mask, (_, button)| mask | button.mask());

        if let Some(level) = battery_percent(gamepad.power_info()) {
            self.battery = level;
        }

        ControllerState {
            buttons,
            battery: self.battery,
            left_stick: StickSample::new(
                gamepad.value(Axis::LeftStickX),
                gamepad.value(Axis::LeftStickY),
            ),
            right_stick: StickSample::new(
                gamepad.value(Axis::RightStickX),
                gamepad.value(Axis::RightStickY),
            ),
            timestamp: Local::now(),
        }
    }

    fn play_rumble(&mut self, set: &RumbleSet) -> Result<(), DriverError> {
        if !self.gilrs.gamepad(self.gamepad).is_ff_supported() {
            return Err(DriverError::Unsupported("force feedback".to_string()));
        }
        let side = match self.kind {
            DeviceKind::Right => set.right,
            DeviceKind::Left | DeviceKind::ProController => set.left,
        };
        if side.is_silent() {
            // dropping the effect stops playback
            self.effect = None;
            return Ok(());
        }

        let effect = EffectBuilder::new()
            .add_effect(base_effect(BaseEffectType::Strong {
                magnitude: amplitude(side.lo_amp),
            }))
            .add_effect(base_effect(BaseEffectType::Weak {
                magnitude: amplitude(side.hi_amp),
            }))
            .gamepads(&[self.gamepad])
            .finish(&mut self.gilrs)
            .map_err(|e| DriverError::RumbleError(e.to_string()))?;
        effect
            .play()
            .map_err(|e| DriverError::RumbleError(e.to_string()))?;
        debug!("Playing rumble {:?}", side);
        self.effect = Some(effect);
        Ok(())
    }
}

fn base_effect(kind: BaseEffectType) -> BaseEffect {
    BaseEffect {
        kind,
        scheduling: Replay {
            play_for: Ticks::from_ms(RUMBLE_MS),
            ..Default::default()
        },
        envelope: Default::default(),
    }
}

fn amplitude(amp: u8) -> u16 {
    u16::from(amp) * 257
}

fn battery_percent(info: PowerInfo) -> Option<u8> {
    match info {
        PowerInfo::Discharging(level) | PowerInfo::Charging(level) => Some(level),
        PowerInfo::Charged | PowerInfo::Wired => Some(100),
        _ => None,
    }
}

/// Open handle to a gilrs pad
///
/// Dropping the handle closes it.
pub struct GilrsDriver {
    device: DeviceInfo,
    commands: std_mpsc::Sender<DriverCommand>,
    worker: Option<JoinHandle<()>>,
}

impl GilrsDriver {
    /// Binds `device` and starts the polling thread.
    pub fn connect(
        gilrs: Gilrs,
        device: &DeviceInfo,
        settings: CollectorSettings,
    ) -> Result<(Self, ControllerEvents), DriverError> {
        info!("Connecting to {} at {}", device.name, device.path);

        let (state_sender, states) = mpsc::channel(EVENT_BUFFER);
        let (sensor_sender, sensors) = mpsc::channel(EVENT_BUFFER);
        let (command_sender, commands) = std_mpsc::channel();

        let mut collector = StateCollector::create(
            gilrs,
            device,
            settings,
            state_sender,
            sensor_sender,
            commands,
        )?
        .initialize()?;

        let worker = std::thread::Builder::new()
            .name("controller-driver".to_string())
            .spawn(move || collector.run_collection_loop())
            .map_err(|e| DriverError::ConnectError {
                path: device.path.clone(),
                reason: e.to_string(),
            })?;

        Ok((
            Self {
                device: device.clone(),
                commands: command_sender,
                worker: Some(worker),
            },
            ControllerEvents { states, sensors },
        ))
    }
}

impl ControllerDriver for GilrsDriver {
    fn name(&self) -> &str {
        &self.device.name
    }

    fn capabilities(&self) -> Capabilities {
        self.device.kind.into()
    }

    fn subcommand(&self, payload: &[u8]) -> Result<(), DriverError> {
        Err(DriverError::Unsupported(format!(
            "subcommand {:02X?} over gilrs",
            payload
        )))
    }

    fn rumble(&self, set: &RumbleSet) -> Result<(), DriverError> {
        self.commands
            .send(DriverCommand::Rumble(*set))
            .map_err(|e| DriverError::ChannelError(e.to_string()))
    }

    fn close(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        info!("Closing {}", self.device.name);
        // the worker may already be gone after a disconnect
        let _ = self.commands.send(DriverCommand::Close);
        if worker.join().is_err() {
            error!("Controller driver thread panicked");
        }
    }
}

impl Drop for GilrsDriver {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::rumble::Rumble;

    #[test]
    fn button_map_has_unique_targets() {
        let mask = BUTTON_MAP
            .iter()
            .fold(ButtonMask::EMPTY, |mask, (_, button)| mask | button.mask());
        assert_eq!(mask.bits().count_ones() as usize, BUTTON_MAP.len());
    }

    #[test]
    fn held_still_pad_still_reports_every_interval() {
        let start = Instant::now();
        let mut timer = ReportTimer::new(Duration::from_millis(15));

        assert!(timer.due(false, start), "first poll reports");
        assert!(!timer.due(false, start + Duration::from_millis(5)));
        assert!(!timer.due(false, start + Duration::from_millis(14)));
        assert!(timer.due(false, start + Duration::from_millis(15)));
        assert!(!timer.due(false, start + Duration::from_millis(20)));
        assert!(timer.due(false, start + Duration::from_millis(31)));
    }

    #[test]
    fn changes_report_immediately_and_restart_the_period() {
        let start = Instant::now();
        let mut timer = ReportTimer::new(Duration::from_millis(15));
        assert!(timer.due(false, start));

        assert!(timer.due(true, start + Duration::from_millis(2)));
        assert!(!timer.due(false, start + Duration::from_millis(15)));
        assert!(timer.due(false, start + Duration::from_millis(17)));
    }

    #[test]
    fn missing_gyro_is_announced_only_when_requested() {
        let mut settings = CollectorSettings::default();
        assert_eq!(gyro_unavailable_notice(&settings), None);

        settings.gyro_requested = true;
        assert!(gyro_unavailable_notice(&settings)
            .is_some_and(|notice| notice.contains("gyro_apply")));
    }

    #[test]
    fn battery_levels_from_power_info() {
        assert_eq!(battery_percent(PowerInfo::Discharging(42)), Some(42));
        assert_eq!(battery_percent(PowerInfo::Wired), Some(100));
        assert_eq!(battery_percent(PowerInfo::Unknown), None);
    }

    #[test]
    fn amplitude_spans_full_range() {
        assert_eq!(amplitude(0), 0);
        assert_eq!(amplitude(255), u16::MAX);
        assert_eq!(
            amplitude(Rumble::SILENT.hi_amp),
            0,
            "silent profile must not rumble"
        );
    }
}
