//! Mode & Action Router
//!
//! Owns the [`EngineState`] and turns each controller snapshot into injector
//! calls. Button edges are matched against two priority-ordered chains, one
//! for presses and one for releases. At most one entry of each chain fires per
//! tick: the first whose button is in the edge mask.
//!
//! # State Machine
//!
//! ```text
//!            Capture              L down (Primary)           ZL down
//! Primary ◄──────────► Alternate    idle ──────────► scroll ─────────► scroll + right click
//!                                        ◄──────────        ◄─────────
//!                                          L up                ZL up
//! ```

use crate::controller::buttons::{edges, Button, ButtonMask};
use crate::controller::driver::{ControllerDriver, ControllerState, SensorSample, StickSample};
use crate::controller::rumble;
use crate::injector::{InjectError, InputInjector, Key, Modifier, MouseButton};
use crate::mapping::curve::{curve, STICK_GAIN};
use crate::mapping::gyro::{integrate, GyroSide, PendingMotion, GYRO_GAIN};
use tracing::{debug, info, warn};

/// Default scroll multiplier applied to the stick's vertical deflection
pub const SCROLL_GAIN: f32 = 3.0;

/// Subcommand selecting the player lights
const PLAYER_LIGHTS: u8 = 0x30;

/// Active remapping layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Primary,
    Alternate,
}

impl Mode {
    pub fn toggled(self) -> Mode {
        match self {
            Mode::Primary => Mode::Alternate,
            Mode::Alternate => Mode::Primary,
        }
    }

    /// Player-light subcommand announcing this mode on the controller
    pub fn indicator(self) -> [u8; 2] {
        match self {
            Mode::Primary => [PLAYER_LIGHTS, 0x01],
            Mode::Alternate => [PLAYER_LIGHTS, 0x18],
        }
    }
}

/// Process-scoped router state
///
/// `right_click_active` is only ever set while `scroll_active` holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineState {
    pub mode: Mode,
    pub scroll_active: bool,
    pub right_click_active: bool,
    pub pending: PendingMotion,
    /// Gyro motion is dropped instead of applied while set (held scroll)
    pub suppress_apply: bool,
}

#[derive(Debug, Clone, Copy)]
enum PressAction {
    /// L: scroll mode in Primary, left press in Alternate
    ScrollOrPressLeft,
    /// ZL: right press while scrolling, left press otherwise
    RightClickOrPressLeft,
    Tap {
        primary: Key,
        alternate: Key,
        modifiers: &'static [Modifier],
    },
    Press(MouseButton),
    Click(MouseButton),
    ToggleMode,
}

#[derive(Debug, Clone, Copy)]
enum ReleaseAction {
    EndScrollOrReleaseLeft,
    /// ZL: right release if its press started a right click, left otherwise
    EndRightClickOrReleaseLeft,
    Release(MouseButton),
    /// Known button without a release effect
    Ignore,
}

const fn tap(primary: Key, alternate: Key) -> PressAction {
    PressAction::Tap {
        primary,
        alternate,
        modifiers: &[],
    }
}

const PRESS_CHAIN: [(Button, PressAction); 11] = [
    (Button::L, PressAction::ScrollOrPressLeft),
    (Button::Zl, PressAction::RightClickOrPressLeft),
    (Button::Down, tap(Key::Down, Key::Space)),
    (Button::Up, tap(Key::Up, Key::Up)),
    (Button::Right, tap(Key::Right, Key::Enter)),
    (Button::Left, tap(Key::Left, Key::Left)),
    (Button::Sr, PressAction::Press(MouseButton::Right)),
    (
        Button::Sl,
        PressAction::Tap {
            primary: Key::F4,
            alternate: Key::F4,
            modifiers: &[Modifier::Alt],
        },
    ),
    (Button::Minus, tap(Key::Escape, Key::Escape)),
    (Button::LeftStick, PressAction::Click(MouseButton::Middle)),
    (Button::Capture, PressAction::ToggleMode),
];

const RELEASE_CHAIN: [(Button, ReleaseAction); 10] = [
    (Button::L, ReleaseAction::EndScrollOrReleaseLeft),
    (Button::Zl, ReleaseAction::EndRightClickOrReleaseLeft),
    (Button::Sr, ReleaseAction::Release(MouseButton::Right)),
    (Button::Y, ReleaseAction::Ignore),
    (Button::X, ReleaseAction::Ignore),
    (Button::B, ReleaseAction::Ignore),
    (Button::A, ReleaseAction::Ignore),
    (Button::Plus, ReleaseAction::Ignore),
    (Button::RightStick, ReleaseAction::Ignore),
    (Button::Home, ReleaseAction::Ignore),
];

fn first_match<A: Copy>(chain: &[(Button, A)], mask: ButtonMask) -> Option<(Button, A)> {
    chain
        .iter()
        .find(|(button, _)| mask.contains(*button))
        .copied()
}

fn report(result: Result<(), InjectError>) {
    if let Err(e) = result {
        warn!("Input injection failed: {}", e);
    }
}

/// Gains and switches for the router
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouterSettings {
    pub stick_gain: f32,
    pub gyro_gain: f32,
    pub scroll_gain: f32,
    /// Run the gyro apply step after every state snapshot
    pub gyro_apply: bool,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            stick_gain: STICK_GAIN,
            gyro_gain: GYRO_GAIN,
            scroll_gain: SCROLL_GAIN,
            gyro_apply: false,
        }
    }
}

/// Routes controller snapshots to the injector
///
/// Holds the driver handle for capability queries and side-channel writes.
pub struct Router<D: ControllerDriver, I: InputInjector> {
    driver: D,
    injector: I,
    settings: RouterSettings,
    state: EngineState,
    last_buttons: ButtonMask,
    last_battery: Option<u8>,
}

impl<D: ControllerDriver, I: InputInjector> Router<D, I> {
    pub fn new(driver: D, injector: I, settings: RouterSettings) -> Self {
        info!(
            "Router ready for {} (gyro apply: {})",
            driver.name(),
            settings.gyro_apply
        );
        Self {
            driver,
            injector,
            settings,
            state: EngineState::default(),
            last_buttons: ButtonMask::EMPTY,
            last_battery: None,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn injector(&self) -> &I {
        &self.injector
    }

    pub fn into_parts(self) -> (D, I) {
        (self.driver, self.injector)
    }

    /// Processes one state snapshot: edges, pointer policy, then gyro apply.
    pub fn handle_state(&mut self, snapshot: &ControllerState) {
        if self.last_battery != Some(snapshot.battery) {
            info!("battery: {}%", snapshot.battery);
            self.last_battery = Some(snapshot.battery);
        }

        let edges = edges(self.last_buttons, snapshot.buttons);
        self.last_buttons = snapshot.buttons;

        self.dispatch_press(edges.down);
        self.dispatch_release(edges.up);
        self.update_pointer(&snapshot.left_stick);

        if self.settings.gyro_apply {
            self.apply();
        } else {
            self.state.pending.take();
        }
    }

    /// Accumulates one gyro sample into the pending motion.
    pub fn handle_sensor(&mut self, sample: &SensorSample) {
        let Some(side) = GyroSide::of(&self.driver) else {
            debug!("Ignoring gyro sample from {}", self.driver.name());
            return;
        };
        let delta = integrate(sample, side, self.settings.gyro_gain);
        self.state.pending.accumulate(delta);
    }

    /// Moves the pointer by the pending gyro motion, clamped to the screen.
    pub fn apply(&mut self) {
        if self.state.pending.is_zero() {
            return;
        }
        let (dx, dy) = self.state.pending.take();
        if self.state.suppress_apply {
            return;
        }

        let position = self.injector.pointer_position();
        let screen = self.injector.screen_size();
        let ((x, y), (w, h)) = match (position, screen) {
            (Ok(position), Ok(screen)) => (position, screen),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Skipping gyro apply: {}", e);
                return;
            }
        };
        let x = (x + dx as i32).clamp(0, w);
        let y = (y + dy as i32).clamp(0, h);
        report(self.injector.move_pointer_to(x, y));
    }

    fn dispatch_press(&mut self, down: ButtonMask) {
        if down.is_empty() {
            return;
        }
        let Some((button, action)) = first_match(&PRESS_CHAIN, down) else {
            debug!("down: {}", down);
            return;
        };
        debug!("{:?} down in {:?} mode", button, self.state.mode);

        let mode = self.state.mode;
        match action {
            PressAction::ScrollOrPressLeft => match mode {
                Mode::Primary => {
                    self.state.scroll_active = true;
                    self.state.right_click_active = false;
                    self.state.suppress_apply = true;
                }
                Mode::Alternate => report(self.injector.press_button(MouseButton::Left)),
            },
            PressAction::RightClickOrPressLeft => {
                if mode == Mode::Primary && self.state.scroll_active {
                    self.state.right_click_active = true;
                    report(self.injector.press_button(MouseButton::Right));
                } else {
                    report(self.injector.press_button(MouseButton::Left));
                }
            }
            PressAction::Tap {
                primary,
                alternate,
                modifiers,
            } => {
                let key = match mode {
                    Mode::Primary => primary,
                    Mode::Alternate => alternate,
                };
                report(self.injector.tap_key(key, modifiers));
            }
            PressAction::Press(button) => report(self.injector.press_button(button)),
            PressAction::Click(button) => report(self.injector.click_button(button)),
            PressAction::ToggleMode => self.toggle_mode(),
        }
    }

    fn dispatch_release(&mut self, up: ButtonMask) {
        if up.is_empty() {
            return;
        }
        let Some((button, action)) = first_match(&RELEASE_CHAIN, up) else {
            debug!("up  : {}", up);
            return;
        };

        match action {
            ReleaseAction::EndScrollOrReleaseLeft => {
                if self.state.scroll_active {
                    self.state.scroll_active = false;
                    self.state.suppress_apply = false;
                    if self.state.right_click_active {
                        self.state.right_click_active = false;
                        report(self.injector.release_button(MouseButton::Right));
                    }
                } else {
                    report(self.injector.release_button(MouseButton::Left));
                }
            }
            ReleaseAction::EndRightClickOrReleaseLeft => {
                // release whichever button the ZL press chose
                if self.state.right_click_active {
                    self.state.right_click_active = false;
                    report(self.injector.release_button(MouseButton::Right));
                } else {
                    report(self.injector.release_button(MouseButton::Left));
                }
            }
            ReleaseAction::Release(mouse) => report(self.injector.release_button(mouse)),
            ReleaseAction::Ignore => debug!("{:?} up, no release action", button),
        }
    }

    fn toggle_mode(&mut self) {
        self.state.mode = self.state.mode.toggled();
        info!("mode: {:?}", self.state.mode);

        if let Err(e) = self.driver.subcommand(&self.state.mode.indicator()) {
            warn!("Failed to update mode indicator: {}", e);
        }
        if let Err(e) = self.driver.rumble(rumble::profile_for(self.state.mode)) {
            warn!("Failed to select rumble profile: {}", e);
        }
    }

    fn update_pointer(&mut self, stick: &StickSample) {
        if self.state.scroll_active && !self.state.right_click_active {
            let amount = (stick.y * self.settings.scroll_gain).round() as i32;
            report(self.injector.scroll_by(0, amount));
            return;
        }

        let (x, y) = match self.injector.pointer_position() {
            Ok(position) => position,
            Err(e) => {
                warn!("Skipping pointer move: {}", e);
                return;
            }
        };
        let dx = curve(stick.x, self.settings.stick_gain) as i32;
        let dy = curve(stick.y, self.settings.stick_gain) as i32;
        report(self.injector.move_pointer_to(x + dx, y - dy));
    }
}
