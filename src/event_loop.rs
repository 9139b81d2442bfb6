//! Process-wide event loop
//!
//! Waits on the state sequence, the sensor sequence and the shutdown token,
//! and handles exactly one event per wake-up before waiting again. The
//! [`Router`] is only ever touched from this loop.

use crate::controller::driver::{ControllerDriver, ControllerEvents};
use crate::injector::InputInjector;
use crate::mapping::Router;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Why the loop stopped; every variant is a clean shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Interrupted,
    StateClosed,
    SensorClosed,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Interrupted => write!(f, "interrupted"),
            ExitReason::StateClosed => write!(f, "state sequence closed"),
            ExitReason::SensorClosed => write!(f, "sensor sequence closed"),
        }
    }
}

/// Runs until shutdown is requested or either sequence closes.
pub async fn run<D, I>(
    router: &mut Router<D, I>,
    events: &mut ControllerEvents,
    shutdown: &CancellationToken,
) -> ExitReason
where
    D: ControllerDriver,
    I: InputInjector,
{
    info!("Event loop started");
    let reason = loop {
        tokio::select! {
            _ = shutdown.cancelled() => break ExitReason::Interrupted,
            state = events.states.recv() => match state {
                Some(state) => {
                    debug!(
                        "state {} at {}",
                        state.buttons,
                        state.timestamp.format("%H:%M:%S.%3f")
                    );
                    router.handle_state(&state);
                }
                None => break ExitReason::StateClosed,
            },
            sample = events.sensors.recv() => match sample {
                Some(sample) => router.handle_sensor(&sample),
                None => break ExitReason::SensorClosed,
            },
        }
    };
    info!("Event loop stopped: {}", reason);
    reason
}

/// Cancels `token` on the first Ctrl-C.
pub fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, shutting down"),
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
        token.cancel();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::buttons::{Button, ButtonMask};
    use crate::controller::driver::recording::RecordingDriver;
    use crate::controller::driver::{ControllerState, DeviceKind, SensorSample, StickSample};
    use crate::injector::recording::{Call, RecordingInjector};
    use crate::injector::MouseButton;
    use crate::mapping::RouterSettings;
    use tokio::sync::mpsc;

    struct Harness {
        router: Router<RecordingDriver, RecordingInjector>,
        events: ControllerEvents,
        states: mpsc::Sender<ControllerState>,
        sensors: mpsc::Sender<SensorSample>,
    }

    fn harness() -> Harness {
        let (states, state_rx) = mpsc::channel(16);
        let (sensors, sensor_rx) = mpsc::channel(16);
        Harness {
            router: Router::new(
                RecordingDriver::new(DeviceKind::Left),
                RecordingInjector::default(),
                RouterSettings::default(),
            ),
            events: ControllerEvents {
                states: state_rx,
                sensors: sensor_rx,
            },
            states,
            sensors,
        }
    }

    fn snapshot(buttons: &[Button]) -> ControllerState {
        ControllerState::new(ButtonMask::from_buttons(buttons), StickSample::default())
    }

    #[tokio::test]
    async fn processes_states_in_order_until_closed() {
        let mut h = harness();
        h.states.send(snapshot(&[Button::Sr])).await.unwrap();
        h.states.send(snapshot(&[])).await.unwrap();
        drop(h.states);

        let reason = run(&mut h.router, &mut h.events, &CancellationToken::new()).await;

        assert_eq!(reason, ExitReason::StateClosed);
        assert_eq!(
            h.router.injector().actions(),
            vec![
                Call::Press(MouseButton::Right),
                Call::Release(MouseButton::Right)
            ]
        );
        drop(h.sensors);
    }

    #[tokio::test]
    async fn sensor_close_ends_loop() {
        let mut h = harness();
        drop(h.sensors);
        let reason = run(&mut h.router, &mut h.events, &CancellationToken::new()).await;
        assert_eq!(reason, ExitReason::SensorClosed);
        drop(h.states);
    }

    #[tokio::test]
    async fn cancellation_stops_without_consuming_more() {
        let mut h = harness();
        let token = CancellationToken::new();
        token.cancel();

        let reason = run(&mut h.router, &mut h.events, &token).await;
        assert_eq!(reason, ExitReason::Interrupted);

        h.states.send(snapshot(&[Button::Minus])).await.unwrap();
        assert!(h.router.injector().calls.is_empty());
        drop(h.sensors);
    }

    #[tokio::test]
    async fn sensor_samples_reach_the_router() {
        let mut h = harness();
        h.sensors
            .send(SensorSample {
                z: 0.5,
                ..Default::default()
            })
            .await
            .unwrap();
        drop(h.sensors);

        let reason = run(&mut h.router, &mut h.events, &CancellationToken::new()).await;

        // the sample is consumed before the closed sequence is observed
        assert_eq!(reason, ExitReason::SensorClosed);
        assert_eq!(h.router.state().pending.dx, -32.0);
        drop(h.states);
    }
}
