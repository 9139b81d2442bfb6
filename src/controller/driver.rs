//! Controller Driver boundary
//!
//! Shared snapshot types and the [`ControllerDriver`] trait the router talks
//! to. A driver yields two independent event sequences, state snapshots and
//! sensor snapshots, delivered as `mpsc` receivers in [`ControllerEvents`].

use crate::controller::buttons::ButtonMask;
use crate::controller::rumble::RumbleSet;
use chrono::{DateTime, Local};
use serde::Deserialize;
use tokio::sync::mpsc;

/// Device category requested at discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    #[default]
    Left,
    Right,
    ProController,
}

impl DeviceKind {
    /// Name fragment reported by the OS for this category
    pub fn name_pattern(self) -> &'static str {
        match self {
            DeviceKind::Left => "Joy-Con (L)",
            DeviceKind::Right => "Joy-Con (R)",
            DeviceKind::ProController => "Pro Controller",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            DeviceKind::Left,
            DeviceKind::Right,
            DeviceKind::ProController,
        ]
        .into_iter()
        .find(|kind| name.contains(kind.name_pattern()))
    }
}

/// Capability flags returned by connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub is_left: bool,
    pub is_right: bool,
    pub is_pro_con: bool,
}

impl From<DeviceKind> for Capabilities {
    fn from(kind: DeviceKind) -> Self {
        Self {
            is_left: kind == DeviceKind::Left,
            is_right: kind == DeviceKind::Right,
            is_pro_con: kind == DeviceKind::ProController,
        }
    }
}

/// One analog stick deflection, each axis in [-1, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StickSample {
    pub x: f32,
    pub y: f32,
}

impl StickSample {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Per-tick button and stick snapshot
#[derive(Debug, Clone)]
pub struct ControllerState {
    pub buttons: ButtonMask,
    /// Battery charge in percent
    pub battery: u8,
    pub left_stick: StickSample,
    pub right_stick: StickSample,
    pub timestamp: DateTime<Local>,
}

impl ControllerState {
    pub fn new(buttons: ButtonMask, left_stick: StickSample) -> Self {
        Self {
            buttons,
            battery: 100,
            left_stick,
            right_stick: StickSample::default(),
            timestamp: Local::now(),
        }
    }
}

/// Angular velocity triple from the gyroscope
///
/// `z` is yaw rate and `y` is pitch rate for a controller half held upright.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// A connected device as seen by discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Backend-specific device path
    pub path: String,
    pub name: String,
    pub kind: DeviceKind,
}

/// Both event sequences of a connected handle
///
/// Each receiver yields `None` once the device disconnects or the handle is
/// closed.
#[derive(Debug)]
pub struct ControllerEvents {
    pub states: mpsc::Receiver<ControllerState>,
    pub sensors: mpsc::Receiver<SensorSample>,
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Failed to initialize driver: {0}")]
    InitializationError(String),

    #[error("No compatible device found: {0}")]
    NoDeviceError(String),

    #[error("Failed to connect to {path}: {reason}")]
    ConnectError { path: String, reason: String },

    #[error("Operation not supported by this driver: {0}")]
    Unsupported(String),

    #[error("Driver channel error: {0}")]
    ChannelError(String),

    #[error("Force feedback error: {0}")]
    RumbleError(String),
}

/// Open handle to a connected controller
pub trait ControllerDriver {
    /// Device name reported at connect
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    fn is_left(&self) -> bool {
        self.capabilities().is_left
    }

    fn is_right(&self) -> bool {
        self.capabilities().is_right
    }

    fn is_pro_con(&self) -> bool {
        self.capabilities().is_pro_con
    }

    /// Writes an opaque subcommand payload to the device.
    fn subcommand(&self, payload: &[u8]) -> Result<(), DriverError>;

    /// Plays a rumble profile on the device.
    fn rumble(&self, set: &RumbleSet) -> Result<(), DriverError>;

    /// Releases the handle. Calling it more than once is a no-op.
    fn close(&mut self);
}

#[cfg(test)]
pub mod recording {
    //! Driver double that records side-channel writes

    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    pub struct RecordingDriver {
        pub kind: DeviceKind,
        pub subcommands: RefCell<Vec<Vec<u8>>>,
        pub rumbles: RefCell<Vec<RumbleSet>>,
        pub close_count: usize,
        /// Reject subcommands the way the gilrs backend does
        pub reject_subcommands: bool,
    }

    impl RecordingDriver {
        pub fn new(kind: DeviceKind) -> Self {
            Self {
                kind,
                ..Default::default()
            }
        }

        pub fn without_subcommands(kind: DeviceKind) -> Self {
            Self {
                kind,
                reject_subcommands: true,
                ..Default::default()
            }
        }
    }

    impl ControllerDriver for RecordingDriver {
        fn name(&self) -> &str {
            self.kind.name_pattern()
        }

        fn capabilities(&self) -> Capabilities {
            self.kind.into()
        }

        fn subcommand(&self, payload: &[u8]) -> Result<(), DriverError> {
            if self.reject_subcommands {
                return Err(DriverError::Unsupported("subcommand".to_string()));
            }
            self.subcommands.borrow_mut().push(payload.to_vec());
            Ok(())
        }

        fn rumble(&self, set: &RumbleSet) -> Result<(), DriverError> {
            self.rumbles.borrow_mut().push(*set);
            Ok(())
        }

        fn close(&mut self) {
            self.close_count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_detected_from_device_name() {
        assert_eq!(
            DeviceKind::from_name("Nintendo Switch Joy-Con (L)"),
            Some(DeviceKind::Left)
        );
        assert_eq!(
            DeviceKind::from_name("Nintendo Switch Pro Controller"),
            Some(DeviceKind::ProController)
        );
        assert_eq!(DeviceKind::from_name("Xbox Wireless Controller"), None);
    }

    #[test]
    fn capabilities_follow_kind() {
        let caps = Capabilities::from(DeviceKind::Right);
        assert!(caps.is_right);
        assert!(!caps.is_left);
        assert!(!caps.is_pro_con);
    }
}
