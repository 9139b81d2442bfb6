//! Controller subsystem: snapshots from the device side
//!
//! 1. [`buttons`] - Button bitmask and edge detection
//! 2. [`driver`] - Driver boundary, snapshot types and capability flags
//! 3. [`gilrs_driver`] - gilrs-backed driver with its polling thread
//! 4. [`rumble`] - Rumble profile table
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► Driver thread ──► {ControllerState | SensorSample} ──► Event loop
//! ```

pub mod buttons;
pub mod driver;
pub mod gilrs_driver;
pub mod rumble;
