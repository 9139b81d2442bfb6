//! Turns controller snapshots into pointer and keyboard actions.
//!
//! - [`curve`] maps stick deflection to pointer displacement
//! - [`gyro`] integrates angular velocity into pending pointer motion
//! - [`router`] owns the engine state and the remapping tables

pub mod curve;
pub mod gyro;
pub mod router;

pub use router::{EngineState, Mode, Router, RouterSettings};
