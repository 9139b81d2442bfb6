//! Gyro-to-pointer integration

use crate::controller::driver::{ControllerDriver, SensorSample};

/// Default gyro gain, in pixels per unit of angular velocity
pub const GYRO_GAIN: f32 = 64.0;

/// Physical orientation of the sampling half
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GyroSide {
    /// Left half or a one-piece controller
    Left,
    /// Right half, mounted mirrored to the left one
    Right,
}

impl GyroSide {
    /// Orientation of `driver`'s device, if it carries a gyro we understand.
    pub fn of<D: ControllerDriver + ?Sized>(driver: &D) -> Option<GyroSide> {
        if driver.is_left() || driver.is_pro_con() {
            Some(GyroSide::Left)
        } else if driver.is_right() {
            Some(GyroSide::Right)
        } else {
            None
        }
    }
}

/// Pointer displacement contributed by one sample.
pub fn integrate(sample: &SensorSample, side: GyroSide, gain: f32) -> (f32, f32) {
    let yaw = sample.z * gain;
    let pitch = sample.y * gain;
    match side {
        GyroSide::Left => (-yaw, pitch),
        GyroSide::Right => (yaw, -pitch),
    }
}

/// Outstanding gyro motion waiting for the next apply step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PendingMotion {
    pub dx: f32,
    pub dy: f32,
}

impl PendingMotion {
    pub fn accumulate(&mut self, (dx, dy): (f32, f32)) {
        self.dx += dx;
        self.dy += dy;
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }

    /// Returns the pending delta and resets it to zero.
    pub fn take(&mut self) -> (f32, f32) {
        let delta = (self.dx, self.dy);
        *self = Self::default();
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::driver::recording::RecordingDriver;
    use crate::controller::driver::DeviceKind;

    fn yaw(rate: f32) -> SensorSample {
        SensorSample {
            z: rate,
            ..Default::default()
        }
    }

    #[test]
    fn left_half_yaw_moves_pointer_left() {
        assert_eq!(integrate(&yaw(1.0), GyroSide::Left, GYRO_GAIN), (-64.0, 0.0));
    }

    #[test]
    fn right_half_is_mirrored() {
        let sample = SensorSample {
            x: 0.0,
            y: 0.5,
            z: 1.0,
        };
        let (lx, ly) = integrate(&sample, GyroSide::Left, GYRO_GAIN);
        let (rx, ry) = integrate(&sample, GyroSide::Right, GYRO_GAIN);
        assert_eq!((rx, ry), (-lx, -ly));
        assert_eq!(ly, 32.0);
    }

    #[test]
    fn pro_controller_uses_left_convention() {
        let pro = RecordingDriver::new(DeviceKind::ProController);
        assert_eq!(GyroSide::of(&pro), Some(GyroSide::Left));
        let right = RecordingDriver::new(DeviceKind::Right);
        assert_eq!(GyroSide::of(&right), Some(GyroSide::Right));
    }

    #[test]
    fn take_clears_pending() {
        let mut pending = PendingMotion::default();
        pending.accumulate((1.5, -2.0));
        pending.accumulate((0.5, 0.0));
        assert_eq!(pending.take(), (2.0, -2.0));
        assert!(pending.is_zero());
    }
}
