//! Cubic-feel stick response curve

/// Default curve gain, in pixels per tick at full deflection
pub const STICK_GAIN: f32 = 80.0;

/// Sign of `v` with `sign(0) == 0`; NaN maps to 0 as well.
pub fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// `v² · sign(v) · gain`: fine control near center, fast near the rim.
pub fn curve(v: f32, gain: f32) -> f32 {
    v * v * sign(v) * gain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_maps_to_zero() {
        assert_eq!(curve(0.0, STICK_GAIN), 0.0);
        assert_eq!(curve(-0.0, STICK_GAIN), 0.0);
        assert_eq!(sign(f32::NAN), 0.0);
    }

    #[test]
    fn keeps_sign_of_input() {
        for v in [-1.0, -0.5, -0.01, 0.01, 0.3, 1.0] {
            assert_eq!(sign(curve(v, STICK_GAIN)), sign(v), "v = {v}");
        }
    }

    #[test]
    fn magnitude_grows_with_deflection() {
        let mut last = 0.0;
        for step in 1..=100 {
            let v = step as f32 / 100.0;
            let out = curve(v, STICK_GAIN);
            assert!(out > last, "not increasing at {v}");
            assert_eq!(curve(-v, STICK_GAIN), -out);
            last = out;
        }
    }

    #[test]
    fn full_deflection_hits_gain() {
        assert_eq!(curve(1.0, STICK_GAIN), 80.0);
        assert_eq!(curve(-1.0, STICK_GAIN), -80.0);
        assert_eq!(curve(0.5, STICK_GAIN), 20.0);
    }
}
