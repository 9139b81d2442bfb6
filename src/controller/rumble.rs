//! Rumble profiles selected on mode switch

use crate::mapping::Mode;

/// Encoded frequency/amplitude pair for one controller half
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rumble {
    pub hi_freq: u8,
    pub hi_amp: u8,
    pub lo_freq: u8,
    pub lo_amp: u8,
}

impl Rumble {
    pub const SILENT: Rumble = Rumble {
        hi_freq: 64,
        hi_amp: 0,
        lo_freq: 64,
        lo_amp: 0,
    };

    pub const fn is_silent(&self) -> bool {
        self.hi_amp == 0 && self.lo_amp == 0
    }
}

/// Rumble for the left and right halves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RumbleSet {
    pub left: Rumble,
    pub right: Rumble,
}

impl RumbleSet {
    pub const fn is_silent(&self) -> bool {
        self.left.is_silent() && self.right.is_silent()
    }
}

pub const PULSE: RumbleSet = RumbleSet {
    left: Rumble {
        hi_freq: 16,
        hi_amp: 80,
        lo_freq: 16,
        lo_amp: 80,
    },
    right: Rumble::SILENT,
};

pub const SILENT: RumbleSet = RumbleSet {
    left: Rumble::SILENT,
    right: Rumble::SILENT,
};

/// Profile played when `mode` becomes active
pub fn profile_for(mode: Mode) -> &'static RumbleSet {
    match mode {
        Mode::Primary => &SILENT,
        Mode::Alternate => &PULSE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternate_mode_pulses_left_half() {
        let set = profile_for(Mode::Alternate);
        assert!(!set.left.is_silent());
        assert!(set.right.is_silent());
    }

    #[test]
    fn primary_mode_is_silent() {
        assert!(profile_for(Mode::Primary).is_silent());
    }
}
