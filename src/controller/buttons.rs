//! Button bitmask and edge detection
//!
//! Bit positions follow the Joy-Con input report: right-half face buttons in
//! the low byte, shared buttons in the middle byte, left-half buttons in the
//! high byte.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

/// Named buttons with their bit position in a [`ButtonMask`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Y,
    X,
    B,
    A,
    RightSr,
    RightSl,
    R,
    Zr,
    Minus,
    Plus,
    RightStick,
    LeftStick,
    Home,
    Capture,
    Down,
    Up,
    Right,
    Left,
    Sr,
    Sl,
    L,
    Zl,
}

impl Button {
    pub const fn bit(self) -> u32 {
        match self {
            Button::Y => 0,
            Button::X => 1,
            Button::B => 2,
            Button::A => 3,
            Button::RightSr => 4,
            Button::RightSl => 5,
            Button::R => 6,
            Button::Zr => 7,
            Button::Minus => 8,
            Button::Plus => 9,
            Button::RightStick => 10,
            Button::LeftStick => 11,
            Button::Home => 12,
            Button::Capture => 13,
            Button::Down => 16,
            Button::Up => 17,
            Button::Right => 18,
            Button::Left => 19,
            Button::Sr => 20,
            Button::Sl => 21,
            Button::L => 22,
            Button::Zl => 23,
        }
    }

    pub const fn mask(self) -> ButtonMask {
        ButtonMask(1 << self.bit())
    }
}

/// Immutable snapshot of every pressed button
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ButtonMask(pub u32);

impl ButtonMask {
    pub const EMPTY: ButtonMask = ButtonMask(0);

    pub fn from_buttons(buttons: &[Button]) -> Self {
        buttons
            .iter()
            .fold(Self::EMPTY, |mask, button| mask | button.mask())
    }

    pub const fn contains(self, button: Button) -> bool {
        self.0 >> button.bit() & 1 == 1
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl BitAnd for ButtonMask {
    type Output = ButtonMask;

    fn bitand(self, rhs: Self) -> Self::Output {
        ButtonMask(self.0 & rhs.0)
    }
}

impl BitOr for ButtonMask {
    type Output = ButtonMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        ButtonMask(self.0 | rhs.0)
    }
}

impl Not for ButtonMask {
    type Output = ButtonMask;

    fn not(self) -> Self::Output {
        ButtonMask(!self.0)
    }
}

impl fmt::Display for ButtonMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06X}", self.0)
    }
}

/// Buttons that changed between two consecutive snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Edges {
    /// Newly pressed this tick
    pub down: ButtonMask,
    /// Newly released this tick
    pub up: ButtonMask,
}

/// Computes press and release edges between `prev` and `cur`.
pub fn edges(prev: ButtonMask, cur: ButtonMask) -> Edges {
    Edges {
        down: cur & !prev,
        up: !cur & prev,
    }
}
