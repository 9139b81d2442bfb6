//! Input Injector boundary
//!
//! Host-side pointer and keyboard primitives the router drives. Two backends:
//! [`uinput`] emits through a Linux virtual device, [`dry_run`] only traces.

pub mod dry_run;
#[cfg(target_os = "linux")]
pub mod uinput;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Keys the remapping table can tap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Space,
    Enter,
    Escape,
    F4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Alt,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Key::Up => "up",
            Key::Down => "down",
            Key::Left => "left",
            Key::Right => "right",
            Key::Space => "space",
            Key::Enter => "enter",
            Key::Escape => "escape",
            Key::F4 => "f4",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("Failed to create virtual device: {0}")]
    DeviceError(#[from] std::io::Error),

    #[error("Failed to emit {action}: {reason}")]
    EmitError { action: String, reason: String },
}

/// Host input primitives
///
/// Every call is a single best-effort attempt; callers log failures and move
/// on.
pub trait InputInjector {
    fn pointer_position(&mut self) -> Result<(i32, i32), InjectError>;

    fn move_pointer_to(&mut self, x: i32, y: i32) -> Result<(), InjectError>;

    fn scroll_by(&mut self, dx: i32, dy: i32) -> Result<(), InjectError>;

    fn press_button(&mut self, button: MouseButton) -> Result<(), InjectError>;

    fn release_button(&mut self, button: MouseButton) -> Result<(), InjectError>;

    fn click_button(&mut self, button: MouseButton) -> Result<(), InjectError> {
        self.press_button(button)?;
        self.release_button(button)
    }

    fn tap_key(&mut self, key: Key, modifiers: &[Modifier]) -> Result<(), InjectError>;

    fn screen_size(&mut self) -> Result<(i32, i32), InjectError>;
}

impl<T: InputInjector + ?Sized> InputInjector for Box<T> {
    fn pointer_position(&mut self) -> Result<(i32, i32), InjectError> {
        (**self).pointer_position()
    }

    fn move_pointer_to(&mut self, x: i32, y: i32) -> Result<(), InjectError> {
        (**self).move_pointer_to(x, y)
    }

    fn scroll_by(&mut self, dx: i32, dy: i32) -> Result<(), InjectError> {
        (**self).scroll_by(dx, dy)
    }

    fn press_button(&mut self, button: MouseButton) -> Result<(), InjectError> {
        (**self).press_button(button)
    }

    fn release_button(&mut self, button: MouseButton) -> Result<(), InjectError> {
        (**self).release_button(button)
    }

    fn click_button(&mut self, button: MouseButton) -> Result<(), InjectError> {
        (**self).click_button(button)
    }

    fn tap_key(&mut self, key: Key, modifiers: &[Modifier]) -> Result<(), InjectError> {
        (**self).tap_key(key, modifiers)
    }

    fn screen_size(&mut self) -> Result<(i32, i32), InjectError> {
        (**self).screen_size()
    }
}

/// Pointer position tracked on our side, clamped to the screen
///
/// Backends without a read-back channel use this as their position source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualPointer {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl VirtualPointer {
    /// Starts centered on a `width` x `height` screen.
    pub fn centered(width: i32, height: i32) -> Self {
        Self {
            x: width / 2,
            y: height / 2,
            width,
            height,
        }
    }

    /// Moves to `(x, y)` and returns the delta actually travelled.
    pub fn move_to(&mut self, x: i32, y: i32) -> (i32, i32) {
        let x = x.clamp(0, self.width - 1);
        let y = y.clamp(0, self.height - 1);
        let delta = (x - self.x, y - self.y);
        self.x = x;
        self.y = y;
        delta
    }
}

#[cfg(test)]
pub mod recording {
    //! Injector double that records every call

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        PointerPosition,
        MoveTo(i32, i32),
        Scroll(i32, i32),
        Press(MouseButton),
        Release(MouseButton),
        Click(MouseButton),
        Tap(Key, Vec<Modifier>),
        ScreenSize,
    }

    #[derive(Debug)]
    pub struct RecordingInjector {
        pub calls: Vec<Call>,
        pub position: (i32, i32),
        pub screen: (i32, i32),
        pub fail: bool,
    }

    impl Default for RecordingInjector {
        fn default() -> Self {
            Self {
                calls: Vec::new(),
                position: (500, 500),
                screen: (1920, 1080),
                fail: false,
            }
        }
    }

    impl RecordingInjector {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        /// Calls other than the per-tick pointer policy
        pub fn actions(&self) -> Vec<Call> {
            self.calls
                .iter()
                .filter(|call| {
                    !matches!(
                        call,
                        Call::PointerPosition | Call::MoveTo(..) | Call::Scroll(..)
                    )
                })
                .cloned()
                .collect()
        }

        fn record(&mut self, call: Call) -> Result<(), InjectError> {
            self.calls.push(call.clone());
            if self.fail {
                return Err(InjectError::EmitError {
                    action: format!("{call:?}"),
                    reason: "injector offline".to_string(),
                });
            }
            Ok(())
        }
    }

    impl InputInjector for RecordingInjector {
        fn pointer_position(&mut self) -> Result<(i32, i32), InjectError> {
            self.record(Call::PointerPosition)?;
            Ok(self.position)
        }

        fn move_pointer_to(&mut self, x: i32, y: i32) -> Result<(), InjectError> {
            self.record(Call::MoveTo(x, y))?;
            self.position = (x, y);
            Ok(())
        }

        fn scroll_by(&mut self, dx: i32, dy: i32) -> Result<(), InjectError> {
            self.record(Call::Scroll(dx, dy))
        }

        fn press_button(&mut self, button: MouseButton) -> Result<(), InjectError> {
            self.record(Call::Press(button))
        }

        fn release_button(&mut self, button: MouseButton) -> Result<(), InjectError> {
            self.record(Call::Release(button))
        }

        fn click_button(&mut self, button: MouseButton) -> Result<(), InjectError> {
            self.record(Call::Click(button))
        }

        fn tap_key(&mut self, key: Key, modifiers: &[Modifier]) -> Result<(), InjectError> {
            self.record(Call::Tap(key, modifiers.to_vec()))
        }

        fn screen_size(&mut self) -> Result<(i32, i32), InjectError> {
            self.record(Call::ScreenSize)?;
            Ok(self.screen)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_pointer_clamps_to_screen() {
        let mut pointer = VirtualPointer::centered(100, 50);
        assert_eq!((pointer.x, pointer.y), (50, 25));
        assert_eq!(pointer.move_to(200, -10), (49, -25));
        assert_eq!((pointer.x, pointer.y), (99, 0));
    }

    #[test]
    fn boxed_injector_delegates() {
        let mut boxed: Box<dyn InputInjector> = Box::new(dry_run::DryRunInjector::new(10, 10));
        boxed.move_pointer_to(2, 3).unwrap();
        assert_eq!(boxed.pointer_position().unwrap(), (2, 3));
    }

    #[test]
    fn key_names() {
        assert_eq!(Key::Escape.to_string(), "escape");
        assert_eq!(Key::F4.to_string(), "f4");
    }
}
