//! uinput virtual device injector (Linux)
//!
//! uinput cannot read the host cursor back, so absolute moves are turned into
//! relative motion from a [`VirtualPointer`] clamped to the configured screen.

use super::{InjectError, InputInjector, Key, Modifier, MouseButton, VirtualPointer};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key as EvKey, RelativeAxisType};
use tracing::{debug, info};

const DEVICE_NAME: &str = "joypointer virtual pointer";

fn button_code(button: MouseButton) -> EvKey {
    match button {
        MouseButton::Left => EvKey::BTN_LEFT,
        MouseButton::Right => EvKey::BTN_RIGHT,
        MouseButton::Middle => EvKey::BTN_MIDDLE,
    }
}

fn key_code(key: Key) -> EvKey {
    match key {
        Key::Up => EvKey::KEY_UP,
        Key::Down => EvKey::KEY_DOWN,
        Key::Left => EvKey::KEY_LEFT,
        Key::Right => EvKey::KEY_RIGHT,
        Key::Space => EvKey::KEY_SPACE,
        Key::Enter => EvKey::KEY_ENTER,
        Key::Escape => EvKey::KEY_ESC,
        Key::F4 => EvKey::KEY_F4,
    }
}

fn modifier_code(modifier: Modifier) -> EvKey {
    match modifier {
        Modifier::Alt => EvKey::KEY_LEFTALT,
    }
}

fn key_event(code: EvKey, pressed: bool) -> InputEvent {
    InputEvent::new(EventType::KEY, code.code(), i32::from(pressed))
}

fn rel_event(axis: RelativeAxisType, value: i32) -> InputEvent {
    InputEvent::new(EventType::RELATIVE, axis.0, value)
}

pub struct UinputInjector {
    device: VirtualDevice,
    pointer: VirtualPointer,
}

impl UinputInjector {
    pub fn new(width: i32, height: i32) -> Result<Self, InjectError> {
        let mut keys = AttributeSet::<EvKey>::new();
        for button in [MouseButton::Left, MouseButton::Right, MouseButton::Middle] {
            keys.insert(button_code(button));
        }
        for key in [
            Key::Up,
            Key::Down,
            Key::Left,
            Key::Right,
            Key::Space,
            Key::Enter,
            Key::Escape,
            Key::F4,
        ] {
            keys.insert(key_code(key));
        }
        keys.insert(modifier_code(Modifier::Alt));

        let mut axes = AttributeSet::<RelativeAxisType>::new();
        axes.insert(RelativeAxisType::REL_X);
        axes.insert(RelativeAxisType::REL_Y);
        axes.insert(RelativeAxisType::REL_WHEEL);
        axes.insert(RelativeAxisType::REL_HWHEEL);

        let device = VirtualDeviceBuilder::new()?
            .name(DEVICE_NAME)
            .with_keys(&keys)?
            .with_relative_axes(&axes)?
            .build()?;
        info!("Created uinput device \"{}\" ({}x{})", DEVICE_NAME, width, height);

        Ok(Self {
            device,
            pointer: VirtualPointer::centered(width, height),
        })
    }

    fn emit(&mut self, action: &str, events: &[InputEvent]) -> Result<(), InjectError> {
        self.device
            .emit(events)
            .map_err(|e| InjectError::EmitError {
                action: action.to_string(),
                reason: e.to_string(),
            })
    }
}

impl InputInjector for UinputInjector {
    fn pointer_position(&mut self) -> Result<(i32, i32), InjectError> {
        Ok((self.pointer.x, self.pointer.y))
    }

    fn move_pointer_to(&mut self, x: i32, y: i32) -> Result<(), InjectError> {
        let (dx, dy) = self.pointer.move_to(x, y);
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        self.emit(
            "pointer move",
            &[
                rel_event(RelativeAxisType::REL_X, dx),
                rel_event(RelativeAxisType::REL_Y, dy),
            ],
        )
    }

    fn scroll_by(&mut self, dx: i32, dy: i32) -> Result<(), InjectError> {
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        debug!("scroll by ({}, {})", dx, dy);
        self.emit(
            "scroll",
            &[
                rel_event(RelativeAxisType::REL_HWHEEL, dx),
                rel_event(RelativeAxisType::REL_WHEEL, dy),
            ],
        )
    }

    fn press_button(&mut self, button: MouseButton) -> Result<(), InjectError> {
        self.emit("button press", &[key_event(button_code(button), true)])
    }

    fn release_button(&mut self, button: MouseButton) -> Result<(), InjectError> {
        self.emit("button release", &[key_event(button_code(button), false)])
    }

    fn tap_key(&mut self, key: Key, modifiers: &[Modifier]) -> Result<(), InjectError> {
        let mut down: Vec<InputEvent> = modifiers
            .iter()
            .map(|m| key_event(modifier_code(*m), true))
            .collect();
        down.push(key_event(key_code(key), true));

        let mut up = vec![key_event(key_code(key), false)];
        up.extend(
            modifiers
                .iter()
                .rev()
                .map(|m| key_event(modifier_code(*m), false)),
        );

        debug!("tap {} {:?}", key, modifiers);
        self.emit("key press", &down)?;
        self.emit("key release", &up)
    }

    fn screen_size(&mut self) -> Result<(i32, i32), InjectError> {
        Ok((self.pointer.width, self.pointer.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_has_a_distinct_code() {
        let keys = [
            Key::Up,
            Key::Down,
            Key::Left,
            Key::Right,
            Key::Space,
            Key::Enter,
            Key::Escape,
            Key::F4,
        ];
        let mut codes: Vec<u16> = keys.iter().map(|k| key_code(*k).code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), keys.len());
    }

    #[test]
    fn key_events_carry_press_state() {
        let event = key_event(EvKey::KEY_ESC, true);
        assert_eq!(event.event_type(), EventType::KEY);
        assert_eq!(event.value(), 1);
        assert_eq!(key_event(EvKey::KEY_ESC, false).value(), 0);
    }
}
