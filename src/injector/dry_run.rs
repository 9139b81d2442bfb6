//! Injector that only traces what it would do

use super::{InjectError, InputInjector, Key, Modifier, MouseButton, VirtualPointer};
use tracing::info;

pub struct DryRunInjector {
    pointer: VirtualPointer,
}

impl DryRunInjector {
    pub fn new(width: i32, height: i32) -> Self {
        info!("Dry run: input injection is logged only");
        Self {
            pointer: VirtualPointer::centered(width, height),
        }
    }
}

impl InputInjector for DryRunInjector {
    fn pointer_position(&mut self) -> Result<(i32, i32), InjectError> {
        Ok((self.pointer.x, self.pointer.y))
    }

    fn move_pointer_to(&mut self, x: i32, y: i32) -> Result<(), InjectError> {
        let (dx, dy) = self.pointer.move_to(x, y);
        if dx != 0 || dy != 0 {
            info!("move pointer to ({}, {})", self.pointer.x, self.pointer.y);
        }
        Ok(())
    }

    fn scroll_by(&mut self, dx: i32, dy: i32) -> Result<(), InjectError> {
        if dx != 0 || dy != 0 {
            info!("scroll by ({}, {})", dx, dy);
        }
        Ok(())
    }

    fn press_button(&mut self, button: MouseButton) -> Result<(), InjectError> {
        info!("press {:?}", button);
        Ok(())
    }

    fn release_button(&mut self, button: MouseButton) -> Result<(), InjectError> {
        info!("release {:?}", button);
        Ok(())
    }

    fn click_button(&mut self, button: MouseButton) -> Result<(), InjectError> {
        info!("click {:?}", button);
        Ok(())
    }

    fn tap_key(&mut self, key: Key, modifiers: &[Modifier]) -> Result<(), InjectError> {
        info!("tap {} {:?}", key, modifiers);
        Ok(())
    }

    fn screen_size(&mut self) -> Result<(i32, i32), InjectError> {
        Ok((self.pointer.width, self.pointer.height))
    }
}
