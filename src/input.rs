//! Input simulation for mouse and keyboard control

use std::time::Duration;

use anyhow::Result;

/// Mouse button to click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

/// Synthetic input against the focused window
pub trait ActionDriver {
    /// Press and release a key by name (see `utils::keybinds::resolve_key`)
    fn press_key(&self, key: &str) -> Result<()>;

    /// Move the pointer to absolute screen coordinates over `duration`
    fn move_cursor(&self, x: i32, y: i32, duration: Duration) -> Result<()>;

    /// Click at the current pointer position
    fn click(&self, button: MouseButton) -> Result<()>;
}

/// Step between interpolated pointer positions
const MOVE_STEP: Duration = Duration::from_millis(10);

/// Intermediate pointer positions from `from` to `to`, ending exactly at `to`
pub fn pointer_path(from: (i32, i32), to: (i32, i32), duration: Duration) -> Vec<(i32, i32)> {
    let steps = (duration.as_millis() / MOVE_STEP.as_millis()).max(1) as i32;
    (1..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            // ease-in-out so the pointer does not move at constant speed
            let eased = t * t * (3.0 - 2.0 * t);
            (
                from.0 + ((to.0 - from.0) as f64 * eased).round() as i32,
                from.1 + ((to.1 - from.1) as f64 * eased).round() as i32,
            )
        })
        .collect()
}

#[cfg(windows)]
pub use self::platform::EnigoDriver;

#[cfg(windows)]
mod platform {
    use super::*;
    use std::thread;

    use anyhow::{anyhow, Context};
    use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
    use parking_lot::Mutex;

    use crate::utils::keybinds::resolve_key;

    /// Input driver backed by `enigo`
    pub struct EnigoDriver {
        enigo: Mutex<Enigo>,
    }

    impl EnigoDriver {
        pub fn new() -> Result<Self> {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|e| anyhow!("Failed to create Enigo: {:?}", e))?;
            Ok(Self {
                enigo: Mutex::new(enigo),
            })
        }
    }

    impl ActionDriver for EnigoDriver {
        fn press_key(&self, key: &str) -> Result<()> {
            let enigo_key = string_to_enigo_key(key).with_context(|| format!("Unknown key '{}'", key))?;
            thread::sleep(Duration::from_millis(50));
            self.enigo
                .lock()
                .key(enigo_key, Direction::Click)
                .map_err(|e| anyhow!("Failed to press key '{}': {:?}", key, e))
        }

        fn move_cursor(&self, x: i32, y: i32, duration: Duration) -> Result<()> {
            let from = self
                .enigo
                .lock()
                .location()
                .map_err(|e| anyhow!("Failed to read mouse location: {:?}", e))?;

            for (px, py) in pointer_path(from, (x, y), duration) {
                self.enigo
                    .lock()
                    .move_mouse(px, py, Coordinate::Abs)
                    .map_err(|e| anyhow!("Failed to move mouse to ({}, {}): {:?}", px, py, e))?;
                thread::sleep(MOVE_STEP);
            }
            Ok(())
        }

        fn click(&self, button: MouseButton) -> Result<()> {
            let button = match button {
                MouseButton::Left => Button::Left,
                MouseButton::Right => Button::Right,
            };
            thread::sleep(Duration::from_millis(50));
            self.enigo
                .lock()
                .button(button, Direction::Click)
                .map_err(|e| anyhow!("Failed to click {:?}: {:?}", button, e))
        }
    }

    /// Convert string key name to enigo Key
    fn string_to_enigo_key(key: &str) -> Option<Key> {
        let key = resolve_key(key)?;

        // Single characters: lowercase avoids layout-dependent shift handling
        if key.chars().count() == 1 {
            let c = key.chars().next()?.to_ascii_lowercase();
            return Some(Key::Unicode(c));
        }

        match key.as_str() {
            "F1" => Some(Key::F1),
            "F2" => Some(Key::F2),
            "F3" => Some(Key::F3),
            "F4" => Some(Key::F4),
            "F5" => Some(Key::F5),
            "F6" => Some(Key::F6),
            "F7" => Some(Key::F7),
            "F8" => Some(Key::F8),
            "F9" => Some(Key::F9),
            "F10" => Some(Key::F10),
            "F11" => Some(Key::F11),
            "F12" => Some(Key::F12),
            "ESC" | "ESCAPE" => Some(Key::Escape),
            "ENTER" | "RETURN" => Some(Key::Return),
            "SPACE" => Some(Key::Space),
            "TAB" => Some(Key::Tab),
            "BACKSPACE" => Some(Key::Backspace),
            "UP" => Some(Key::UpArrow),
            "DOWN" => Some(Key::DownArrow),
            "LEFT" => Some(Key::LeftArrow),
            "RIGHT" => Some(Key::RightArrow),
            "HOME" => Some(Key::Home),
            "END" => Some(Key::End),
            "PAGEUP" => Some(Key::PageUp),
            "PAGEDOWN" => Some(Key::PageDown),
            "DELETE" => Some(Key::Delete),
            "SHIFT" => Some(Key::Shift),
            "CTRL" | "CONTROL" => Some(Key::Control),
            "ALT" => Some(Key::Alt),
            "CAPSLOCK" => Some(Key::CapsLock),
            _ => None,
        }
    }

}

/// Stand-in on platforms without an input backend; every action fails
#[cfg(not(windows))]
#[derive(Debug, Default)]
pub struct EnigoDriver;

#[cfg(not(windows))]
impl EnigoDriver {
    pub fn new() -> Result<Self> {
        tracing::warn!("[INPUT] Input simulation not implemented on this platform");
        Ok(Self)
    }
}

#[cfg(not(windows))]
impl ActionDriver for EnigoDriver {
    fn press_key(&self, key: &str) -> Result<()> {
        anyhow::bail!("press_key('{}') not implemented on this platform", key)
    }

    fn move_cursor(&self, x: i32, y: i32, _duration: Duration) -> Result<()> {
        anyhow::bail!("move_cursor({}, {}) not implemented on this platform", x, y)
    }

    fn click(&self, button: MouseButton) -> Result<()> {
        anyhow::bail!("click({:?}) not implemented on this platform", button)
    }
}
