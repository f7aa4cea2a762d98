//! Keyboard input for the local player

use macroquad::prelude::*;
use shared::input::InputSource;

/// Reads movement intent from the keyboard each frame
///
/// A/D or the arrow keys steer, W, Up or Space jump. Also tracks edge
/// triggered debug keys.
pub struct KeyboardInput {
    // Previous frame key states for edge detection
    prev_key_tab: bool,
}

impl KeyboardInput {
    pub fn new() -> Self {
        Self {
            prev_key_tab: false,
        }
    }

    /// Returns true on the frame the scoreboard key went down.
    pub fn scoreboard_toggled(&mut self) -> bool {
        let key_tab = is_key_down(KeyCode::Tab);
        let toggled = key_tab && !self.prev_key_tab;
        self.prev_key_tab = key_tab;
        toggled
    }

    pub fn quit_requested(&self) -> bool {
        is_key_pressed(KeyCode::Escape)
    }
}

impl Default for KeyboardInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for KeyboardInput {
    fn read_input(&mut self) -> (f32, bool) {
        let left = is_key_down(KeyCode::A) || is_key_down(KeyCode::Left);
        let right = is_key_down(KeyCode::D) || is_key_down(KeyCode::Right);
        let jump =
            is_key_down(KeyCode::W) || is_key_down(KeyCode::Up) || is_key_down(KeyCode::Space);

        (axis(left, right), jump)
    }
}

/// Collapses two opposing keys into a horizontal axis value.
pub fn axis(left: bool, right: bool) -> f32 {
    match (left, right) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => 0.0,
    }
}
