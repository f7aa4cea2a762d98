//! Input samples and the sources that produce them

use crate::math::Vector3;
use crate::physics::MotionInput;
use crate::EntityId;
use std::collections::VecDeque;

/// One input frame of an entity, from capture until acknowledgement
///
/// `sent_at` is set exactly once: on a client when the sample is forwarded to
/// the authority, on the authority when its result is returned to the owner.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSample {
    pub time: f32,
    pub horizontal: f32,
    pub jump_requested: bool,
    pub sent_at: Option<f32>,
    /// Position of the entity after this input was integrated
    pub result_position: Vector3,
    pub claimed_target: Option<EntityId>,
}

impl InputSample {
    pub fn new(time: f32, horizontal: f32, jump_requested: bool) -> Self {
        Self {
            time,
            horizontal,
            jump_requested,
            sent_at: None,
            result_position: Vector3::ZERO,
            claimed_target: None,
        }
    }

    pub fn motion(&self) -> MotionInput {
        MotionInput {
            horizontal: self.horizontal,
            jump: self.jump_requested,
        }
    }
}

impl Default for InputSample {
    fn default() -> Self {
        Self::new(0.0, 0.0, false)
    }
}

/// Anything that can report the player's current intent
///
/// Implemented by the keyboard reader on clients and by bots on the server.
pub trait InputSource {
    /// Returns `(horizontal, jump_requested)` with `horizontal` in `[-1, 1]`.
    fn read_input(&mut self) -> (f32, bool);
}

/// Replays a fixed list of inputs, then holds the last one
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    frames: VecDeque<(f32, bool)>,
    last: (f32, bool),
}

impl ScriptedInput {
    pub fn new(frames: impl IntoIterator<Item = (f32, bool)>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            last: (0.0, false),
        }
    }

    /// Always reports the same intent.
    pub fn constant(horizontal: f32, jump: bool) -> Self {
        Self {
            frames: VecDeque::new(),
            last: (horizontal, jump),
        }
    }
}

impl InputSource for ScriptedInput {
    fn read_input(&mut self) -> (f32, bool) {
        if let Some(frame) = self.frames.pop_front() {
            self.last = frame;
        }
        self.last
    }
}
