//! Wandering bot players driven by the authority

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::input::InputSource;
use shared::math::Vector3;

/// Other entities within this distance make a bot jump
pub const BOT_AWARENESS_RADIUS: f32 = 20.0;

/// Chance of a random jump on any given input frame
const JUMP_CHANCE: f64 = 0.2;

/// Input source for a server-owned bot: runs in one direction for 1 to 3
/// seconds, then picks again, and hops randomly or whenever someone is close.
#[derive(Debug)]
pub struct BotInput {
    rng: StdRng,
    horizontal: f32,
    change_direction_in: f32,
    neighbour_close: bool,
    active: bool,
}

impl BotInput {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            horizontal: 0.0,
            change_direction_in: 0.0,
            neighbour_close: false,
            active: true,
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn horizontal(&self) -> f32 {
        self.horizontal
    }

    /// Updates the bot's view of the world before its input is read.
    pub fn observe<'a>(
        &mut self,
        delta_time: f32,
        position: Vector3,
        others: impl IntoIterator<Item = &'a Vector3>,
    ) {
        self.change_direction_in -= delta_time;
        if self.change_direction_in <= 0.0 {
            self.horizontal = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            self.change_direction_in = self.rng.gen_range(1.0..3.0);
        }

        self.neighbour_close = others
            .into_iter()
            .any(|other| other.distance(&position) <= BOT_AWARENESS_RADIUS);
    }
}

impl InputSource for BotInput {
    fn read_input(&mut self) -> (f32, bool) {
        if !self.active {
            return (0.0, false);
        }
        let jump = self.rng.gen_bool(JUMP_CHANCE) || self.neighbour_close;
        (self.horizontal, jump)
    }
}
