//! Tunable simulation parameters shared by the authority and every client
//!
//! Both sides must run with identical values: prediction is only as good as
//! the agreement between the client's integrator and the server's.

use crate::math::Vector3;
use serde::{Deserialize, Serialize};

/// Movement, combat and history tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Input frames per second; one input sample is recorded per frame
    pub network_game_speed: u32,
    /// Fixed steps per second of the authoritative world loop
    pub world_tick_rate: u32,
    /// Horizontal speed at full stick deflection
    pub max_speed: f32,
    /// Apex height of a jump
    pub jump_height: f32,
    /// Signed vertical acceleration (negative is down)
    pub gravity: f32,
    /// Distance above which a prediction is considered wrong
    pub correct_position_threshold: f32,
    pub min_attack_distance: f32,
    /// Radius of the downward stomp probe
    pub hit_probe_radius: f32,
    pub stomp_max_vertical_gap: f32,
    pub stomp_max_horizontal_gap: f32,
    /// Seconds of snapshot history kept for lag compensation
    pub history_retention: f32,
    pub respawn_delay: f32,
    pub spawn_invincibility: f32,
    pub respawn_invincibility: f32,
    /// Minimum interval between remote velocity estimates
    pub velocity_sample_interval: f32,
    /// Full extents of an entity's collision box
    pub body_size: Vector3,
}

impl SimulationConfig {
    /// Duration of one input frame in seconds
    pub fn frame_interval(&self) -> f32 {
        1.0 / self.network_game_speed as f32
    }

    /// Duration of one authoritative world step in seconds
    pub fn world_step(&self) -> f32 {
        1.0 / self.world_tick_rate as f32
    }

    /// Initial upward velocity that reaches `jump_height`
    pub fn jump_velocity(&self) -> f32 {
        (2.0 * self.jump_height * self.gravity.abs()).sqrt()
    }

    /// Length of the downward stomp probe for the given vertical speed
    pub fn attack_distance(&self, vertical_velocity: f32) -> f32 {
        self.min_attack_distance.max(
            self.min_attack_distance
                + vertical_velocity.abs() / self.network_game_speed as f32,
        )
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            network_game_speed: 30,
            world_tick_rate: 60,
            max_speed: 5.0,
            jump_height: 50.0,
            gravity: -98.1,
            correct_position_threshold: 0.5,
            min_attack_distance: 5.0,
            hit_probe_radius: 3.0,
            stomp_max_vertical_gap: 7.0,
            stomp_max_horizontal_gap: 15.0,
            history_retention: 10.0,
            respawn_delay: 3.0,
            spawn_invincibility: 2.0,
            respawn_invincibility: 1.0,
            velocity_sample_interval: 0.1,
            body_size: Vector3::new(4.0, 4.0, 1.0),
        }
    }
}
