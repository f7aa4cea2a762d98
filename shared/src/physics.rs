//! Axis-aligned arena collision and the shared motion integrator
//!
//! Both the authority and predicting clients move entities through exactly the
//! same code: [`integrate`] turns an input into a velocity and displacement,
//! and [`CharacterBody::move_by`] sweeps that displacement through the arena's
//! static platforms one axis at a time.

use crate::config::SimulationConfig;
use crate::math::Vector3;
use serde::{Deserialize, Serialize};

/// Penetration tolerated before two boxes count as overlapping.
const SKIN: f32 = 1e-3;

///Represents an axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vector3,
    pub max: Vector3,
}

impl Aabb {
    pub fn from_center(center: Vector3, size: Vector3) -> Self {
        let half = size.scale(0.5);
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vector3 {
        (self.min + self.max).scale(0.5)
    }

    fn overlaps_x(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x - SKIN && self.max.x > other.min.x + SKIN
    }

    fn overlaps_y(&self, other: &Aabb) -> bool {
        self.min.y < other.max.y - SKIN && self.max.y > other.min.y + SKIN
    }

    /// Casts a sphere straight down from `origin` and returns the travelled
    /// distance at first contact, or `None` if the box is never touched within
    /// `max_distance`. A sphere that starts inside the box reports 0.
    pub fn sphere_cast_down(&self, origin: Vector3, radius: f32, max_distance: f32) -> Option<f32> {
        let nearest_x = origin.x.clamp(self.min.x, self.max.x);
        let dx = (origin.x - nearest_x).abs();
        if dx > radius {
            return None;
        }

        // Vertical reach of the sphere at the box's nearest column.
        let reach = (radius * radius - dx * dx).sqrt();

        if origin.y < self.min.y - reach {
            return None;
        }
        if origin.y <= self.max.y + reach {
            return Some(0.0);
        }

        let travel = origin.y - reach - self.max.y;
        (travel <= max_distance).then_some(travel)
    }
}

///Represents a static platform in the arena.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Platform {
    pub bounds: Aabb,
    /// One-way platforms only stop bodies falling onto them from above
    pub one_way: bool,
}

impl Platform {
    pub fn solid(center: Vector3, size: Vector3) -> Self {
        Self {
            bounds: Aabb::from_center(center, size),
            one_way: false,
        }
    }

    pub fn one_way(center: Vector3, size: Vector3) -> Self {
        Self {
            bounds: Aabb::from_center(center, size),
            one_way: true,
        }
    }
}

/// Static level geometry and spawn locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena {
    pub platforms: Vec<Platform>,
    pub spawn_points: Vec<Vector3>,
}

impl Arena {
    pub fn new(platforms: Vec<Platform>, spawn_points: Vec<Vector3>) -> Self {
        Self {
            platforms,
            spawn_points,
        }
    }

    /// A floor with bounding walls and three one-way ledges.
    pub fn standard() -> Self {
        let platforms = vec![
            Platform::solid(Vector3::new(0.0, -5.0, 0.0), Vector3::new(140.0, 10.0, 10.0)),
            Platform::solid(Vector3::new(-72.0, 40.0, 0.0), Vector3::new(4.0, 100.0, 10.0)),
            Platform::solid(Vector3::new(72.0, 40.0, 0.0), Vector3::new(4.0, 100.0, 10.0)),
            Platform::one_way(Vector3::new(-35.0, 20.0, 0.0), Vector3::new(30.0, 2.0, 10.0)),
            Platform::one_way(Vector3::new(35.0, 20.0, 0.0), Vector3::new(30.0, 2.0, 10.0)),
            Platform::one_way(Vector3::new(0.0, 40.0, 0.0), Vector3::new(36.0, 2.0, 10.0)),
        ];
        let spawn_points = vec![
            Vector3::new(-50.0, 2.0, 0.0),
            Vector3::new(50.0, 2.0, 0.0),
            Vector3::new(-35.0, 23.0, 0.0),
            Vector3::new(35.0, 23.0, 0.0),
            Vector3::new(0.0, 43.0, 0.0),
        ];
        Self::new(platforms, spawn_points)
    }

    /// A bare floor whose top sits at `y = 0`.
    pub fn flat() -> Self {
        Self::new(
            vec![Platform::solid(
                Vector3::new(0.0, -50.0, 0.0),
                Vector3::new(10_000.0, 100.0, 10.0),
            )],
            vec![Vector3::new(0.0, 2.0, 0.0)],
        )
    }
}

/// Contacts reported by a single [`CharacterBody::move_by`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionFlags {
    pub below: bool,
    pub above: bool,
    pub sides: bool,
}

///Represents a moving character box. `position` is the box center.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CharacterBody {
    pub position: Vector3,
    pub size: Vector3,
    /// Disabled bodies neither move nor collide
    pub collision_enabled: bool,
    /// True when the last move ended resting on a platform
    pub grounded: bool,
}

impl CharacterBody {
    pub fn new(position: Vector3, size: Vector3) -> Self {
        Self {
            position,
            size,
            collision_enabled: true,
            grounded: false,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, self.size)
    }

    /// Sets the position directly, bypassing collision response.
    pub fn teleport(&mut self, position: Vector3) {
        self.position = position;
    }

    /// Sweeps the body through the arena, x first then y.
    pub fn move_by(&mut self, displacement: Vector3, arena: &Arena) -> CollisionFlags {
        let mut flags = CollisionFlags::default();
        if !self.collision_enabled {
            return flags;
        }

        let dx = self.sweep_x(displacement.x, arena);
        if dx != displacement.x {
            flags.sides = true;
        }
        self.position.x += dx;

        let dy = self.sweep_y(displacement.y, arena);
        if dy != displacement.y {
            if displacement.y < 0.0 {
                flags.below = true;
            } else {
                flags.above = true;
            }
        }
        self.position.y += dy;
        self.position.z += displacement.z;

        self.grounded = flags.below;
        flags
    }

    fn sweep_x(&self, dx: f32, arena: &Arena) -> f32 {
        if dx == 0.0 {
            return 0.0;
        }
        let bounds = self.bounds();
        let mut allowed = dx;

        for platform in arena.platforms.iter().filter(|p| !p.one_way) {
            let other = &platform.bounds;
            if !bounds.overlaps_y(other) {
                continue;
            }
            if dx > 0.0 && bounds.max.x <= other.min.x + SKIN {
                allowed = allowed.min((other.min.x - bounds.max.x).max(0.0));
            } else if dx < 0.0 && bounds.min.x >= other.max.x - SKIN {
                allowed = allowed.max((other.max.x - bounds.min.x).min(0.0));
            }
        }
        allowed
    }

    fn sweep_y(&self, dy: f32, arena: &Arena) -> f32 {
        if dy == 0.0 {
            return 0.0;
        }
        let bounds = self.bounds();
        let mut allowed = dy;

        for platform in &arena.platforms {
            let other = &platform.bounds;
            if !bounds.overlaps_x(other) {
                continue;
            }
            if dy < 0.0 && bounds.min.y >= other.max.y - SKIN {
                allowed = allowed.max((other.max.y - bounds.min.y).min(0.0));
            } else if dy > 0.0 && !platform.one_way && bounds.max.y <= other.min.y + SKIN {
                allowed = allowed.min((other.min.y - bounds.max.y).max(0.0));
            }
        }
        allowed
    }
}

/// A single frame of player intent as seen by the integrator
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionInput {
    pub horizontal: f32,
    pub jump: bool,
}

/// Computes the new velocity and the displacement to sweep for one frame.
///
/// Pure: collision response (zeroing `y` after hitting a ceiling) is the
/// caller's job once the displacement has been applied.
pub fn integrate(
    velocity: Vector3,
    input: MotionInput,
    grounded: bool,
    delta_time: f32,
    config: &SimulationConfig,
) -> (Vector3, Vector3) {
    let mut velocity = velocity;

    if input.horizontal != 0.0 {
        velocity.x = config.max_speed * input.horizontal;
    } else {
        velocity.x = 0.0;
    }

    if grounded {
        velocity.y = 0.0;
        if input.jump {
            velocity.y = config.jump_velocity();
        }
    }

    velocity.y += config.gravity * delta_time;

    (velocity, velocity.scale(delta_time))
}
