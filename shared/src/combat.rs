//! Stomp rules: who can be hit, how a hit is claimed and how it is validated

use crate::config::SimulationConfig;
use crate::math::Vector3;
use crate::physics::{Aabb, Arena};
use crate::EntityId;

/// Life, score and hit protection of one entity
#[derive(Debug, Clone)]
pub struct Vitals {
    pub alive: bool,
    pub score: u32,
    invincible_for: f32,
    /// Set by the first accepted hit, cleared on respawn
    hit_by: Option<EntityId>,
}

impl Vitals {
    pub fn new(invincibility: f32) -> Self {
        Self {
            alive: true,
            score: 0,
            invincible_for: invincibility,
            hit_by: None,
        }
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible_for > 0.0
    }

    pub fn invincible_for(&self) -> f32 {
        self.invincible_for
    }

    pub fn hit_by(&self) -> Option<EntityId> {
        self.hit_by
    }

    /// Accepts a hit unless one is already pending or the entity is
    /// invincible. Returns true when the hit kills.
    pub fn receive_hit(&mut self, attacker: EntityId) -> bool {
        if self.is_invincible() || self.hit_by.is_some() {
            return false;
        }
        self.hit_by = Some(attacker);
        self.alive = false;
        true
    }

    pub fn respawn(&mut self, invincibility: f32) {
        self.hit_by = None;
        self.invincible_for += invincibility;
        self.alive = true;
    }

    pub fn tick(&mut self, delta_time: f32) {
        if self.invincible_for > 0.0 {
            self.invincible_for = (self.invincible_for - delta_time).max(0.0);
        }
    }
}

/// An entity as seen by the stomp probe
#[derive(Debug, Clone, Copy)]
pub struct ProbeTarget {
    pub id: EntityId,
    pub bounds: Aabb,
    pub alive: bool,
    /// Entities with collision disabled are invisible to the probe
    pub solid: bool,
}

/// Casts the stomp probe straight down from `origin`.
///
/// Considers platforms and other solid entities; the nearest collider wins,
/// and a platform at the same distance as an entity counts as nearer (a body
/// resting on the floor always touches it). Returns the id of that collider
/// when it is a live entity other than the attacker.
pub fn probe_below(
    attacker: EntityId,
    origin: Vector3,
    attack_distance: f32,
    targets: &[ProbeTarget],
    arena: &Arena,
    config: &SimulationConfig,
) -> Option<EntityId> {
    let radius = config.hit_probe_radius;

    let nearest_entity = targets
        .iter()
        .filter(|t| t.id != attacker && t.solid)
        .filter_map(|t| {
            t.bounds
                .sphere_cast_down(origin, radius, attack_distance)
                .map(|distance| (distance, t))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0));

    let nearest_platform = arena
        .platforms
        .iter()
        .filter_map(|p| p.bounds.sphere_cast_down(origin, radius, attack_distance))
        .min_by(|a, b| a.total_cmp(b));

    let (distance, target) = nearest_entity?;
    if let Some(platform_distance) = nearest_platform {
        if platform_distance <= distance {
            return None;
        }
    }

    target.alive.then_some(target.id)
}

/// True when the attacker stands on top of the target closely enough to
/// count as a stomp.
pub fn is_stomp_position(attacker: Vector3, target: Vector3, config: &SimulationConfig) -> bool {
    attacker.y >= target.y
        && (attacker.y - target.y).abs() <= config.stomp_max_vertical_gap
        && (attacker.x - target.x).abs() <= config.stomp_max_horizontal_gap
}
