//! Authoritative validation of stomp claims against rewound world state
//!
//! A client only ever *claims* a hit. The authority replays the claim at the
//! claimed time: the world is rolled back to the snapshot taken at or just
//! before that instant, the geometry is checked there, and any resulting
//! effects (death, score, respawn scheduling) land on live state.

use crate::world::WorldSimulation;
use log::debug;
use shared::combat::{is_stomp_position, probe_below};
use shared::EntityId;

/// Validates a claim by `attacker` on `target` made at `claim_time`.
///
/// Prefers the claimed target when the rewound positions put the attacker
/// on top of it; otherwise re-runs the stomp probe from the rewound attacker
/// position. Returns the entity actually hit, if any.
pub fn resolve_claim(
    world: &mut WorldSimulation,
    attacker: EntityId,
    target: EntityId,
    claim_time: f32,
) -> Option<EntityId> {
    let hit = world.rollback_to(claim_time, |world| {
        let (origin, velocity) = {
            let entity = world.entity(attacker)?;
            (entity.position(), entity.velocity())
        };

        let claimed = world
            .entity(target)
            .filter(|t| t.id() != attacker)
            .filter(|t| is_stomp_position(origin, t.position(), world.config()))
            .map(|t| t.id());

        let victim = claimed.or_else(|| {
            let targets = world.probe_targets();
            probe_below(
                attacker,
                origin,
                world.config().attack_distance(velocity.y),
                &targets,
                world.arena(),
                world.config(),
            )
        })?;

        world.apply_hit(attacker, victim).then_some(victim)
    });

    if hit.is_none() {
        debug!(
            "Rejected hit claim by {} on {} at {:.3}",
            attacker, target, claim_time
        );
    }
    hit
}
