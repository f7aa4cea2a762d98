//! The authoritative fixed-step world
//!
//! [`WorldSimulation`] owns every entity on the authority. Each render frame
//! the host loop calls [`WorldSimulation::tick`], which catches simulated time
//! up to the network clock in fixed 1/60 s steps. Every step:
//!
//! 1. advances each entity's buffered inputs, freshest input first
//! 2. fires the scheduled actions that have come due
//! 3. records a snapshot and broadcasts every position
//!
//! Snapshots feed lag-compensated hit resolution through
//! [`WorldSimulation::rollback_to`].

use crate::bot::BotInput;
use crate::history::{EntityState, Snapshot, SnapshotHistory};
use crate::hit_resolver;
use crate::schedule::{ActionQueue, ScheduledAction};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::combat::ProbeTarget;
use shared::config::SimulationConfig;
use shared::controller::{PredictedEntityController, StepContext};
use shared::input::{InputSample, InputSource};
use shared::math::Vector3;
use shared::outbox::{Outbound, Outbox};
use shared::physics::Arena;
use shared::session::Session;
use shared::{ClientId, EntityId, Packet, SERVER_CLIENT_ID};
use std::collections::{BTreeMap, HashMap};

pub struct WorldSimulation {
    session: Session,
    config: SimulationConfig,
    arena: Arena,
    entities: BTreeMap<EntityId, PredictedEntityController>,
    bots: HashMap<EntityId, BotInput>,
    bots_active: bool,
    history: SnapshotHistory,
    actions: ActionQueue,
    start_time: f32,
    /// Fixed steps run since `start_time`
    steps_advanced: u64,
    bots_driven_at: Option<f32>,
    next_entity_id: EntityId,
    outbox: Outbox,
    rng: StdRng,
    rolling_back: bool,
}

/// Puts rolled-back entities back where they were, even if the rollback
/// body unwinds.
struct RestoreGuard<'a> {
    world: &'a mut WorldSimulation,
    saved: Vec<(EntityId, Vector3)>,
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        for (entity_id, position) in self.saved.drain(..) {
            if let Some(entity) = self.world.entities.get_mut(&entity_id) {
                entity.teleport(position);
            }
        }
        self.world.rolling_back = false;
    }
}

impl WorldSimulation {
    pub fn new(session: Session, config: SimulationConfig, arena: Arena, start_time: f32) -> Self {
        Self::with_rng(session, config, arena, start_time, StdRng::from_entropy())
    }

    /// Same as [`WorldSimulation::new`] with deterministic spawn points and bots.
    pub fn with_seed(
        session: Session,
        config: SimulationConfig,
        arena: Arena,
        start_time: f32,
        seed: u64,
    ) -> Self {
        Self::with_rng(session, config, arena, start_time, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        session: Session,
        config: SimulationConfig,
        arena: Arena,
        start_time: f32,
        rng: StdRng,
    ) -> Self {
        let history = SnapshotHistory::new(config.history_retention);
        Self {
            session,
            config,
            arena,
            entities: BTreeMap::new(),
            bots: HashMap::new(),
            bots_active: true,
            history,
            actions: ActionQueue::new(),
            start_time,
            steps_advanced: 0,
            bots_driven_at: None,
            next_entity_id: 1,
            outbox: Outbox::new(),
            rng,
            rolling_back: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    /// Simulated time of the next fixed step.
    ///
    /// Derived from the step count so long sessions do not drift.
    pub fn last_advanced_time(&self) -> f32 {
        let elapsed = self.steps_advanced as f64 / f64::from(self.config.world_tick_rate);
        (f64::from(self.start_time) + elapsed) as f32
    }

    pub fn entity(&self, entity_id: EntityId) -> Option<&PredictedEntityController> {
        self.entities.get(&entity_id)
    }

    pub fn entity_mut(&mut self, entity_id: EntityId) -> Option<&mut PredictedEntityController> {
        self.entities.get_mut(&entity_id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &PredictedEntityController> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn pending_actions(&self) -> usize {
        self.actions.len()
    }

    pub fn is_bot(&self, entity_id: EntityId) -> bool {
        self.bots.contains_key(&entity_id)
    }

    /// Takes every packet produced since the last drain.
    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        self.outbox.drain()
    }

    /// Creates an entity at a random spawn point and announces it.
    pub fn spawn_entity(&mut self, owner: ClientId, name: &str) -> EntityId {
        let entity_id = self.next_entity_id;
        self.next_entity_id += 1;

        let position = self.random_spawn_point();
        let entity = PredictedEntityController::new(entity_id, owner, name, position, &self.config);
        self.outbox.broadcast(spawned_packet(&entity));
        self.entities.insert(entity_id, entity);

        info!(
            "Spawned entity {} '{}' for client {} at {:?}",
            entity_id, name, owner, position
        );
        entity_id
    }

    /// Spawns a server-owned entity driven by a [`BotInput`].
    pub fn spawn_bot(&mut self, name: &str) -> EntityId {
        let entity_id = self.spawn_entity(SERVER_CLIENT_ID, name);
        let seed = self.rng.gen();
        let mut bot = BotInput::new(seed);
        bot.set_active(self.bots_active);
        self.bots.insert(entity_id, bot);
        entity_id
    }

    /// Parks every bot (no steering, no jumps) or lets them roam again.
    pub fn set_bots_active(&mut self, active: bool) {
        self.bots_active = active;
        for bot in self.bots.values_mut() {
            bot.set_active(active);
        }
    }

    pub fn despawn_entity(&mut self, entity_id: EntityId) -> bool {
        if self.entities.remove(&entity_id).is_none() {
            return false;
        }
        self.bots.remove(&entity_id);
        self.actions.cancel_for(entity_id);
        self.outbox.broadcast(Packet::Despawned { entity_id });
        info!("Despawned entity {}", entity_id);
        true
    }

    /// Removes every entity owned by `owner`, e.g. when a client leaves.
    pub fn despawn_owned_by(&mut self, owner: ClientId) -> Vec<EntityId> {
        let owned: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| e.owner() == owner)
            .map(|e| e.id())
            .collect();
        for entity_id in &owned {
            self.despawn_entity(*entity_id);
        }
        owned
    }

    /// Packets a newly connected client needs to build its view of the world.
    pub fn spawn_packets(&self) -> Vec<Packet> {
        self.entities.values().map(spawned_packet).collect()
    }

    /// Queues an input received from `sender` for the entity it controls.
    ///
    /// Inputs for entities the sender does not own, for dead entities, or with
    /// a non-finite time are dropped.
    pub fn submit_input(&mut self, sender: ClientId, entity_id: EntityId, mut sample: InputSample) -> bool {
        let Some(entity) = self.entities.get_mut(&entity_id) else {
            debug!("Input for unknown entity {} from client {}", entity_id, sender);
            return false;
        };
        if entity.owner() != sender {
            warn!(
                "Client {} sent input for entity {} owned by {}",
                sender,
                entity_id,
                entity.owner()
            );
            return false;
        }
        if !entity.is_alive() || !sample.time.is_finite() || !sample.horizontal.is_finite() {
            return false;
        }

        sample.horizontal = sample.horizontal.clamp(-1.0, 1.0);
        sample.sent_at = None;
        sample.result_position = Vector3::ZERO;
        entity.submit_input(sample);
        true
    }

    /// Records one input for a locally owned entity (the host's player).
    pub fn record_input(&mut self, entity_id: EntityId, source: &mut dyn InputSource, now: f32) -> bool {
        let targets = self.probe_targets();
        let ctx = StepContext {
            session: &self.session,
            arena: &self.arena,
            config: &self.config,
            targets: &targets,
            now,
        };
        match self.entities.get_mut(&entity_id) {
            Some(entity) => entity.record_local_input(source, &ctx),
            None => false,
        }
    }

    /// Lets every bot look around and record its input for this frame.
    pub fn drive_bots(&mut self, now: f32) {
        let delta_time = self
            .bots_driven_at
            .map_or(0.0, |at| (now - at).max(0.0));
        self.bots_driven_at = Some(now);

        let positions: Vec<(EntityId, Vector3)> = self
            .entities
            .values()
            .filter(|e| e.is_alive())
            .map(|e| (e.id(), e.position()))
            .collect();
        let targets = self.probe_targets();
        let ctx = StepContext {
            session: &self.session,
            arena: &self.arena,
            config: &self.config,
            targets: &targets,
            now,
        };

        for (entity_id, bot) in self.bots.iter_mut() {
            let Some(entity) = self.entities.get_mut(entity_id) else {
                continue;
            };
            let others = positions
                .iter()
                .filter(|(id, _)| id != entity_id)
                .map(|(_, position)| position);
            bot.observe(delta_time, entity.position(), others);
            entity.record_local_input(bot, &ctx);
        }
    }

    pub fn schedule_at(&mut self, time: f32, action: ScheduledAction) {
        self.actions.schedule_at(time, action);
    }

    /// Catches simulated time up to `now` in fixed steps.
    ///
    /// `frame` is the caller's render frame counter; a second call for the
    /// same frame does nothing. Returns the number of fixed steps run.
    pub fn tick(&mut self, now: f32, frame: u64) -> usize {
        if !self.session.is_authority() {
            return 0;
        }
        if self.history.latest().is_some_and(|s| s.frame == frame) {
            return 0;
        }

        let step = self.config.world_step();
        let mut steps = 0;

        while self.last_advanced_time() < now {
            let step_time = self.last_advanced_time();

            self.advance_entities(step_time, step);
            self.fire_due_actions(step_time);
            self.capture_snapshot(frame, step_time);

            self.steps_advanced += 1;
            steps += 1;
        }

        let evicted = self.history.evict();
        if evicted > 0 {
            debug!("Evicted {} snapshots, {} retained", evicted, self.history.len());
        }
        steps
    }

    /// Runs `body` with every entity moved to where it was at `time`, then
    /// moves them back.
    ///
    /// Off the authority, or without a snapshot at or before `time`, `body`
    /// simply runs against the live world. Nested calls do not rewind again.
    pub fn rollback_to<R>(&mut self, time: f32, body: impl FnOnce(&mut WorldSimulation) -> R) -> R {
        if !self.session.is_authority() || self.rolling_back {
            return body(self);
        }

        let recorded = self.history.at_or_before(time).map(|s| s.entities.clone());
        let Some(recorded) = recorded else {
            debug!("No snapshot at or before {:.3}, using live positions", time);
            return body(self);
        };

        let mut saved = Vec::with_capacity(recorded.len());
        for state in &recorded {
            if let Some(entity) = self.entities.get_mut(&state.entity_id) {
                saved.push((state.entity_id, entity.position()));
                entity.teleport(state.position);
            }
        }

        self.rolling_back = true;
        let guard = RestoreGuard { world: self, saved };
        body(&mut *guard.world)
    }

    /// Applies an accepted stomp to live state and schedules the victim's
    /// relocation and respawn. Returns false if the victim rejected the hit.
    pub fn apply_hit(&mut self, attacker: EntityId, victim: EntityId) -> bool {
        let now = self.last_advanced_time();

        let accepted = self
            .entities
            .get_mut(&victim)
            .is_some_and(|target| target.receive_hit(attacker));
        if !accepted {
            return false;
        }

        let score = match self.entities.get_mut(&attacker) {
            Some(entity) => {
                entity.vitals_mut().score += 1;
                entity.vitals().score
            }
            None => 0,
        };
        info!(
            "Entity {} stomped entity {} at {:.3} (score {})",
            attacker, victim, now, score
        );

        self.outbox.broadcast(Packet::Hit {
            target: victim,
            attacker,
            time: now,
        });
        self.outbox.broadcast(Packet::Score {
            entity_id: attacker,
            score,
        });
        self.actions
            .schedule_at(now, ScheduledAction::RelocateToSpawn { entity: victim });
        self.actions.schedule_at(
            now + self.config.respawn_delay,
            ScheduledAction::Respawn { entity: victim },
        );
        true
    }

    /// Zeroes every score, e.g. when a new match starts.
    pub fn reset_scores(&mut self) {
        for entity in self.entities.values_mut() {
            entity.vitals_mut().score = 0;
            self.outbox.broadcast(Packet::Score {
                entity_id: entity.id(),
                score: 0,
            });
        }
    }

    /// Entity ids with their scores, best first.
    pub fn leaderboard(&self) -> Vec<(EntityId, String, u32)> {
        let mut board: Vec<(EntityId, String, u32)> = self
            .entities
            .values()
            .map(|e| (e.id(), e.name().to_string(), e.vitals().score))
            .collect();
        board.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
        board
    }

    /// Every entity as seen by the stomp probe, at current positions.
    pub fn probe_targets(&self) -> Vec<ProbeTarget> {
        self.entities.values().map(|e| e.probe_target()).collect()
    }

    fn advance_entities(&mut self, step_time: f32, step: f32) {
        let mut order: Vec<(EntityId, f32)> = self
            .entities
            .values()
            .map(|e| (e.id(), e.pending_input_time()))
            .collect();
        order.sort_by(|a, b| b.1.total_cmp(&a.1));

        let targets = self.probe_targets();
        let ctx = StepContext {
            session: &self.session,
            arena: &self.arena,
            config: &self.config,
            targets: &targets,
            now: step_time,
        };

        let mut claims = Vec::new();
        for (entity_id, _) in order {
            if let Some(entity) = self.entities.get_mut(&entity_id) {
                claims.extend(entity.advance_buffered_inputs_to(step_time, &ctx, &mut self.outbox));
                entity.vitals_mut().tick(step);
            }
        }

        for claim in claims {
            debug!(
                "Entity {} claims a hit on {} at {:.3}",
                claim.attacker, claim.target, claim.time
            );
            self.actions.schedule_at(
                claim.time,
                ScheduledAction::ResolveHit {
                    attacker: claim.attacker,
                    target: claim.target,
                    claim_time: claim.time,
                },
            );
        }
    }

    fn fire_due_actions(&mut self, step_time: f32) {
        while let Some(action) = self.actions.pop_due(step_time) {
            match action {
                ScheduledAction::ResolveHit {
                    attacker,
                    target,
                    claim_time,
                } => {
                    hit_resolver::resolve_claim(self, attacker, target, claim_time);
                }
                ScheduledAction::RelocateToSpawn { entity } => self.relocate_to_spawn(entity),
                ScheduledAction::Respawn { entity } => self.respawn(entity),
            }
        }
    }

    fn capture_snapshot(&mut self, frame: u64, step_time: f32) {
        let entities: Vec<EntityState> = self
            .entities
            .values()
            .map(|e| EntityState {
                entity_id: e.id(),
                position: e.position(),
                alive: e.is_alive(),
            })
            .collect();

        for state in &entities {
            self.outbox.broadcast(Packet::Position {
                entity_id: state.entity_id,
                position: state.position,
                time: step_time,
            });
        }

        self.history.push(Snapshot {
            frame,
            simulated_time: step_time,
            entities,
        });
    }

    fn relocate_to_spawn(&mut self, entity_id: EntityId) {
        let position = self.random_spawn_point();
        if let Some(entity) = self.entities.get_mut(&entity_id) {
            entity.teleport(position);
        }
    }

    fn respawn(&mut self, entity_id: EntityId) {
        let Some(entity) = self.entities.get_mut(&entity_id) else {
            return;
        };
        entity.respawn(self.config.respawn_invincibility);
        self.outbox.broadcast(Packet::Respawned {
            entity_id,
            position: entity.position(),
        });
        debug!("Entity {} respawned at {:?}", entity_id, entity.position());
    }

    fn random_spawn_point(&mut self) -> Vector3 {
        if self.arena.spawn_points.is_empty() {
            return Vector3::new(0.0, self.config.body_size.y, 0.0);
        }
        let index = self.rng.gen_range(0..self.arena.spawn_points.len());
        self.arena.spawn_points[index]
    }
}

fn spawned_packet(entity: &PredictedEntityController) -> Packet {
    Packet::Spawned {
        entity_id: entity.id(),
        owner: entity.owner(),
        name: entity.name().to_string(),
        position: entity.position(),
        alive: entity.is_alive(),
        score: entity.vitals().score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::input::ScriptedInput;

    const STEP: f32 = 1.0 / 60.0;

    fn server_world() -> WorldSimulation {
        WorldSimulation::with_seed(
            Session::server(),
            SimulationConfig::default(),
            Arena::flat(),
            0.0,
            42,
        )
    }

    fn count_positions(messages: &[Outbound]) -> usize {
        messages
            .iter()
            .filter(|m| matches!(m, Outbound::Broadcast(Packet::Position { .. })))
            .count()
    }

    #[test]
    fn test_tick_runs_fixed_steps() {
        let mut world = server_world();
        world.spawn_entity(3, "a");

        let steps = world.tick(0.09, 1);
        assert_eq!(steps, 6);
        assert_eq!(world.history().len(), 6);
        assert_approx_eq!(world.last_advanced_time(), 6.0 * STEP, 0.0001);
        assert_eq!(count_positions(&world.drain_outbox()), 6);
    }

    #[test]
    fn test_tick_is_idempotent_per_frame() {
        let mut world = server_world();
        world.spawn_entity(3, "a");

        world.tick(0.05, 1);
        let snapshots = world.history().len();
        assert_eq!(world.tick(0.5, 1), 0);
        assert_eq!(world.history().len(), snapshots);

        assert!(world.tick(0.5, 2) > 0);
    }

    #[test]
    fn test_tick_does_nothing_off_authority() {
        let mut world = WorldSimulation::with_seed(
            Session::client(1),
            SimulationConfig::default(),
            Arena::flat(),
            0.0,
            1,
        );
        assert_eq!(world.tick(1.0, 1), 0);
        assert!(world.history().is_empty());
    }

    #[test]
    fn test_history_stays_monotonic_and_bounded() {
        let mut world = server_world();
        world.spawn_entity(3, "a");

        for frame in 1..=150 {
            world.tick(frame as f32 * 0.1, frame);
            world.drain_outbox();
        }

        let times: Vec<f32> = world.history().iter().map(|s| s.simulated_time).collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        assert!(world.history().span() < 10.0);
        assert!(world.history().len() > 2);
    }

    #[test]
    fn test_submitted_inputs_move_entity_and_correct_owner() {
        let mut world = server_world();
        let id = world.spawn_entity(3, "runner");
        world.drain_outbox();
        let start = world.entity(id).unwrap().position();

        assert!(world.submit_input(3, id, InputSample::new(0.0, 1.0, false)));
        world.tick(0.01, 1);

        let entity = world.entity(id).unwrap();
        assert_approx_eq!(entity.position().x, start.x + 5.0 / 30.0, 0.0001);

        let corrections: Vec<_> = world
            .drain_outbox()
            .into_iter()
            .filter(|m| matches!(m, Outbound::ToClient { client_id: 3, packet: Packet::Correction { .. } }))
            .collect();
        assert_eq!(corrections.len(), 1);
    }

    #[test]
    fn test_submit_input_rejects_foreign_owner() {
        let mut world = server_world();
        let id = world.spawn_entity(3, "a");

        assert!(!world.submit_input(4, id, InputSample::new(0.0, 1.0, false)));
        assert!(!world.submit_input(3, 99, InputSample::new(0.0, 1.0, false)));
        assert!(!world.submit_input(3, id, InputSample::new(f32::NAN, 1.0, false)));
        assert!(world.entity(id).unwrap().inputs().is_empty());
    }

    #[test]
    fn test_entities_processed_by_descending_pending_time() {
        let mut world = server_world();
        let stale = world.spawn_entity(3, "stale");
        let fresh = world.spawn_entity(4, "fresh");
        world.drain_outbox();

        world.submit_input(3, stale, InputSample::new(0.0, 1.0, false));
        world.submit_input(4, fresh, InputSample::new(0.0, 1.0, false));
        world.submit_input(4, fresh, InputSample::new(5.0, 1.0, false));
        world.tick(0.01, 1);

        let order: Vec<ClientId> = world
            .drain_outbox()
            .into_iter()
            .filter_map(|m| match m {
                Outbound::ToClient { client_id, .. } => Some(client_id),
                _ => None,
            })
            .collect();
        assert_eq!(order, vec![4, 3]);
    }

    #[test]
    fn test_scheduled_actions_fire_at_trigger_time() {
        let mut world = server_world();
        let id = world.spawn_entity(3, "a");
        world.entity_mut(id).unwrap().explode();

        world.schedule_at(0.5, ScheduledAction::Respawn { entity: id });
        world.tick(0.4, 1);
        assert!(!world.entity(id).unwrap().is_alive());

        world.tick(0.6, 2);
        assert!(world.entity(id).unwrap().is_alive());
        assert_eq!(world.pending_actions(), 0);
    }

    #[test]
    fn test_step_times_do_not_drift() {
        let mut world = server_world();

        let mut steps = 0;
        for second in 1..=1800u64 {
            steps += world.tick(second as f32, second);
            world.drain_outbox();
        }

        assert_eq!(steps, 1800 * 60);
        assert_eq!(world.last_advanced_time(), 1800.0);
        let latest = world.history().latest().unwrap().simulated_time;
        assert_approx_eq!(latest, 1800.0 - STEP, 0.001);
    }

    #[test]
    fn test_hit_relocation_fires_within_the_same_step() {
        let config = SimulationConfig {
            spawn_invincibility: 0.0,
            ..SimulationConfig::default()
        };
        let mut world = WorldSimulation::with_seed(Session::server(), config, Arena::standard(), 0.0, 5);
        let attacker = world.spawn_entity(3, "attacker");
        let victim = world.spawn_entity(4, "victim");
        world.entity_mut(attacker).unwrap().teleport(Vector3::new(3.0, 4.0, 0.0));
        world.entity_mut(victim).unwrap().teleport(Vector3::new(0.0, 2.0, 0.0));

        world.schedule_at(
            0.0,
            ScheduledAction::ResolveHit {
                attacker,
                target: victim,
                claim_time: 0.0,
            },
        );
        assert_eq!(world.tick(0.001, 1), 1);

        // The hit scheduled a relocation at the same step time, and it already
        // ran; only the delayed respawn is still pending.
        let victim = world.entity(victim).unwrap();
        assert!(!victim.is_alive());
        assert!(world.arena().spawn_points.contains(&victim.position()));
        assert_eq!(world.pending_actions(), 1);
    }

    #[test]
    fn test_rollback_restores_positions() {
        let mut world = server_world();
        let id = world.spawn_entity(3, "a");
        world.tick(0.1, 1);

        let live = Vector3::new(30.0, 2.0, 0.0);
        world.entity_mut(id).unwrap().teleport(live);
        let recorded = world.history().at_or_before(0.05).unwrap().entity(id).unwrap().position;

        let seen = world.rollback_to(0.05, |world| {
            let seen = world.entity(id).unwrap().position();
            world.entity_mut(id).unwrap().teleport(Vector3::new(-50.0, 9.0, 0.0));
            seen
        });

        assert_eq!(seen, recorded);
        assert_eq!(world.entity(id).unwrap().position(), live);
    }

    #[test]
    fn test_rollback_restores_positions_on_panic() {
        let mut world = server_world();
        let id = world.spawn_entity(3, "a");
        world.tick(0.1, 1);
        let live = Vector3::new(30.0, 2.0, 0.0);
        world.entity_mut(id).unwrap().teleport(live);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: () = world.rollback_to(0.05, |_| panic!("rollback body failed"));
        }));

        assert!(result.is_err());
        assert_eq!(world.entity(id).unwrap().position(), live);
    }

    #[test]
    fn test_rollback_without_snapshot_uses_live_positions() {
        let mut world = server_world();
        let id = world.spawn_entity(3, "a");
        let live = world.entity(id).unwrap().position();

        let seen = world.rollback_to(-20.0, |world| world.entity(id).unwrap().position());
        assert_eq!(seen, live);
        assert_eq!(world.entity(id).unwrap().position(), live);
    }

    #[test]
    fn test_despawn_cancels_actions() {
        let mut world = server_world();
        let id = world.spawn_entity(3, "a");
        world.schedule_at(5.0, ScheduledAction::Respawn { entity: id });

        assert!(world.despawn_entity(id));
        assert!(!world.despawn_entity(id));
        assert_eq!(world.pending_actions(), 0);
        assert!(world
            .drain_outbox()
            .iter()
            .any(|m| matches!(m, Outbound::Broadcast(Packet::Despawned { entity_id }) if *entity_id == id)));
    }

    #[test]
    fn test_bots_record_and_move() {
        let mut world = server_world();
        let bot = world.spawn_bot("bot");
        let start = world.entity(bot).unwrap().position();

        for frame in 1..=30u64 {
            let now = frame as f32 / 30.0;
            world.drive_bots(now);
            world.tick(now, frame);
        }

        let entity = world.entity(bot).unwrap();
        assert!(world.is_bot(bot));
        assert!((entity.position().x - start.x).abs() > 0.1);
        // Bot inputs are acknowledged locally and never pile up.
        assert!(entity.inputs().len() <= 1);
        assert!(!world
            .drain_outbox()
            .iter()
            .any(|m| matches!(m, Outbound::ToClient { .. })));
    }

    #[test]
    fn test_parked_bots_stand_still() {
        let mut world = server_world();
        world.set_bots_active(false);
        let bot = world.spawn_bot("bot");
        let start = world.entity(bot).unwrap().position();

        for frame in 1..=30u64 {
            let now = frame as f32 / 30.0;
            world.drive_bots(now);
            world.tick(now, frame);
        }
        assert_approx_eq!(world.entity(bot).unwrap().position().x, start.x, 1e-6);

        world.set_bots_active(true);
        for frame in 31..=60u64 {
            let now = frame as f32 / 30.0;
            world.drive_bots(now);
            world.tick(now, frame);
        }
        assert!((world.entity(bot).unwrap().position().x - start.x).abs() > 0.1);
    }

    #[test]
    fn test_leaderboard_orders_by_score() {
        let mut world = server_world();
        let a = world.spawn_entity(3, "a");
        let b = world.spawn_entity(4, "b");
        world.entity_mut(b).unwrap().vitals_mut().score = 3;

        let board = world.leaderboard();
        assert_eq!(board[0].0, b);
        assert_eq!(board[1].0, a);

        world.reset_scores();
        assert!(world.leaderboard().iter().all(|(_, _, score)| *score == 0));
    }
}
