//! Client-side prediction and server reconciliation for one controlled entity
//!
//! The same controller type runs on every process:
//!
//! - On the **owning client** it records one input per frame, simulates it
//!   immediately, forwards it to the authority exactly once, and later
//!   reconciles against the authority's result.
//! - On the **authority** it receives the client's raw inputs, replays them
//!   from the world loop and returns each result to the owner.
//! - On a **host** (authority with a local player) both happen in-process and
//!   results are acknowledged without a round trip.
//!
//! Inputs live in an ordered buffer with a processing cursor: everything
//! before the cursor has been integrated, everything after it is pending.
//! Acknowledged inputs are dropped from the front and the cursor is rebased
//! so the buffer never grows without bound.

use crate::combat::{probe_below, ProbeTarget, Vitals};
use crate::config::SimulationConfig;
use crate::input::{InputSample, InputSource};
use crate::math::Vector3;
use crate::outbox::Outbox;
use crate::physics::{integrate, Arena, CharacterBody};
use crate::session::Session;
use crate::{ClientId, EntityId, Packet};
use log::{debug, error};

/// Everything a controller needs from its surroundings for one call
pub struct StepContext<'a> {
    pub session: &'a Session,
    pub arena: &'a Arena,
    pub config: &'a SimulationConfig,
    /// Other entities, for the stomp probe
    pub targets: &'a [ProbeTarget],
    /// Current simulated network time
    pub now: f32,
}

/// A stomp claimed by an input, waiting for authoritative validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitClaim {
    pub attacker: EntityId,
    pub target: EntityId,
    /// Input time at which the attacker saw the hit
    pub time: f32,
}

/// What reconciliation did with an authoritative result
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconcileOutcome {
    /// No matching input; position was snapped to the result
    Snapped,
    /// The local process is authoritative; inputs were simply dropped
    Acknowledged,
    /// Prediction was within tolerance
    Confirmed,
    /// Prediction was off by `error`; position was corrected and later
    /// inputs replayed
    Corrected { error: f32 },
}

pub struct PredictedEntityController {
    id: EntityId,
    owner: ClientId,
    name: String,
    body: CharacterBody,
    velocity: Vector3,
    vitals: Vitals,
    inputs: Vec<InputSample>,
    /// Index of the first input not yet integrated
    processing_index: usize,
    latest_input: Option<InputSample>,
    /// Newest input time received from the owner
    pending_input_time: f32,
}

impl PredictedEntityController {
    pub fn new(
        id: EntityId,
        owner: ClientId,
        name: impl Into<String>,
        position: Vector3,
        config: &SimulationConfig,
    ) -> Self {
        Self {
            id,
            owner,
            name: name.into(),
            body: CharacterBody::new(position, config.body_size),
            velocity: Vector3::ZERO,
            vitals: Vitals::new(config.spawn_invincibility),
            inputs: Vec::new(),
            processing_index: 0,
            latest_input: None,
            pending_input_time: 0.0,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn owner(&self) -> ClientId {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vector3 {
        self.body.position
    }

    pub fn velocity(&self) -> Vector3 {
        self.velocity
    }

    pub fn body(&self) -> &CharacterBody {
        &self.body
    }

    pub fn vitals(&self) -> &Vitals {
        &self.vitals
    }

    pub fn vitals_mut(&mut self) -> &mut Vitals {
        &mut self.vitals
    }

    pub fn is_alive(&self) -> bool {
        self.vitals.alive
    }

    pub fn inputs(&self) -> &[InputSample] {
        &self.inputs
    }

    pub fn processing_index(&self) -> usize {
        self.processing_index
    }

    pub fn pending_input_time(&self) -> f32 {
        self.pending_input_time
    }

    /// Moves the entity without collision response.
    pub fn teleport(&mut self, position: Vector3) {
        self.body.teleport(position);
    }

    pub fn probe_target(&self) -> ProbeTarget {
        ProbeTarget {
            id: self.id,
            bounds: self.body.bounds(),
            alive: self.vitals.alive,
            solid: self.body.collision_enabled,
        }
    }

    /// Samples the local input source; call once per rendered frame.
    ///
    /// Records at most one input per input frame. Calls landing inside the
    /// same frame instead pull a predicting client gently toward its last
    /// predicted result so visible jitter is smoothed rather than snapped.
    /// Returns true when a new sample was recorded.
    pub fn record_local_input(&mut self, source: &mut dyn InputSource, ctx: &StepContext) -> bool {
        if !self.body.collision_enabled || !self.vitals.alive {
            return false;
        }

        let (horizontal, jump) = source.read_input();
        let sample = InputSample::new(ctx.now, horizontal, jump);
        let frame = ctx.config.frame_interval();

        let is_new_frame = match &self.latest_input {
            Some(latest) => sample.time - latest.time >= frame,
            None => true,
        };

        if is_new_frame {
            self.latest_input = Some(sample.clone());
            if ctx.session.is_owner(self.owner) {
                self.inputs.push(sample);
            }
            return true;
        }

        if ctx.session.is_owner(self.owner) && !ctx.session.is_authority() {
            if let Some(latest) = &self.latest_input {
                let target = latest.result_position;
                let error = target.distance(&self.body.position);
                if !target.is_zero() && error >= ctx.config.correct_position_threshold {
                    let nudge = (target - self.body.position).scale(frame);
                    self.body.move_by(nudge, ctx.arena);
                }
            }
        }
        false
    }

    /// Queues an input received from the owning client (authority side).
    pub fn submit_input(&mut self, sample: InputSample) {
        if sample.time > self.pending_input_time {
            self.pending_input_time = sample.time;
        }
        self.inputs.push(sample);
    }

    /// Integrates every buffered input with `time <= time`, in arrival order.
    ///
    /// On the authority each result is returned to the owner and claimed hits
    /// are handed back for scheduling; on a client each input is forwarded to
    /// the authority the first time it is integrated.
    pub fn advance_buffered_inputs_to(
        &mut self,
        time: f32,
        ctx: &StepContext,
        outbox: &mut Outbox,
    ) -> Vec<HitClaim> {
        let frame = ctx.config.frame_interval();
        let mut claims = Vec::new();
        let mut acknowledged = None;

        while self.processing_index < self.inputs.len() {
            let index = self.processing_index;
            if self.inputs[index].time > time {
                break;
            }

            let delta = if self.inputs.len() >= 2 && index >= 1 {
                frame.max(self.inputs[index].time - self.inputs[index - 1].time)
            } else {
                frame
            };

            self.apply_input(index, delta, ctx);

            let velocity = self.velocity;
            let input = &mut self.inputs[index];
            if ctx.session.is_authority() {
                if input.sent_at.is_none() {
                    input.sent_at = Some(ctx.now);
                }

                if ctx.session.is_owner(self.owner) {
                    acknowledged = Some((input.time, input.result_position, velocity));
                } else {
                    outbox.to_client(
                        self.owner,
                        Packet::Correction {
                            entity_id: self.id,
                            time: input.time,
                            position: input.result_position,
                            velocity,
                        },
                    );
                }

                if let Some(target) = input.claimed_target {
                    claims.push(HitClaim {
                        attacker: self.id,
                        target,
                        time: input.time,
                    });
                }
            } else if input.sent_at.is_none() {
                input.sent_at = Some(ctx.now);
                outbox.to_authority(Packet::Input {
                    entity_id: self.id,
                    time: input.time,
                    horizontal: input.horizontal,
                    jump: input.jump_requested,
                    claimed_target: input.claimed_target,
                });
            }

            self.processing_index += 1;
        }

        // Locally owned on the authority: the result is final already.
        if let Some((time, position, velocity)) = acknowledged {
            self.on_authority_result(time, position, velocity, ctx);
        }

        // Remote-owned inputs are settled once their result is on its way to
        // the owner. The newest one stays for the next frame's delta.
        if ctx.session.is_authority() && !ctx.session.is_owner(self.owner) {
            let settled = self.processing_index.saturating_sub(1);
            self.inputs.drain(..settled);
            self.processing_index -= settled;
        }

        claims
    }

    /// Reconciles the prediction with the authority's result for the input
    /// frame at `time`.
    pub fn on_authority_result(
        &mut self,
        time: f32,
        position: Vector3,
        velocity: Vector3,
        ctx: &StepContext,
    ) -> ReconcileOutcome {
        let found = self
            .inputs
            .iter()
            .position(|input| input.sent_at.is_some() && input.time >= time);

        let Some(index) = found else {
            if self.vitals.alive {
                let sent: Vec<f32> = self.inputs.iter().filter_map(|i| i.sent_at).collect();
                error!(
                    "Entity {}: result at {:.3} with pos {:?} has no matching input (sent range {:?}..{:?})",
                    self.id,
                    time,
                    position,
                    sent.iter().cloned().reduce(f32::min),
                    sent.iter().cloned().reduce(f32::max),
                );
                self.processing_index = 0;
            }
            self.body.teleport(position);
            return ReconcileOutcome::Snapped;
        };

        if ctx.session.is_authority() {
            self.discard_through(index);
            return ReconcileOutcome::Acknowledged;
        }

        // fraction = (time - t0) / time
        let fraction = if time != 0.0 {
            (time - self.inputs[index].time) / time
        } else {
            0.0
        };
        let from = self.inputs[index].result_position;
        let to = self
            .inputs
            .get(index + 1)
            .map_or(from, |next| next.result_position);
        let predicted = from.lerp(&to, fraction);

        let error = predicted.distance(&position);
        let outcome = if error > ctx.config.correct_position_threshold {
            debug!(
                "Entity {}: correcting prediction at {:.3}, error {:.3} (predicted {:?}, authority {:?})",
                self.id, time, error, predicted, position
            );
            self.velocity = velocity;
            self.body.teleport(position);

            let matched = &mut self.inputs[index];
            matched.result_position = position;
            if let Some(latest) = &mut self.latest_input {
                if latest.time == matched.time {
                    latest.result_position = position;
                }
            }

            self.replay_after(index, ctx);
            ReconcileOutcome::Corrected { error }
        } else {
            ReconcileOutcome::Confirmed
        };

        self.discard_through(index);
        outcome
    }

    /// Accepts a hit; the entity explodes when the hit is valid.
    pub fn receive_hit(&mut self, attacker: EntityId) -> bool {
        if !self.vitals.receive_hit(attacker) {
            return false;
        }
        self.explode();
        true
    }

    /// Puts the entity into its dead state: no collision, no pending input.
    pub fn explode(&mut self) {
        self.vitals.alive = false;
        self.inputs.clear();
        self.processing_index = 0;
        self.body.collision_enabled = false;
        self.velocity = Vector3::ZERO;
    }

    pub fn respawn(&mut self, invincibility: f32) {
        self.vitals.respawn(invincibility);
        self.body.collision_enabled = true;
    }

    /// Re-integrates the already integrated inputs after `index` from the
    /// current (just corrected) position.
    fn replay_after(&mut self, index: usize, ctx: &StepContext) {
        let frame = ctx.config.frame_interval();
        for replay in (index + 1)..self.processing_index {
            self.apply_input(replay, frame, ctx);
        }
    }

    /// Drops inputs `0..=index` and rebases the cursor.
    fn discard_through(&mut self, index: usize) {
        let count = (index + 1).min(self.inputs.len());
        self.inputs.drain(..count);
        self.processing_index = self.processing_index.saturating_sub(count);
    }

    fn apply_input(&mut self, index: usize, delta_time: f32, ctx: &StepContext) {
        let motion = self.inputs[index].motion();

        if self.body.collision_enabled {
            let (mut velocity, displacement) =
                integrate(self.velocity, motion, self.body.grounded, delta_time, ctx.config);
            let flags = self.body.move_by(displacement, ctx.arena);
            if flags.above {
                velocity.y = 0.0;
            }
            self.velocity = velocity;
        } else {
            self.velocity = Vector3::ZERO;
        }

        let result = self.body.position;
        let claim = self.claim_hit(ctx);

        let input = &mut self.inputs[index];
        input.result_position = result;
        if claim.is_some() {
            input.claimed_target = claim;
        }

        if let Some(latest) = &mut self.latest_input {
            if latest.time == input.time {
                latest.result_position = result;
            }
        }
    }

    /// Post-integration hook: while falling, the owning client (or the host,
    /// or the authority for its own bots) probes below for a stomp. Only a
    /// claim; the authority decides.
    fn claim_hit(&self, ctx: &StepContext) -> Option<EntityId> {
        if self.velocity.y >= 0.0 {
            return None;
        }

        let session = ctx.session;
        let may_claim = (session.is_owner(self.owner) && !session.is_authority())
            || session.is_host()
            || (session.is_authority() && self.owner == crate::SERVER_CLIENT_ID);
        if !may_claim {
            return None;
        }

        probe_below(
            self.id,
            self.body.position,
            ctx.config.attack_distance(self.velocity.y),
            ctx.targets,
            ctx.arena,
            ctx.config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScriptedInput;
    use crate::outbox::Outbound;
    use assert_approx_eq::assert_approx_eq;

    // A power-of-two input rate keeps `1.0 + n * FRAME` exact in f32.
    const FRAME: f32 = 1.0 / 32.0;

    struct Fixture {
        session: Session,
        arena: Arena,
        config: SimulationConfig,
    }

    impl Fixture {
        fn new(session: Session) -> Self {
            Self {
                session,
                arena: Arena::flat(),
                config: SimulationConfig {
                    network_game_speed: 32,
                    ..SimulationConfig::default()
                },
            }
        }

        fn ctx(&self, now: f32) -> StepContext<'_> {
            StepContext {
                session: &self.session,
                arena: &self.arena,
                config: &self.config,
                targets: &[],
                now,
            }
        }

        fn controller(&self, owner: ClientId) -> PredictedEntityController {
            let start = Vector3::new(0.0, self.config.body_size.y / 2.0, 0.0);
            PredictedEntityController::new(1, owner, "bunny", start, &self.config)
        }
    }

    /// Records and integrates `frames` inputs of running right on a client.
    fn run_client_frames(
        fixture: &Fixture,
        controller: &mut PredictedEntityController,
        outbox: &mut Outbox,
        frames: usize,
    ) {
        let mut source = ScriptedInput::constant(1.0, false);
        for frame in 0..frames {
            let now = 1.0 + frame as f32 * FRAME;
            let ctx = fixture.ctx(now);
            controller.record_local_input(&mut source, &ctx);
            controller.advance_buffered_inputs_to(now, &ctx, outbox);
        }
    }

    #[test]
    fn test_record_dedups_within_frame() {
        let fixture = Fixture::new(Session::client(2));
        let mut controller = fixture.controller(2);
        let mut source = ScriptedInput::constant(1.0, false);

        assert!(controller.record_local_input(&mut source, &fixture.ctx(1.0)));
        assert!(!controller.record_local_input(&mut source, &fixture.ctx(1.0 + FRAME * 0.5)));
        assert_eq!(controller.inputs().len(), 1);

        assert!(controller.record_local_input(&mut source, &fixture.ctx(1.0 + FRAME)));
        assert_eq!(controller.inputs().len(), 2);
    }

    #[test]
    fn test_record_needs_a_full_frame() {
        let mut fixture = Fixture::new(Session::client(2));
        fixture.config = SimulationConfig::default();
        let frame = fixture.config.frame_interval();
        let mut controller = fixture.controller(2);
        let mut source = ScriptedInput::constant(1.0, false);

        assert!(controller.record_local_input(&mut source, &fixture.ctx(1.0)));
        assert!(!controller.record_local_input(&mut source, &fixture.ctx(1.0 + frame - 0.00005)));
        assert_eq!(controller.inputs().len(), 1);
    }

    #[test]
    fn test_record_ignores_unowned_entity() {
        let fixture = Fixture::new(Session::client(2));
        let mut controller = fixture.controller(5);
        let mut source = ScriptedInput::constant(1.0, false);

        assert!(controller.record_local_input(&mut source, &fixture.ctx(1.0)));
        assert!(controller.inputs().is_empty());
    }

    #[test]
    fn test_sub_frame_record_nudges_toward_prediction() {
        let fixture = Fixture::new(Session::client(2));
        let mut controller = fixture.controller(2);
        let mut outbox = Outbox::new();
        let mut source = ScriptedInput::constant(1.0, false);

        let ctx = fixture.ctx(1.0);
        controller.record_local_input(&mut source, &ctx);
        controller.advance_buffered_inputs_to(1.0, &ctx, &mut outbox);
        let predicted = controller.position();

        // Something external shoved the body 3 units away.
        controller.teleport(predicted + Vector3::new(3.0, 0.0, 0.0));
        controller.record_local_input(&mut source, &fixture.ctx(1.0 + FRAME * 0.25));

        assert_approx_eq!(controller.position().x, predicted.x + 3.0 - 3.0 * FRAME, 0.0001);
    }

    #[test]
    fn test_client_sends_each_input_once() {
        let fixture = Fixture::new(Session::client(2));
        let mut controller = fixture.controller(2);
        let mut outbox = Outbox::new();

        run_client_frames(&fixture, &mut controller, &mut outbox, 3);
        assert_eq!(outbox.len(), 3);
        assert!(controller.inputs().iter().all(|i| i.sent_at.is_some()));

        // Advancing again to the same time is a no-op.
        let before = controller.position();
        let claims = controller.advance_buffered_inputs_to(1.0 + 2.0 * FRAME, &fixture.ctx(2.0), &mut outbox);
        assert!(claims.is_empty());
        assert_eq!(outbox.len(), 3);
        assert_eq!(controller.position(), before);
        assert_eq!(controller.processing_index(), 3);

        for message in outbox.drain() {
            match message {
                Outbound::ToAuthority(Packet::Input { entity_id, horizontal, .. }) => {
                    assert_eq!(entity_id, 1);
                    assert_eq!(horizontal, 1.0);
                }
                other => panic!("Unexpected message {:?}", other),
            }
        }
    }

    #[test]
    fn test_advance_stops_at_future_inputs() {
        let fixture = Fixture::new(Session::server());
        let mut controller = fixture.controller(7);
        let mut outbox = Outbox::new();

        controller.submit_input(InputSample::new(1.0, 1.0, false));
        controller.submit_input(InputSample::new(1.0 + FRAME, 1.0, false));
        controller.submit_input(InputSample::new(2.0, 1.0, false));
        assert_eq!(controller.pending_input_time(), 2.0);

        controller.advance_buffered_inputs_to(1.5, &fixture.ctx(1.5), &mut outbox);
        assert_eq!(outbox.len(), 2);
        // The settled first input is gone; the newest settled one and the
        // future one remain.
        assert_eq!(controller.inputs().len(), 2);
        assert_eq!(controller.processing_index(), 1);
        assert_eq!(controller.inputs()[1].time, 2.0);
        assert_approx_eq!(controller.position().x, 2.0 * 5.0 * FRAME, 0.0001);
    }

    #[test]
    fn test_authority_sends_correction_to_owner() {
        let fixture = Fixture::new(Session::server());
        let mut controller = fixture.controller(7);
        let mut outbox = Outbox::new();

        let mut sample = InputSample::new(1.0, 1.0, false);
        sample.claimed_target = Some(3);
        controller.submit_input(sample);

        let claims = controller.advance_buffered_inputs_to(1.0, &fixture.ctx(1.0), &mut outbox);

        assert_eq!(
            claims,
            vec![HitClaim {
                attacker: 1,
                target: 3,
                time: 1.0
            }]
        );
        match &outbox.messages()[0] {
            Outbound::ToClient {
                client_id,
                packet: Packet::Correction { time, position, velocity, .. },
            } => {
                assert_eq!(*client_id, 7);
                assert_eq!(*time, 1.0);
                assert_approx_eq!(position.x, 5.0 * FRAME, 0.0001);
                assert_approx_eq!(velocity.x, 5.0);
            }
            other => panic!("Unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_host_acknowledges_own_inputs_immediately() {
        let fixture = Fixture::new(Session::host(1));
        let mut controller = fixture.controller(1);
        let mut outbox = Outbox::new();
        let mut source = ScriptedInput::constant(-1.0, false);

        for frame in 0..4 {
            let now = 1.0 + frame as f32 * FRAME;
            let ctx = fixture.ctx(now);
            controller.record_local_input(&mut source, &ctx);
            controller.advance_buffered_inputs_to(now, &ctx, &mut outbox);
        }

        assert!(outbox.is_empty());
        assert!(controller.inputs().is_empty());
        assert_eq!(controller.processing_index(), 0);
        assert_approx_eq!(controller.position().x, -4.0 * 5.0 * FRAME, 0.0001);
    }

    #[test]
    fn test_reconcile_within_threshold_only_drains() {
        let fixture = Fixture::new(Session::client(2));
        let mut controller = fixture.controller(2);
        let mut outbox = Outbox::new();
        run_client_frames(&fixture, &mut controller, &mut outbox, 4);

        let before = controller.position();
        let acked = controller.inputs()[1].clone();
        let outcome = controller.on_authority_result(
            acked.time,
            acked.result_position + Vector3::new(0.2, 0.0, 0.0),
            Vector3::new(5.0, 0.0, 0.0),
            &fixture.ctx(2.0),
        );

        assert_eq!(outcome, ReconcileOutcome::Confirmed);
        assert_eq!(controller.position(), before);
        assert_eq!(controller.inputs().len(), 2);
        assert_eq!(controller.processing_index(), 2);
    }

    #[test]
    fn test_reconcile_beyond_threshold_replays_with_offset() {
        let fixture = Fixture::new(Session::client(2));
        let mut controller = fixture.controller(2);
        let mut outbox = Outbox::new();
        run_client_frames(&fixture, &mut controller, &mut outbox, 5);

        let trajectory: Vec<Vector3> = controller.inputs().iter().map(|i| i.result_position).collect();
        let acked = controller.inputs()[1].clone();
        let offset = Vector3::new(-2.0, 0.0, 0.0);

        let outcome = controller.on_authority_result(
            acked.time,
            acked.result_position + offset,
            Vector3::new(5.0, 0.0, 0.0),
            &fixture.ctx(2.0),
        );

        match outcome {
            ReconcileOutcome::Corrected { error } => assert_approx_eq!(error, 2.0, 0.0001),
            other => panic!("Expected correction, got {:?}", other),
        }

        // Inputs 2..5 survive and were re-integrated from the corrected base.
        assert_eq!(controller.inputs().len(), 3);
        assert_eq!(controller.processing_index(), 3);
        for (replayed, original) in controller.inputs().iter().zip(&trajectory[2..]) {
            assert_approx_eq!(replayed.result_position.x, original.x + offset.x, 0.0001);
            assert_approx_eq!(replayed.result_position.y, original.y, 0.0001);
        }
        assert_approx_eq!(controller.position().x, trajectory[4].x + offset.x, 0.0001);
    }

    #[test]
    fn test_reconcile_without_match_snaps_and_resets() {
        let fixture = Fixture::new(Session::client(2));
        let mut controller = fixture.controller(2);
        let mut outbox = Outbox::new();
        run_client_frames(&fixture, &mut controller, &mut outbox, 2);

        let target = Vector3::new(10.0, 2.0, 0.0);
        let outcome = controller.on_authority_result(50.0, target, Vector3::ZERO, &fixture.ctx(2.0));

        assert_eq!(outcome, ReconcileOutcome::Snapped);
        assert_eq!(controller.position(), target);
        assert_eq!(controller.processing_index(), 0);
        assert_eq!(controller.inputs().len(), 2);
    }

    #[test]
    fn test_reconcile_dead_entity_snaps() {
        let fixture = Fixture::new(Session::client(2));
        let mut controller = fixture.controller(2);
        controller.explode();

        let target = Vector3::new(-4.0, 2.0, 0.0);
        let outcome = controller.on_authority_result(3.0, target, Vector3::ZERO, &fixture.ctx(3.0));

        assert_eq!(outcome, ReconcileOutcome::Snapped);
        assert_eq!(controller.position(), target);
    }

    #[test]
    fn test_dead_entity_records_nothing_and_does_not_move() {
        let fixture = Fixture::new(Session::server());
        let mut controller = fixture.controller(7);
        let mut outbox = Outbox::new();
        controller.explode();

        let mut source = ScriptedInput::constant(1.0, true);
        assert!(!controller.record_local_input(&mut source, &fixture.ctx(1.0)));

        controller.submit_input(InputSample::new(1.0, 1.0, true));
        let start = controller.position();
        controller.advance_buffered_inputs_to(1.0, &fixture.ctx(1.0), &mut outbox);

        assert_eq!(controller.position(), start);
        assert_eq!(controller.velocity(), Vector3::ZERO);
    }

    #[test]
    fn test_falling_client_claims_target_below() {
        let fixture = Fixture::new(Session::client(2));
        let mut controller = PredictedEntityController::new(
            1,
            2,
            "attacker",
            Vector3::new(0.0, 7.0, 0.0),
            &fixture.config,
        );
        let mut outbox = Outbox::new();
        let targets = [ProbeTarget {
            id: 4,
            bounds: crate::physics::Aabb::from_center(Vector3::new(1.0, 2.0, 0.0), fixture.config.body_size),
            alive: true,
            solid: true,
        }];
        let ctx = StepContext {
            targets: &targets,
            ..fixture.ctx(1.0)
        };

        let mut source = ScriptedInput::constant(0.0, false);
        controller.record_local_input(&mut source, &ctx);
        controller.advance_buffered_inputs_to(1.0, &ctx, &mut outbox);

        assert_eq!(controller.inputs()[0].claimed_target, Some(4));
        match &outbox.messages()[0] {
            Outbound::ToAuthority(Packet::Input { claimed_target, .. }) => {
                assert_eq!(*claimed_target, Some(4))
            }
            other => panic!("Unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_receive_hit_explodes_once() {
        let fixture = Fixture::new(Session::server());
        let mut controller = fixture.controller(7);
        controller.submit_input(InputSample::new(1.0, 1.0, false));

        // Spawn invincibility protects at first.
        assert!(!controller.receive_hit(3));
        controller.vitals_mut().tick(fixture.config.spawn_invincibility);

        assert!(controller.receive_hit(3));
        assert!(!controller.is_alive());
        assert!(controller.inputs().is_empty());
        assert!(!controller.body().collision_enabled);
        assert!(!controller.receive_hit(4));

        controller.respawn(fixture.config.respawn_invincibility);
        assert!(controller.is_alive());
        assert!(controller.body().collision_enabled);
        assert!(controller.vitals().is_invincible());
    }
}
