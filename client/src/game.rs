//! Client-side view of the world: one predicted entity plus interpolated remotes

use log::{debug, info, warn};
use shared::combat::ProbeTarget;
use shared::config::SimulationConfig;
use shared::controller::{PredictedEntityController, ReconcileOutcome, StepContext};
use shared::input::InputSource;
use shared::interpolation::RemoteInterpolator;
use shared::math::Vector3;
use shared::outbox::{Outbound, Outbox};
use shared::physics::{Aabb, Arena};
use shared::session::Session;
use shared::{ClientId, EntityId, MatchPhase, Packet};
use std::collections::BTreeMap;

/// An entity controlled by someone else, shown from buffered positions
pub struct RemoteEntity {
    pub owner: ClientId,
    pub name: String,
    pub alive: bool,
    pub score: u32,
    pub position: Vector3,
    interpolator: RemoteInterpolator,
}

impl RemoteEntity {
    fn new(owner: ClientId, name: String, position: Vector3, alive: bool, score: u32, config: &SimulationConfig) -> Self {
        Self {
            owner,
            name,
            alive,
            score,
            position,
            interpolator: RemoteInterpolator::new(config.frame_interval(), config.velocity_sample_interval),
        }
    }

    pub fn velocity(&self) -> Vector3 {
        self.interpolator.velocity()
    }
}

/// What the renderer needs to draw one entity
#[derive(Debug, Clone, PartialEq)]
pub struct RenderEntity {
    pub id: EntityId,
    pub name: String,
    pub position: Vector3,
    pub alive: bool,
    pub score: u32,
    pub velocity: Vector3,
    pub is_local: bool,
    pub invincible: bool,
}

pub struct ClientWorld {
    config: SimulationConfig,
    arena: Arena,
    session: Option<Session>,
    /// Entity the server assigned us, known before its spawn packet arrives
    entity_id: Option<EntityId>,
    local: Option<PredictedEntityController>,
    remotes: BTreeMap<EntityId, RemoteEntity>,
    outbox: Outbox,
    phase: MatchPhase,
    remaining: f32,
    last_update: Option<f32>,
    corrections: u32,
    disconnect_reason: Option<String>,
}

impl ClientWorld {
    pub fn new(config: SimulationConfig, arena: Arena) -> Self {
        Self {
            config,
            arena,
            session: None,
            entity_id: None,
            local: None,
            remotes: BTreeMap::new(),
            outbox: Outbox::new(),
            phase: MatchPhase::Waiting,
            remaining: 0.0,
            last_update: None,
            corrections: 0,
            disconnect_reason: None,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.session.and_then(|s| s.local_client)
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn local(&self) -> Option<&PredictedEntityController> {
        self.local.as_ref()
    }

    pub fn remote(&self, entity_id: EntityId) -> Option<&RemoteEntity> {
        self.remotes.get(&entity_id)
    }

    pub fn remote_count(&self) -> usize {
        self.remotes.len()
    }

    pub fn match_state(&self) -> (MatchPhase, f32) {
        (self.phase, self.remaining)
    }

    /// Number of predictions the server had to correct so far
    pub fn corrections(&self) -> u32 {
        self.corrections
    }

    pub fn disconnect_reason(&self) -> Option<&str> {
        self.disconnect_reason.as_deref()
    }

    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        self.outbox.drain()
    }

    /// Applies one packet from the server. `now` is the network time.
    pub fn handle_packet(&mut self, packet: Packet, now: f32) {
        match packet {
            Packet::Connected {
                client_id,
                entity_id,
                ..
            } => {
                info!("Connected as client {} controlling entity {}", client_id, entity_id);
                self.session = Some(Session::client(client_id));
                self.entity_id = Some(entity_id);
                self.disconnect_reason = None;

                // Our spawn may have overtaken the handshake.
                if let Some(remote) = self.remotes.remove(&entity_id) {
                    self.adopt_local(entity_id, remote.owner, remote.name, remote.position, remote.alive, remote.score);
                }
            }

            Packet::Spawned {
                entity_id,
                owner,
                name,
                position,
                alive,
                score,
            } => {
                if Some(entity_id) == self.entity_id {
                    self.adopt_local(entity_id, owner, name, position, alive, score);
                } else {
                    debug!("Entity {} '{}' spawned at {:?}", entity_id, name, position);
                    // Drawn in place until the first broadcasts arrive; those
                    // carry server step times that may precede our clock.
                    let remote = RemoteEntity::new(owner, name, position, alive, score, &self.config);
                    self.remotes.insert(entity_id, remote);
                }
            }

            Packet::Despawned { entity_id } => {
                if Some(entity_id) == self.entity_id {
                    self.local = None;
                }
                self.remotes.remove(&entity_id);
            }

            Packet::Correction {
                entity_id,
                time,
                position,
                velocity,
            } => {
                let targets = self.remote_targets();
                let Some(session) = self.session else {
                    return;
                };
                let Some(local) = self.local.as_mut().filter(|l| l.id() == entity_id) else {
                    return;
                };
                let ctx = StepContext {
                    session: &session,
                    arena: &self.arena,
                    config: &self.config,
                    targets: &targets,
                    now,
                };
                if let ReconcileOutcome::Corrected { .. } =
                    local.on_authority_result(time, position, velocity, &ctx)
                {
                    self.corrections += 1;
                }
            }

            Packet::Position {
                entity_id,
                position,
                time,
            } => {
                if let Some(remote) = self.remotes.get_mut(&entity_id) {
                    remote.interpolator.push(position, time);
                }
            }

            Packet::Hit {
                target, attacker, ..
            } => {
                info!("Entity {} stomped entity {}", attacker, target);
                match self.local.as_mut().filter(|l| l.id() == target) {
                    Some(local) => local.explode(),
                    None => {
                        if let Some(remote) = self.remotes.get_mut(&target) {
                            remote.alive = false;
                        }
                    }
                }
            }

            Packet::Respawned {
                entity_id,
                position,
            } => match self.local.as_mut().filter(|l| l.id() == entity_id) {
                Some(local) => {
                    local.teleport(position);
                    local.respawn(self.config.respawn_invincibility);
                }
                None => {
                    if let Some(remote) = self.remotes.get_mut(&entity_id) {
                        remote.alive = true;
                        remote.position = position;
                        remote.interpolator.reset();
                    }
                }
            },

            Packet::Score { entity_id, score } => {
                match self.local.as_mut().filter(|l| l.id() == entity_id) {
                    Some(local) => local.vitals_mut().score = score,
                    None => {
                        if let Some(remote) = self.remotes.get_mut(&entity_id) {
                            remote.score = score;
                        }
                    }
                }
            }

            Packet::MatchState { phase, remaining } => {
                if phase != self.phase {
                    info!("Match phase: {:?}", phase);
                }
                self.phase = phase;
                self.remaining = remaining;
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.session = None;
                self.entity_id = None;
                self.local = None;
                self.remotes.clear();
                self.disconnect_reason = Some(reason);
            }

            Packet::Pong { .. } => {}

            other => {
                warn!("Unexpected packet from server: {:?}", other);
            }
        }
    }

    /// Runs one rendered frame at network time `now`: samples input, predicts
    /// the local entity and forwards its inputs, and moves remotes along
    /// their buffered paths.
    pub fn update(&mut self, source: &mut dyn InputSource, now: f32) {
        let delta_time = self.last_update.map_or(0.0, |last| (now - last).max(0.0));
        self.last_update = Some(now);

        let targets = self.remote_targets();
        if let (Some(session), Some(local)) = (self.session, self.local.as_mut()) {
            local.vitals_mut().tick(delta_time);

            let ctx = StepContext {
                session: &session,
                arena: &self.arena,
                config: &self.config,
                targets: &targets,
                now,
            };
            local.record_local_input(source, &ctx);
            local.advance_buffered_inputs_to(now, &ctx, &mut self.outbox);
        }

        for remote in self.remotes.values_mut() {
            let sampled = remote.interpolator.sample(now);
            if let Some(position) = sampled.or_else(|| remote.interpolator.latest()) {
                remote.position = position;
            }
        }
    }

    /// Everything to draw this frame, local entity first.
    pub fn render_entities(&self) -> Vec<RenderEntity> {
        let local = self.local.iter().map(|local| RenderEntity {
            id: local.id(),
            name: local.name().to_string(),
            position: local.position(),
            alive: local.is_alive(),
            score: local.vitals().score,
            velocity: local.velocity(),
            is_local: true,
            invincible: local.vitals().is_invincible(),
        });

        let remotes = self.remotes.iter().map(|(id, remote)| RenderEntity {
            id: *id,
            name: remote.name.clone(),
            position: remote.position,
            alive: remote.alive,
            score: remote.score,
            velocity: remote.velocity(),
            is_local: false,
            invincible: false,
        });

        local.chain(remotes).collect()
    }

    /// Names and scores, best first.
    pub fn leaderboard(&self) -> Vec<(String, u32)> {
        let mut board: Vec<(String, u32)> = self
            .render_entities()
            .into_iter()
            .map(|e| (e.name, e.score))
            .collect();
        board.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        board
    }

    fn adopt_local(&mut self, entity_id: EntityId, owner: ClientId, name: String, position: Vector3, alive: bool, score: u32) {
        info!("Controlling entity {} '{}' at {:?}", entity_id, name, position);
        let mut local = PredictedEntityController::new(entity_id, owner, name, position, &self.config);
        local.vitals_mut().score = score;
        if !alive {
            local.explode();
        }
        self.local = Some(local);
    }

    /// Remote entities as the stomp probe sees them.
    fn remote_targets(&self) -> Vec<ProbeTarget> {
        self.remotes
            .iter()
            .map(|(id, remote)| ProbeTarget {
                id: *id,
                bounds: Aabb::from_center(remote.position, self.config.body_size),
                alive: remote.alive,
                solid: remote.alive,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::input::ScriptedInput;

    fn connected_world() -> ClientWorld {
        let mut world = ClientWorld::new(SimulationConfig::default(), Arena::flat());
        world.handle_packet(
            Packet::Connected {
                client_id: 3,
                entity_id: 7,
                server_time: 0.0,
            },
            0.0,
        );
        world.handle_packet(
            Packet::Spawned {
                entity_id: 7,
                owner: 3,
                name: "me".to_string(),
                position: Vector3::new(0.0, 2.0, 0.0),
                alive: true,
                score: 0,
            },
            0.0,
        );
        world
    }

    fn spawn_remote(world: &mut ClientWorld, entity_id: EntityId, position: Vector3) {
        world.handle_packet(
            Packet::Spawned {
                entity_id,
                owner: 9,
                name: "them".to_string(),
                position,
                alive: true,
                score: 0,
            },
            0.0,
        );
    }

    #[test]
    fn test_spawn_of_own_entity_creates_local_controller() {
        let world = connected_world();

        assert!(world.is_connected());
        assert_eq!(world.client_id(), Some(3));
        assert_eq!(world.local().map(|l| l.id()), Some(7));
        assert_eq!(world.remote_count(), 0);
    }

    #[test]
    fn test_spawn_before_handshake_is_adopted() {
        let mut world = ClientWorld::new(SimulationConfig::default(), Arena::flat());
        spawn_remote(&mut world, 7, Vector3::new(5.0, 2.0, 0.0));
        assert_eq!(world.remote_count(), 1);

        world.handle_packet(
            Packet::Connected {
                client_id: 3,
                entity_id: 7,
                server_time: 0.0,
            },
            0.0,
        );

        assert_eq!(world.remote_count(), 0);
        assert_eq!(world.local().unwrap().position(), Vector3::new(5.0, 2.0, 0.0));
    }

    #[test]
    fn test_update_forwards_each_input_once() {
        let mut world = connected_world();
        let mut input = ScriptedInput::constant(1.0, false);

        world.update(&mut input, 1.0);
        let sent = world.drain_outbox();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            Outbound::ToAuthority(Packet::Input {
                entity_id,
                time,
                horizontal,
                ..
            }) => {
                assert_eq!(*entity_id, 7);
                assert_approx_eq!(*time, 1.0);
                assert_approx_eq!(*horizontal, 1.0);
            }
            other => panic!("Unexpected message {:?}", other),
        }

        // Same input frame: nothing new to send.
        world.update(&mut input, 1.01);
        assert!(world.drain_outbox().is_empty());
        assert!(world.local().unwrap().position().x > 0.0);
    }

    #[test]
    fn test_remote_positions_are_interpolated() {
        let mut world = connected_world();
        spawn_remote(&mut world, 8, Vector3::new(0.0, 0.0, 0.0));
        let frame = world.config().frame_interval();

        world.handle_packet(
            Packet::Position {
                entity_id: 8,
                position: Vector3::ZERO,
                time: 0.0,
            },
            0.0,
        );
        world.handle_packet(
            Packet::Position {
                entity_id: 8,
                position: Vector3::new(10.0, 0.0, 0.0),
                time: frame,
            },
            frame,
        );
        world.update(&mut ScriptedInput::default(), frame * 0.5);

        assert_approx_eq!(world.remote(8).unwrap().position.x, 5.0, 1e-3);
    }

    /// Pushes broadcasts stamped `times` for entity 8, all arriving at `now`.
    fn broadcast_path(world: &mut ClientWorld, times: &[f32], now: f32) {
        for (i, time) in times.iter().enumerate() {
            world.handle_packet(
                Packet::Position {
                    entity_id: 8,
                    position: Vector3::new(i as f32, 2.0, 0.0),
                    time: *time,
                },
                now,
            );
        }
    }

    #[test]
    fn test_broadcasts_older_than_spawn_arrival_are_kept() {
        let mut world = connected_world();
        world.handle_packet(
            Packet::Spawned {
                entity_id: 8,
                owner: 9,
                name: "them".to_string(),
                position: Vector3::new(0.0, 2.0, 0.0),
                alive: true,
                score: 0,
            },
            5.0,
        );
        assert_eq!(world.remote(8).unwrap().position, Vector3::new(0.0, 2.0, 0.0));

        broadcast_path(&mut world, &[4.96, 4.97, 4.98, 4.99], 5.0);
        assert_eq!(world.remote(8).unwrap().interpolator.len(), 4);

        world.update(&mut ScriptedInput::default(), 5.0);
        assert!(world.remote(8).unwrap().position.x > 0.0);
    }

    #[test]
    fn test_broadcasts_older_than_respawn_arrival_are_kept() {
        let mut world = connected_world();
        spawn_remote(&mut world, 8, Vector3::ZERO);
        broadcast_path(&mut world, &[1.0, 1.1], 1.1);

        world.handle_packet(
            Packet::Respawned {
                entity_id: 8,
                position: Vector3::new(-30.0, 2.0, 0.0),
            },
            5.0,
        );
        let remote = world.remote(8).unwrap();
        assert!(remote.alive);
        assert_eq!(remote.position, Vector3::new(-30.0, 2.0, 0.0));
        assert!(remote.interpolator.is_empty());

        broadcast_path(&mut world, &[4.96, 4.97, 4.98, 4.99], 5.0);
        assert_eq!(world.remote(8).unwrap().interpolator.len(), 4);
    }

    #[test]
    fn test_position_of_own_entity_is_ignored() {
        let mut world = connected_world();
        world.handle_packet(
            Packet::Position {
                entity_id: 7,
                position: Vector3::new(40.0, 2.0, 0.0),
                time: 0.1,
            },
            0.1,
        );

        assert_eq!(world.local().unwrap().position(), Vector3::new(0.0, 2.0, 0.0));
        assert_eq!(world.remote_count(), 0);
    }

    #[test]
    fn test_correction_without_matching_input_snaps() {
        let mut world = connected_world();
        world.handle_packet(
            Packet::Correction {
                entity_id: 7,
                time: 0.5,
                position: Vector3::new(3.0, 2.0, 0.0),
                velocity: Vector3::ZERO,
            },
            0.5,
        );

        assert_eq!(world.local().unwrap().position(), Vector3::new(3.0, 2.0, 0.0));
    }

    #[test]
    fn test_hit_and_respawn_of_local_entity() {
        let mut world = connected_world();
        world.handle_packet(
            Packet::Hit {
                target: 7,
                attacker: 8,
                time: 1.0,
            },
            1.0,
        );
        assert!(!world.local().unwrap().is_alive());

        world.handle_packet(
            Packet::Respawned {
                entity_id: 7,
                position: Vector3::new(-50.0, 2.0, 0.0),
            },
            4.0,
        );
        let local = world.local().unwrap();
        assert!(local.is_alive());
        assert!(local.vitals().is_invincible());
        assert_eq!(local.position(), Vector3::new(-50.0, 2.0, 0.0));
    }

    #[test]
    fn test_scores_and_leaderboard() {
        let mut world = connected_world();
        spawn_remote(&mut world, 8, Vector3::new(10.0, 2.0, 0.0));

        world.handle_packet(Packet::Score { entity_id: 8, score: 4 }, 1.0);
        world.handle_packet(Packet::Score { entity_id: 7, score: 2 }, 1.0);

        assert_eq!(
            world.leaderboard(),
            vec![("them".to_string(), 4), ("me".to_string(), 2)]
        );
    }

    #[test]
    fn test_disconnect_clears_world() {
        let mut world = connected_world();
        spawn_remote(&mut world, 8, Vector3::new(10.0, 2.0, 0.0));

        world.handle_packet(
            Packet::Disconnected {
                reason: "Server full".to_string(),
            },
            1.0,
        );

        assert!(!world.is_connected());
        assert!(world.local().is_none());
        assert_eq!(world.remote_count(), 0);
        assert_eq!(world.disconnect_reason(), Some("Server full"));
    }
}
