//! Simulation core shared by the authoritative server and every client
//!
//! Everything here is transport agnostic: simulation calls push packets into
//! an [`outbox::Outbox`] and the networking layer of each binary routes them.

pub mod combat;
pub mod config;
pub mod controller;
pub mod input;
pub mod interpolation;
pub mod math;
pub mod outbox;
pub mod physics;
pub mod session;

use math::Vector3;
use serde::{Deserialize, Serialize};

pub type EntityId = u32;
pub type ClientId = u32;

/// Client id under which the authority itself owns entities (bots)
pub const SERVER_CLIENT_ID: ClientId = 0;

/// Bumped whenever the wire format changes
pub const PROTOCOL_VERSION: u32 = 2;

pub const MAX_NAME_LENGTH: usize = 16;

/// Largest datagram either side expects to receive
pub const MAX_PACKET_SIZE: usize = 2048;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// No players connected yet
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Connect {
        client_version: u32,
        name: String,
    },
    Input {
        entity_id: EntityId,
        time: f32,
        horizontal: f32,
        jump: bool,
        claimed_target: Option<EntityId>,
    },
    Ping {
        client_time: f32,
    },
    Disconnect,

    Connected {
        client_id: ClientId,
        entity_id: EntityId,
        server_time: f32,
    },
    Spawned {
        entity_id: EntityId,
        owner: ClientId,
        name: String,
        position: Vector3,
        alive: bool,
        score: u32,
    },
    Despawned {
        entity_id: EntityId,
    },
    Correction {
        entity_id: EntityId,
        time: f32,
        position: Vector3,
        velocity: Vector3,
    },
    Position {
        entity_id: EntityId,
        position: Vector3,
        time: f32,
    },
    Hit {
        target: EntityId,
        attacker: EntityId,
        time: f32,
    },
    Respawned {
        entity_id: EntityId,
        position: Vector3,
    },
    Score {
        entity_id: EntityId,
        score: u32,
    },
    MatchState {
        phase: MatchPhase,
        remaining: f32,
    },
    Pong {
        client_time: f32,
        server_time: f32,
    },
    Disconnected {
        reason: String,
    },
}

/// Trims a player-chosen name to something printable and bounded.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_LENGTH)
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "Bunny".to_string()
    } else {
        cleaned.to_string()
    }
}
