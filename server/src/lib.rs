//! # Stomp Server Library
//!
//! The authoritative side of the stomp game. The server owns the canonical
//! world, replays every client's inputs in a fixed-step loop, and is the only
//! process allowed to decide that one entity stomped another.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! [`world::WorldSimulation`] advances all entities in fixed steps, catching
//! up when the network clock ran ahead of the last simulated step. Every
//! step ends with a snapshot of all positions and a position broadcast.
//!
//! ### Lag Compensation
//! Clients claim hits at the time they saw them. The claim is queued as a
//! scheduled action and, when due, [`hit_resolver::resolve_claim`] rewinds
//! the world to the snapshot at or before the claimed time, checks the
//! geometry there and restores live positions afterwards.
//!
//! ### Client Management
//! [`client_manager::ClientManager`] hands out client ids, maps datagram
//! addresses to clients and reports clients that went silent.
//!
//! ## Module Organization
//!
//! - `bot`: wandering server-owned players
//! - `client_manager`: connection roster and timeouts
//! - `history`: bounded snapshot ring used for rollback
//! - `hit_resolver`: validation of stomp claims
//! - `match_clock`: timed rounds and intermission
//! - `network`: UDP tasks and the main loop
//! - `schedule`: actions due at a simulated time
//! - `world`: the fixed-step simulation itself
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("127.0.0.1:8080", Duration::from_millis(16), 16)
//!         .await?
//!         .with_bots(2);
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! The server runs internal async tasks next to the main loop:
//! - **Network Receiver**: decodes incoming datagrams
//! - **Network Sender**: delivers routed and broadcast packets
//! - **Timeout Checker**: drops silent clients once per second

pub mod bot;
pub mod client_manager;
pub mod history;
pub mod hit_resolver;
pub mod match_clock;
pub mod network;
pub mod schedule;
pub mod world;
