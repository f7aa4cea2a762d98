//! Connected clients, their addresses and the entity each one controls
//!
//! The client manager is the server's roster: it hands out client ids,
//! enforces the capacity limit, maps datagram source addresses back to
//! clients, and reports clients that went silent so their entities can be
//! despawned.

use log::info;
use shared::{ClientId, EntityId, SERVER_CLIENT_ID};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Clients silent for longer than this are dropped
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected client
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: ClientId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    pub name: String,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Entity spawned for this client, once there is one
    pub entity_id: Option<EntityId>,
}

impl Client {
    pub fn new(id: ClientId, addr: SocketAddr, name: String) -> Self {
        Self {
            id,
            addr,
            name,
            last_seen: Instant::now(),
            entity_id: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if nothing was received within `timeout`.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients
pub struct ClientManager {
    clients: HashMap<ClientId, Client>,
    next_client_id: ClientId,
    max_clients: usize,
}

impl ClientManager {
    /// Client ids start above [`SERVER_CLIENT_ID`], which the server keeps
    /// for its own entities.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: SERVER_CLIENT_ID + 1,
            max_clients,
        }
    }

    /// Returns Some(client_id) if successful, None if the server is full.
    pub fn add_client(&mut self, addr: SocketAddr, name: String) -> Option<ClientId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} '{}' connected from {}", client_id, name, addr);
        self.clients.insert(client_id, Client::new(client_id, addr, name));

        Some(client_id)
    }

    /// Removes a client, returning it if it was connected.
    pub fn remove_client(&mut self, client_id: &ClientId) -> Option<Client> {
        let client = self.clients.remove(client_id)?;
        info!("Client {} disconnected", client.id);
        Some(client)
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<ClientId> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn get(&self, client_id: ClientId) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    /// Records that `client_id` is alive. Returns false for unknown clients.
    pub fn touch(&mut self, client_id: ClientId) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => {
                client.touch();
                true
            }
            None => false,
        }
    }

    pub fn set_entity(&mut self, client_id: ClientId, entity_id: EntityId) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.entity_id = Some(entity_id);
        }
    }

    /// Removes clients silent for longer than [`CLIENT_TIMEOUT`] and returns them.
    pub fn check_timeouts(&mut self) -> Vec<Client> {
        self.remove_timed_out(CLIENT_TIMEOUT)
    }

    pub fn remove_timed_out(&mut self, timeout: Duration) -> Vec<Client> {
        let timed_out: Vec<ClientId> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        timed_out
            .iter()
            .filter_map(|client_id| self.remove_client(client_id))
            .collect()
    }

    /// Gets all client IDs and their network addresses
    pub fn get_client_addrs(&self) -> Vec<(ClientId, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn addr_of(&self, client_id: ClientId) -> Option<SocketAddr> {
        self.clients.get(&client_id).map(|client| client.addr)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
