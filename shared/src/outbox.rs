//! Outbound message queue filled by the simulation and drained by transport

use crate::{ClientId, Packet};

/// Where a queued packet should go
#[derive(Debug, Clone)]
pub enum Outbound {
    /// From a client to the authority
    ToAuthority(Packet),
    /// From the authority to one client only
    ToClient { client_id: ClientId, packet: Packet },
    /// From the authority to every client
    Broadcast(Packet),
}

/// Packets produced during a simulation call, in production order
///
/// The simulation never touches sockets; whoever owns the transport drains
/// this after each call and routes the messages.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<Outbound>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_authority(&mut self, packet: Packet) {
        self.messages.push(Outbound::ToAuthority(packet));
    }

    pub fn to_client(&mut self, client_id: ClientId, packet: Packet) {
        self.messages.push(Outbound::ToClient { client_id, packet });
    }

    pub fn broadcast(&mut self, packet: Packet) {
        self.messages.push(Outbound::Broadcast(packet));
    }

    pub fn drain(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.messages)
    }

    pub fn messages(&self) -> &[Outbound] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_preserves_order_and_drains() {
        let mut outbox = Outbox::new();
        outbox.broadcast(Packet::Disconnect);
        outbox.to_client(4, Packet::Connected {
            client_id: 4,
            entity_id: 9,
            server_time: 1.0,
        });

        assert_eq!(outbox.len(), 2);
        let messages = outbox.drain();
        assert!(outbox.is_empty());

        match &messages[1] {
            Outbound::ToClient { client_id, .. } => assert_eq!(*client_id, 4),
            _ => panic!("Unexpected message order"),
        }
    }
}
