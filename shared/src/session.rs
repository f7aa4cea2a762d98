//! The local process's role in the session

use crate::ClientId;

/// Which side of the connection this process plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Dedicated authority with no local player
    Server,
    /// Authority that also controls a local player
    Host,
    /// Pure client; never authoritative
    Client,
}

/// Session facts the simulation needs to decide who does what
///
/// Passed by reference into every simulation call instead of living in a
/// global, so several worlds can coexist in one process (tests do this).
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub role: Role,
    /// Client id of the local player, if there is one
    pub local_client: Option<ClientId>,
}

impl Session {
    pub fn server() -> Self {
        Self {
            role: Role::Server,
            local_client: Some(crate::SERVER_CLIENT_ID),
        }
    }

    pub fn host(local_client: ClientId) -> Self {
        Self {
            role: Role::Host,
            local_client: Some(local_client),
        }
    }

    pub fn client(local_client: ClientId) -> Self {
        Self {
            role: Role::Client,
            local_client: Some(local_client),
        }
    }

    pub fn is_authority(&self) -> bool {
        matches!(self.role, Role::Server | Role::Host)
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    /// True when this process owns entities belonging to `owner`.
    ///
    /// Entities owned by [`crate::SERVER_CLIENT_ID`] belong to whichever
    /// process is the authority.
    pub fn is_owner(&self, owner: ClientId) -> bool {
        self.local_client == Some(owner)
            || (self.is_authority() && owner == crate::SERVER_CLIENT_ID)
    }
}
