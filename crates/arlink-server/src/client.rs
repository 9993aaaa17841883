use std::time::Instant;

use dashmap::DashMap;
use uuid::Uuid;

/// Unique connection identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientId(pub String);

impl Default for ClientId {
    fn default() -> Self {
        Self(format!("conn_{}", Uuid::now_v7()))
    }
}

impl ClientId {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry of currently-open WebSocket connections.
///
/// Membership tracking only: connections are added on accept and removed on
/// close. Nothing is ever pushed back through a registered connection.
pub struct ClientRegistry {
    clients: DashMap<ClientId, Instant>,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    /// Register a new connection and return its ID.
    pub fn register(&self) -> ClientId {
        let id = ClientId::new();
        self.clients.insert(id.clone(), Instant::now());
        tracing::info!(client_id = %id, total = self.count(), "Client connected");
        id
    }

    /// Remove a connection by ID, if present.
    pub fn unregister(&self, id: &ClientId) {
        if self.clients.remove(id).is_some() {
            tracing::info!(client_id = %id, total = self.count(), "Client disconnected");
        }
    }

    /// Number of open connections.
    pub fn count(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_unique() {
        let a = ClientId::new();
        let b = ClientId::new();
        assert_ne!(a, b);
        assert!(a.0.starts_with("conn_"));
    }

    #[test]
    fn registry_register_and_unregister() {
        let registry = ClientRegistry::new();
        assert_eq!(registry.count(), 0);

        let id1 = registry.register();
        let id2 = registry.register();
        assert_eq!(registry.count(), 2);

        registry.unregister(&id1);
        assert_eq!(registry.count(), 1);

        registry.unregister(&id2);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn unregister_unknown_id_is_a_no_op() {
        let registry = ClientRegistry::new();
        let _live = registry.register();

        registry.unregister(&ClientId::new());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn size_tracks_connects_minus_disconnects() {
        let registry = ClientRegistry::new();
        let ids: Vec<_> = (0..5).map(|_| registry.register()).collect();
        for id in ids.iter().take(3) {
            registry.unregister(id);
        }
        assert_eq!(registry.count(), 2);
    }
}
