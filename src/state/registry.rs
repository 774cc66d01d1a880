use crate::error::RegistryError;
use crate::models::types::{ConnId, Username};
use crate::net::connection::ConnHandle;
use crate::net::sink::CLOSE_GOING_AWAY;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;

const DRAIN_POLL: Duration = Duration::from_millis(20);

/// Live connections, keyed by username. At most one entry per username.
///
/// Lookups share the read lock so routing traffic never serializes on it; register and
/// unregister take the write lock. No lock is held across an await point.
#[derive(Default)]
pub struct Registry {
    online: RwLock<HashMap<Username, ConnHandle>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `handle` for `username` unless an entry already exists. The existing entry is
    /// never replaced.
    pub fn register(&self, username: Username, handle: ConnHandle) -> Result<(), RegistryError> {
        let mut g = self.online.write();
        match g.entry(username) {
            Entry::Occupied(e) => Err(RegistryError::AlreadyPresent(e.key().clone())),
            Entry::Vacant(e) => {
                e.insert(handle);
                Ok(())
            }
        }
    }

    /// Removes the entry for `username`, but only while it still belongs to connection `id`.
    /// Returns whether anything was removed.
    pub fn unregister(&self, username: &str, id: ConnId) -> bool {
        let mut g = self.online.write();
        let owned = g.get(username).is_some_and(|handle| handle.id() == id);
        if owned {
            g.remove(username);
        }
        owned
    }

    pub fn lookup(&self, username: &str) -> Option<ConnHandle> {
        self.online.read().get(username).cloned()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.online.read().contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.online.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.online.read().is_empty()
    }

    pub fn who(&self) -> Vec<String> {
        let mut names: Vec<String> = self.online.read().keys().map(|u| u.to_string()).collect();
        names.sort();
        names
    }

    /// Sends a close frame to every registered connection. Each session then sees its peer go
    /// away and tears itself down as usual.
    pub async fn close_all(&self) {
        let handles: Vec<(Username, ConnHandle)> = self
            .online
            .read()
            .iter()
            .map(|(u, h)| (u.clone(), h.clone()))
            .collect();

        tracing::info!(count = handles.len(), "closing live connections");
        for (username, handle) in handles {
            if let Err(e) = handle.close(CLOSE_GOING_AWAY, "server shutting down").await {
                tracing::debug!(%username, error = %e, "close on shutdown failed");
            }
        }
    }

    /// Closes every registered connection and waits up to `within` for their sessions to
    /// unregister. Returns whether the registry emptied in time.
    pub async fn drain(&self, within: Duration) -> bool {
        self.close_all().await;

        let emptied = async {
            while !self.is_empty() {
                tokio::time::sleep(DRAIN_POLL).await;
            }
        };
        tokio::time::timeout(within, emptied).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::sink::memory::{self, Sent};
    use std::sync::Arc;

    fn handle() -> (ConnHandle, memory::Peer) {
        let (transport, peer) = memory::pair();
        let (sink, _source) = memory::halves(transport);
        (ConnHandle::new(Box::new(sink)), peer)
    }

    fn name(s: &str) -> Username {
        Username::parse(s).unwrap()
    }

    #[test]
    fn second_registration_is_rejected_not_overwritten() {
        let registry = Registry::new();
        let (first, _p1) = handle();
        let (second, _p2) = handle();

        registry.register(name("alice"), first.clone()).unwrap();
        let err = registry.register(name("alice"), second).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyPresent(u) if u.as_str() == "alice"));
        assert_eq!(registry.lookup("alice").map(|h| h.id()), Some(first.id()));
    }

    #[test]
    fn stale_unregister_leaves_newer_entry_alone() {
        let registry = Registry::new();
        let (old, _p1) = handle();
        let (new, _p2) = handle();

        registry.register(name("alice"), old.clone()).unwrap();
        assert!(registry.unregister("alice", old.id()));
        registry.register(name("alice"), new.clone()).unwrap();

        assert!(!registry.unregister("alice", old.id()));
        assert_eq!(registry.lookup("alice").map(|h| h.id()), Some(new.id()));

        assert!(registry.unregister("alice", new.id()));
        assert!(!registry.unregister("alice", new.id()));
        assert!(registry.lookup("alice").is_none());
    }

    #[test]
    fn lookups_are_case_sensitive() {
        let registry = Registry::new();
        let (h, _p) = handle();
        registry.register(name("Alice"), h).unwrap();

        assert!(registry.contains("Alice"));
        assert!(!registry.contains("alice"));
        assert_eq!(registry.who(), vec!["Alice".to_string()]);
    }

    #[test]
    fn concurrent_registrations_admit_exactly_one() {
        for _ in 0..200 {
            let registry = Arc::new(Registry::new());
            let threads: Vec<_> = (0..8)
                .map(|_| {
                    let registry = registry.clone();
                    std::thread::spawn(move || {
                        let (h, _p) = handle();
                        registry.register(name("alice"), h).is_ok()
                    })
                })
                .collect();

            let wins = threads.into_iter().map(|t| t.join().unwrap()).filter(|ok| *ok).count();
            assert_eq!(wins, 1);
            assert_eq!(registry.len(), 1);
        }
    }

    #[tokio::test]
    async fn close_all_reaches_every_connection() {
        let registry = Registry::new();
        let (a, mut pa) = handle();
        let (b, mut pb) = handle();
        registry.register(name("a"), a).unwrap();
        registry.register(name("b"), b).unwrap();

        registry.close_all().await;

        for peer in [&mut pa, &mut pb] {
            assert_eq!(
                peer.next().await,
                Some(Sent::Close(CLOSE_GOING_AWAY, "server shutting down".into()))
            );
        }
    }

    #[tokio::test]
    async fn drain_waits_for_sessions_to_leave() {
        let registry = Arc::new(Registry::new());
        let (a, mut pa) = handle();
        let id = a.id();
        registry.register(name("a"), a).unwrap();

        let leaving = registry.clone();
        tokio::spawn(async move {
            if let Some(Sent::Close(..)) = pa.next().await {
                leaving.unregister("a", id);
            }
        });

        assert!(registry.drain(Duration::from_secs(1)).await);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn drain_gives_up_on_sessions_that_linger() {
        let registry = Registry::new();
        let (a, _pa) = handle();
        registry.register(name("a"), a).unwrap();

        assert!(!registry.drain(Duration::from_millis(100)).await);
        assert!(registry.contains("a"));
    }
}
