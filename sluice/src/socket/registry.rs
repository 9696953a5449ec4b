//! Connection registry.
//!
//! Map of key → connection plus the keys in insertion order, so "the first
//! connection" is deterministic. Both are only mutated together under the
//! write lock; lookups take the read lock and hand out `Arc` clones so no
//! guard outlives the call.
//!
//! Keys are raw bytes: a ROUTER peer's declared identity is kept exactly as
//! sent, UTF-8 or not.

use crate::error::{Error, Result};
use bytes::Bytes;
use hashbrown::HashMap;
use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Something the registry can close when it lets go of it.
pub trait Closeable {
    /// Close the underlying resources. A second call reports
    /// [`Error::ConnectionClosed`].
    fn close(&self) -> Result<()>;
}

/// Generate a fresh connection key (random UUID, canonical text form).
pub fn generate_key() -> Result<Bytes> {
    let mut bytes = [0u8; 16];
    OsRng.try_fill_bytes(&mut bytes).map_err(Error::KeyGeneration)?;
    Ok(Bytes::from(
        uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .hyphenated()
            .to_string(),
    ))
}

struct Entries<C> {
    conns: HashMap<Bytes, Arc<C>>,
    ids: Vec<Bytes>,
    /// Set by `close_all`; later inserts are refused.
    closed: bool,
}

/// Concurrency-safe set of live connections.
pub struct ConnectionRegistry<C> {
    inner: RwLock<Entries<C>>,
}

impl<C> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Entries {
                conns: HashMap::new(),
                ids: Vec::new(),
                closed: false,
            }),
        }
    }
}

impl<C: Closeable> ConnectionRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under a freshly generated key.
    ///
    /// A generated key that collides with a live one is regenerated while
    /// the write lock is held, so keys stay unique across concurrent callers.
    /// Fails with [`Error::Closed`] once [`close_all`](Self::close_all) ran.
    pub fn insert(&self, conn: Arc<C>) -> Result<Bytes> {
        let mut inner = self.inner.write();
        if inner.closed {
            return Err(Error::Closed);
        }
        let key = loop {
            let key = generate_key()?;
            if !inner.conns.contains_key(&key) {
                break key;
            }
            debug!("[SOCKET] Generated key {:?} already in use, regenerating", key);
        };
        inner.conns.insert(key.clone(), conn);
        inner.ids.push(key.clone());
        Ok(key)
    }

    /// Register under a caller-chosen key.
    ///
    /// An empty key falls back to a generated one. A key that is already
    /// registered is rejected and the registry is left untouched.
    pub fn insert_with_key(&self, conn: Arc<C>, key: Bytes) -> Result<Bytes> {
        if key.is_empty() {
            return self.insert(conn);
        }
        let mut inner = self.inner.write();
        if inner.closed {
            return Err(Error::Closed);
        }
        if inner.conns.contains_key(&key) {
            return Err(Error::DuplicateKey(key));
        }
        inner.conns.insert(key.clone(), conn);
        inner.ids.push(key.clone());
        Ok(key)
    }

    /// Drop every occurrence of `key` and close its connection.
    ///
    /// Absent keys are a no-op. Returns the removed connection.
    pub fn remove(&self, key: &[u8]) -> Option<Arc<C>> {
        let removed = {
            let mut inner = self.inner.write();
            inner.ids.retain(|id| id.as_ref() != key);
            inner.conns.remove(key)
        };
        if let Some(conn) = &removed {
            close_logged(key, conn.as_ref());
        }
        removed
    }

    pub fn get(&self, key: &[u8]) -> Option<Arc<C>> {
        self.inner.read().conns.get(key).cloned()
    }

    /// Earliest-registered live connection.
    pub fn first(&self) -> Option<Arc<C>> {
        let inner = self.inner.read();
        inner.ids.first().and_then(|id| inner.conns.get(id)).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in registration order.
    pub fn keys(&self) -> Vec<Bytes> {
        self.inner.read().ids.clone()
    }

    /// Close every connection, empty the registry and refuse new entries.
    ///
    /// Returns how many connections were released.
    pub fn close_all(&self) -> usize {
        let drained: Vec<(Bytes, Arc<C>)> = {
            let mut inner = self.inner.write();
            inner.closed = true;
            inner.ids.clear();
            inner.conns.drain().collect()
        };
        for (key, conn) in &drained {
            close_logged(key, conn.as_ref());
        }
        drained.len()
    }
}

fn close_logged<C: Closeable>(key: &[u8], conn: &C) {
    if let Err(e) = conn.close() {
        warn!("[SOCKET] Closing connection {:?}: {}", Bytes::copy_from_slice(key), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeConn {
        closes: AtomicUsize,
    }

    impl Closeable for FakeConn {
        fn close(&self) -> Result<()> {
            if self.closes.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(Error::ConnectionClosed);
            }
            Ok(())
        }
    }

    impl FakeConn {
        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_generated_keys_are_uuids() {
        let key = generate_key().unwrap();
        assert_eq!(key.len(), 36);
        assert_eq!(key.iter().filter(|&&b| b == b'-').count(), 4);
        assert_ne!(key, generate_key().unwrap());
    }

    #[test]
    fn test_insert_keeps_order() {
        let registry = ConnectionRegistry::new();
        let a = registry.insert(Arc::new(FakeConn::default())).unwrap();
        let b = registry.insert(Arc::new(FakeConn::default())).unwrap();

        assert_ne!(a, b);
        assert_eq!(registry.keys(), vec![a.clone(), b]);
        assert!(Arc::ptr_eq(
            &registry.first().unwrap(),
            &registry.get(&a).unwrap()
        ));
    }

    #[test]
    fn test_concurrent_inserts_stay_unique() {
        let registry = ConnectionRegistry::new();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..250 {
                        registry.insert(Arc::new(FakeConn::default())).unwrap();
                    }
                });
            }
        });

        let keys = registry.keys();
        assert_eq!(keys.len(), 2000);
        assert_eq!(registry.len(), keys.len());
        assert_eq!(keys.iter().collect::<HashSet<_>>().len(), keys.len());
    }

    #[test]
    fn test_insert_with_key() {
        let registry = ConnectionRegistry::new();
        let key = registry
            .insert_with_key(Arc::new(FakeConn::default()), Bytes::from_static(b"test_dealer"))
            .unwrap();
        assert_eq!(key, Bytes::from_static(b"test_dealer"));
        assert!(registry.get(b"test_dealer").is_some());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let registry = ConnectionRegistry::new();
        let first = Arc::new(FakeConn::default());
        let peer = Bytes::from_static(b"peer");
        registry.insert_with_key(Arc::clone(&first), peer.clone()).unwrap();

        let result = registry.insert_with_key(Arc::new(FakeConn::default()), peer.clone());
        assert!(matches!(result, Err(Error::DuplicateKey(k)) if k == peer));
        assert_eq!(registry.keys(), vec![peer]);
        assert!(Arc::ptr_eq(&registry.get(b"peer").unwrap(), &first));
    }

    #[test]
    fn test_empty_key_falls_back_to_generated() {
        let registry = ConnectionRegistry::new();
        let key = registry
            .insert_with_key(Arc::new(FakeConn::default()), Bytes::new())
            .unwrap();
        assert_eq!(key.len(), 36);
        assert_eq!(registry.keys(), vec![key]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let conn = Arc::new(FakeConn::default());
        let key = registry.insert(Arc::clone(&conn)).unwrap();
        let other = registry.insert(Arc::new(FakeConn::default())).unwrap();

        assert!(registry.remove(&key).is_some());
        assert!(registry.remove(&key).is_none());
        assert!(registry.remove(b"never-registered").is_none());

        assert_eq!(conn.closes(), 1);
        assert_eq!(registry.keys(), vec![other]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_close_all() {
        let registry = ConnectionRegistry::new();
        let conns: Vec<_> = (0..3).map(|_| Arc::new(FakeConn::default())).collect();
        for conn in &conns {
            registry.insert(Arc::clone(conn)).unwrap();
        }

        assert_eq!(registry.close_all(), 3);
        assert!(registry.is_empty());
        assert!(registry.keys().is_empty());
        assert!(registry.first().is_none());
        assert!(conns.iter().all(|c| c.closes() == 1));

        // Second pass has nothing left to close
        assert_eq!(registry.close_all(), 0);
    }

    #[test]
    fn test_insert_after_close_all_refused() {
        let registry = ConnectionRegistry::new();
        registry.close_all();

        let late = Arc::new(FakeConn::default());
        assert!(matches!(registry.insert(Arc::clone(&late)), Err(Error::Closed)));
        assert!(matches!(
            registry.insert_with_key(Arc::clone(&late), Bytes::from_static(b"peer")),
            Err(Error::Closed)
        ));
        assert!(registry.is_empty());
        assert_eq!(late.closes(), 0);
    }

    #[test]
    fn test_binary_keys_stay_distinct() {
        let registry = ConnectionRegistry::new();
        let a = registry
            .insert_with_key(Arc::new(FakeConn::default()), Bytes::from_static(b"\xff"))
            .unwrap();
        let b = registry
            .insert_with_key(Arc::new(FakeConn::default()), Bytes::from_static(b"\xfe"))
            .unwrap();

        assert_eq!(a.as_ref(), b"\xff");
        assert_eq!(b.as_ref(), b"\xfe");
        assert_eq!(registry.len(), 2);
        assert!(registry.get(b"\xff").is_some());
        assert!(registry.get(b"\xfe").is_some());
        assert!(registry.get("\u{fffd}".as_bytes()).is_none());
    }

    #[test]
    fn test_double_close_is_swallowed() {
        let registry = ConnectionRegistry::new();
        let conn = Arc::new(FakeConn::default());
        conn.close().unwrap();

        let key = registry.insert(Arc::clone(&conn)).unwrap();
        // Already closed: error is logged, removal still happens
        assert!(registry.remove(&key).is_some());
        assert_eq!(conn.closes(), 2);
    }
}
