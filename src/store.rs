//! Session persistence over a textual key-value protocol (GET / SET / DEL).
//!
//! Writes issued by the dispatcher go through [`SessionStore::replace`], an
//! atomic compare-and-swap against the raw value read earlier, so two workers
//! racing on the same session can never silently overwrite each other.

use crate::error::{StoreError, StoreResult};
use crate::save::Record;
use crate::session_id::SessionId;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Raw UTF-8 key-value access.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    async fn del(&self, key: &str) -> StoreResult<()>;

    /// Atomically writes `new` (or deletes the key when `None`) only if the
    /// current value equals `expected` (`None` meaning "absent").
    /// Returns `false` when the current value did not match.
    async fn swap(&self, key: &str, expected: Option<&str>, new: Option<&str>) -> StoreResult<bool>;

    async fn is_healthy(&self) -> bool;
}

// ============ Redis ============

const SWAP_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '1' then
    if current ~= ARGV[2] then return 0 end
else
    if current then return 0 end
end
if ARGV[3] == '1' then
    redis.call('SET', KEYS[1], ARGV[4])
else
    redis.call('DEL', KEYS[1])
end
return 1
"#;

pub struct RedisBackend {
    conn_manager: ConnectionManager,
    swap_script: redis::Script,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn_manager = client.get_connection_manager().await?;
        Ok(Self {
            conn_manager,
            swap_script: redis::Script::new(SWAP_SCRIPT),
        })
    }

    // ConnectionManager is a cheap handle; each call gets its own clone.
    fn conn(&self) -> ConnectionManager {
        self.conn_manager.clone()
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value: Option<String> = self.conn().get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn().set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        self.conn().del::<_, ()>(key).await?;
        Ok(())
    }

    async fn swap(&self, key: &str, expected: Option<&str>, new: Option<&str>) -> StoreResult<bool> {
        let mut conn = self.conn();
        let swapped: i64 = self
            .swap_script
            .key(key)
            .arg(if expected.is_some() { "1" } else { "0" })
            .arg(expected.unwrap_or(""))
            .arg(if new.is_some() { "1" } else { "0" })
            .arg(new.unwrap_or(""))
            .invoke_async(&mut conn)
            .await?;
        Ok(swapped == 1)
    }

    async fn is_healthy(&self) -> bool {
        let mut conn = self.conn();
        match redis::cmd("PING").query_async::<String>(&mut conn).await {
            Ok(response) => response == "PONG",
            Err(_) => false,
        }
    }
}

// ============ In-process ============

/// Backend kept in process memory. Used by tests and local runs; a single
/// write lock makes `swap` atomic.
#[derive(Default, Clone)]
pub struct MemoryBackend {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn swap(&self, key: &str, expected: Option<&str>, new: Option<&str>) -> StoreResult<bool> {
        let mut entries = self.entries.write().await;
        if entries.get(key).map(String::as_str) != expected {
            return Ok(false);
        }
        match new {
            Some(value) => {
                entries.insert(key.to_string(), value.to_string());
            }
            None => {
                entries.remove(key);
            }
        }
        Ok(true)
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

// ============ Typed store ============

/// What was read for a session: the decoded record and the exact raw text it
/// came from, which later writes must still find in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub record: Option<Record>,
    raw: Option<String>,
}

impl Snapshot {
    pub fn absent() -> Self {
        Self {
            record: None,
            raw: None,
        }
    }
}

#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KvBackend>,
    key_prefix: String,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KvBackend>, key_prefix: impl Into<String>) -> Self {
        Self {
            backend,
            key_prefix: key_prefix.into(),
        }
    }

    fn key(&self, id: &SessionId) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    /// `Ok(None)` is "never played", distinct from `Ok(Some(Record::Terminal))`.
    pub async fn get(&self, id: &SessionId) -> StoreResult<Option<Record>> {
        match self.backend.get(&self.key(id)).await? {
            Some(raw) => Record::decode(&raw).map(Some),
            None => Ok(None),
        }
    }

    pub async fn put(&self, id: &SessionId, record: &Record) -> StoreResult<()> {
        let raw = record.encode()?;
        self.backend.set(&self.key(id), &raw).await
    }

    pub async fn delete(&self, id: &SessionId) -> StoreResult<()> {
        self.backend.del(&self.key(id)).await
    }

    /// Reads a session for a later [`replace`](Self::replace). A record that
    /// cannot be decoded is logged and reported as absent, but its raw text is
    /// kept so the overwrite still goes through compare-and-swap.
    pub async fn fetch(&self, id: &SessionId) -> StoreResult<Snapshot> {
        let raw = self.backend.get(&self.key(id)).await?;
        let record = match raw.as_deref().map(Record::decode) {
            None => None,
            Some(Ok(record)) => Some(record),
            Some(Err(e)) => {
                log::warn!("Discarding undecodable record for session {id}: {e}");
                None
            }
        };
        Ok(Snapshot { record, raw })
    }

    /// Writes `record` (or deletes the session when `None`) if nothing changed
    /// since `snapshot` was fetched; otherwise fails with [`StoreError::Conflict`].
    pub async fn replace(
        &self,
        id: &SessionId,
        snapshot: &Snapshot,
        record: Option<&Record>,
    ) -> StoreResult<()> {
        let new = record.map(Record::encode).transpose()?;
        let swapped = self
            .backend
            .swap(&self.key(id), snapshot.raw.as_deref(), new.as_deref())
            .await?;
        if swapped {
            Ok(())
        } else {
            Err(StoreError::Conflict)
        }
    }

    pub async fn is_healthy(&self) -> bool {
        self.backend.is_healthy().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::GameSession;

    fn store() -> (SessionStore, MemoryBackend) {
        let backend = MemoryBackend::new();
        (SessionStore::new(Arc::new(backend.clone()), "test:"), backend)
    }

    #[tokio::test]
    async fn test_absent_terminal_and_live_are_distinct() {
        let (store, _) = store();
        let id = SessionId::from_raw("abc");

        assert_eq!(store.get(&id).await.unwrap(), None);

        store.put(&id, &Record::Terminal).await.unwrap();
        let record = store.get(&id).await.unwrap().unwrap();
        assert!(record.is_terminal());

        let game = GameSession::new();
        store.put(&id, &Record::Live(game.clone())).await.unwrap();
        let record = store.get(&id).await.unwrap().unwrap();
        assert!(!record.is_terminal());
        assert_eq!(record, Record::Live(game));

        store.delete(&id).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_are_prefixed() {
        let (store, backend) = store();
        let id = SessionId::from_raw("abc");
        store.put(&id, &Record::Terminal).await.unwrap();
        assert_eq!(
            backend.get("test:abc").await.unwrap().as_deref(),
            Some("TERMINAL")
        );
    }

    #[tokio::test]
    async fn test_replace_rejects_stale_snapshot() {
        let (store, _) = store();
        let id = SessionId::from_raw("abc");

        let stale = store.fetch(&id).await.unwrap();
        assert_eq!(stale, Snapshot::absent());
        store.replace(&id, &stale, Some(&Record::Terminal)).await.unwrap();

        let result = store
            .replace(&id, &stale, Some(&Record::Live(GameSession::new())))
            .await;
        assert!(matches!(result, Err(StoreError::Conflict)));
        assert_eq!(store.get(&id).await.unwrap(), Some(Record::Terminal));

        let fresh = store.fetch(&id).await.unwrap();
        store.replace(&id, &fresh, None).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fetch_treats_garbage_as_absent_but_guards_it() {
        let (store, backend) = store();
        let id = SessionId::from_raw("abc");
        backend.set("test:abc", "{not json").await.unwrap();

        let snapshot = store.fetch(&id).await.unwrap();
        assert_eq!(snapshot.record, None);
        assert!(matches!(store.get(&id).await, Err(StoreError::Corrupt(_))));

        // A blind "absent" expectation must not clobber the garbage.
        let blind = Snapshot::absent();
        assert!(matches!(
            store.replace(&id, &blind, Some(&Record::Terminal)).await,
            Err(StoreError::Conflict)
        ));
        store.replace(&id, &snapshot, Some(&Record::Terminal)).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap(), Some(Record::Terminal));
    }
}
