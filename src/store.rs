//! Durable storage for flow parameters and session tokens
//!
//! The engine persists its short-lived security parameters (`state`,
//! `code_verifier`) and long-lived session tokens (`access_token`,
//! `refresh_token`) through the [`ParameterStore`] trait. In a browser this
//! role is played by cookies or local storage; this crate ships two native
//! implementations:
//!
//! - [`MemoryStore`] -- process-local, used by tests and short-lived flows.
//! - [`FileStore`]   -- a JSON state file, so parameters survive the
//!   redirect round-trip when the callback arrives in a fresh process.
//!
//! Expiry is explicit: [`ParameterStore::get`] returns the raw value even
//! when the entry has expired, and consumers that care about freshness call
//! [`ParameterStore::is_expired`] separately. Absent keys report expired.
//!
//! No transactional guarantees are made; each flow instance assumes
//! exclusive, non-concurrent access to its store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthFlowError, Result};

/// Reserved key for the persisted `state` nonce.
pub const STATE_KEY: &str = "oauth_state";

/// Reserved key for the persisted PKCE code verifier.
pub const CODE_VERIFIER_KEY: &str = "oauth_code_verifier";

/// Reserved key for the persisted access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Reserved key for the persisted refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

// ---------------------------------------------------------------------------
// ParameterStore
// ---------------------------------------------------------------------------

/// Durable string storage with per-key expiry.
///
/// The contract mirrors browser cookie semantics: values are opaque strings,
/// every entry carries an expiry, and an expired-but-present entry behaves
/// as absent for consumers that check expiry explicitly.
pub trait ParameterStore {
    /// Returns the stored value for `key`, expired or not.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, expiring `ttl` from now. Overwrites any
    /// existing entry.
    fn set(&mut self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Returns `true` when `key` is absent or its expiry has passed.
    fn is_expired(&self, key: &str) -> Result<bool>;

    /// Removes `key`. Removing an absent key is a no-op.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// A stored value together with its expiry timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    expires_at: DateTime<Utc>,
}

impl StoredEntry {
    fn new(value: &str, ttl: Duration) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Utc::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory [`ParameterStore`].
///
/// # Examples
///
/// ```
/// use authflow::store::{MemoryStore, ParameterStore};
/// use chrono::Duration;
///
/// let mut store = MemoryStore::new();
/// store.set("key", "value", Duration::minutes(5)).unwrap();
/// assert_eq!(store.get("key").unwrap(), Some("value".to_string()));
/// assert!(!store.is_expired("key").unwrap());
///
/// store.remove("key").unwrap();
/// assert_eq!(store.get("key").unwrap(), None);
/// assert!(store.is_expired("key").unwrap());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, StoredEntry>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParameterStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|e| e.value.clone()))
    }

    fn set(&mut self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries
            .insert(key.to_string(), StoredEntry::new(value, ttl));
        Ok(())
    }

    fn is_expired(&self, key: &str) -> Result<bool> {
        Ok(self.entries.get(key).map_or(true, StoredEntry::is_expired))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// [`ParameterStore`] backed by a JSON state file.
///
/// The full entry map is serialized to the file on every mutation, which is
/// acceptable for the handful of keys the flow uses. Loading tolerates a
/// missing file (treated as empty) so that the first run needs no setup.
///
/// # Examples
///
/// ```no_run
/// use authflow::store::{FileStore, ParameterStore};
/// use chrono::Duration;
///
/// # fn main() -> authflow::error::Result<()> {
/// let mut store = FileStore::open("auth_state.json")?;
/// store.set("key", "value", Duration::minutes(5))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: HashMap<String, StoredEntry>,
}

impl FileStore {
    /// Opens the store at `path`, loading existing entries.
    ///
    /// A missing file yields an empty store; it is created on the first
    /// mutation.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFlowError::Storage`] when the file exists but cannot be
    /// read or contains malformed JSON.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| AuthFlowError::Storage(format!("failed to read {path:?}: {e}")))?;
            serde_json::from_str(&raw)
                .map_err(|e| AuthFlowError::Storage(format!("malformed state file {path:?}: {e}")))?
        } else {
            HashMap::new()
        };

        Ok(Self { path, entries })
    }

    /// Writes the current entry map to the backing file.
    fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, raw)
            .map_err(|e| AuthFlowError::Storage(format!("failed to write {:?}: {e}", self.path)))
    }
}

impl ParameterStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|e| e.value.clone()))
    }

    fn set(&mut self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries
            .insert(key.to_string(), StoredEntry::new(value, ttl));
        self.persist()
    }

    fn is_expired(&self, key: &str) -> Result<bool> {
        Ok(self.entries.get(key).map_or(true, StoredEntry::is_expired))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
