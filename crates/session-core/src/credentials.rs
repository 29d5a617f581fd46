//! Credential persistence.
//!
//! [`CredentialStore`] is a plain key/value contract over four slots. The
//! provided methods encode the write policies the controller relies on:
//!
//! - [`CredentialStore::set_credentials`] clears a slot when the incoming
//!   value is absent (explicit clear-on-absence, not a no-op)
//! - [`CredentialStore::set_refreshed`] keeps the current refresh token unless
//!   the gateway rotated it
//! - [`CredentialStore::clear`] drops the three tokens and leaves the session id

use crate::secret::{secret_opt, ExposeSecret, SecretString};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

/// Storage-layer failure. Propagated unmodified by the controller.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Credential store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential store is corrupt: {0}")]
    Corrupt(String),

    #[error("Credential store lock poisoned")]
    Poisoned,
}

/// The four persisted slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialSlot {
    IdToken,
    AccessToken,
    RefreshToken,
    SessionId,
}

impl CredentialSlot {
    /// All slots, in storage order.
    pub const ALL: [CredentialSlot; 4] = [
        Self::IdToken,
        Self::AccessToken,
        Self::RefreshToken,
        Self::SessionId,
    ];

    /// Storage key for this slot.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::IdToken => "ID_TOKEN",
            Self::AccessToken => "ACCESS_TOKEN",
            Self::RefreshToken => "REFRESH_TOKEN",
            Self::SessionId => "SESSION_ID",
        }
    }
}

impl fmt::Display for CredentialSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The three-token credential set. Each field is independently optional.
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    pub id_token: Option<SecretString>,
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
}

impl CredentialSet {
    #[must_use]
    pub fn new(
        id_token: Option<&str>,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Self {
        Self {
            id_token: secret_opt(id_token),
            access_token: secret_opt(access_token),
            refresh_token: secret_opt(refresh_token),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_token.is_none() && self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Client-side key/value storage for the credential set and session id.
///
/// Implementations hold no logic: no validation and no network access.
pub trait CredentialStore: Send + Sync {
    /// Read a slot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage-layer failure.
    fn get(&self, slot: CredentialSlot) -> Result<Option<String>, StoreError>;

    /// Overwrite a slot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage-layer failure.
    fn set(&self, slot: CredentialSlot, value: &str) -> Result<(), StoreError>;

    /// Remove a slot. Removing an absent slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage-layer failure.
    fn remove(&self, slot: CredentialSlot) -> Result<(), StoreError>;

    /// Read the three token slots.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage-layer failure.
    fn credentials(&self) -> Result<CredentialSet, StoreError> {
        Ok(CredentialSet {
            id_token: self.get(CredentialSlot::IdToken)?.map(SecretString::from),
            access_token: self.get(CredentialSlot::AccessToken)?.map(SecretString::from),
            refresh_token: self.get(CredentialSlot::RefreshToken)?.map(SecretString::from),
        })
    }

    /// Write all three token slots; an absent value removes the slot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage-layer failure.
    fn set_credentials(&self, credentials: &CredentialSet) -> Result<(), StoreError> {
        write_or_remove(self, CredentialSlot::IdToken, credentials.id_token.as_ref())?;
        write_or_remove(self, CredentialSlot::AccessToken, credentials.access_token.as_ref())?;
        write_or_remove(self, CredentialSlot::RefreshToken, credentials.refresh_token.as_ref())
    }

    /// Write a refresh-exchange result.
    ///
    /// Identity and access tokens are clear-on-absence; the refresh token is
    /// only overwritten when the gateway returned a rotated one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage-layer failure.
    fn set_refreshed(&self, credentials: &CredentialSet) -> Result<(), StoreError> {
        write_or_remove(self, CredentialSlot::IdToken, credentials.id_token.as_ref())?;
        write_or_remove(self, CredentialSlot::AccessToken, credentials.access_token.as_ref())?;
        if let Some(rotated) = &credentials.refresh_token {
            self.set(CredentialSlot::RefreshToken, rotated.expose_secret())?;
        }
        Ok(())
    }

    /// Write or remove the session id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage-layer failure.
    fn set_session_id(&self, session_id: Option<&str>) -> Result<(), StoreError> {
        match session_id {
            Some(id) => self.set(CredentialSlot::SessionId, id),
            None => self.remove(CredentialSlot::SessionId),
        }
    }

    /// Remove the three token slots. The session id is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage-layer failure.
    fn clear(&self) -> Result<(), StoreError> {
        self.remove(CredentialSlot::AccessToken)?;
        self.remove(CredentialSlot::IdToken)?;
        self.remove(CredentialSlot::RefreshToken)
    }
}

fn write_or_remove<S: CredentialStore + ?Sized>(
    store: &S,
    slot: CredentialSlot,
    value: Option<&SecretString>,
) -> Result<(), StoreError> {
    match value {
        Some(v) => store.set(slot, v.expose_secret()),
        None => store.remove(slot),
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store, for tests and embedding.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    slots: Mutex<HashMap<CredentialSlot, String>>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of which slots are populated (values not exposed).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Poisoned` if the lock is poisoned.
    pub fn populated(&self) -> Result<Vec<CredentialSlot>, StoreError> {
        let slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(CredentialSlot::ALL
            .into_iter()
            .filter(|s| slots.contains_key(s))
            .collect())
    }
}

impl fmt::Debug for InMemoryCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryCredentialStore")
            .field("slots", &"[REDACTED]")
            .finish()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, slot: CredentialSlot) -> Result<Option<String>, StoreError> {
        let slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(slots.get(&slot).cloned())
    }

    fn set(&self, slot: CredentialSlot, value: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        slots.insert(slot, value.to_string());
        Ok(())
    }

    fn remove(&self, slot: CredentialSlot) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        slots.remove(&slot);
        Ok(())
    }
}

// =============================================================================
// File store
// =============================================================================

/// JSON-file store keyed by [`CredentialSlot::key`].
///
/// Every write rewrites the whole file through a temp file and rename. A
/// missing file reads as empty. On Unix the file is created owner-only.
pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                warn!(target: "session.store", path = %self.path.display(), "Credential file is not valid JSON");
                StoreError::Corrupt(e.to_string())
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, map: &HashMap<String, String>) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec_pretty(map).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        write_private(&tmp, &bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(target: "session.store", path = %self.path.display(), slots = map.len(), "Credential file written");
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut HashMap<String, String>)) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut map = self.load()?;
        f(&mut map);
        self.save(&map)
    }
}

#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)
}

impl fmt::Debug for FileCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCredentialStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, slot: CredentialSlot) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.load()?.remove(slot.key()))
    }

    fn set(&self, slot: CredentialSlot, value: &str) -> Result<(), StoreError> {
        self.update(|map| {
            map.insert(slot.key().to_string(), value.to_string());
        })
    }

    fn remove(&self, slot: CredentialSlot) -> Result<(), StoreError> {
        self.update(|map| {
            map.remove(slot.key());
        })
    }
}
