use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::ballot::{Ballot, BallotState, StateError};

/// Snapshot format written by this build
pub const SNAPSHOT_FORMAT_VERSION: &str = "1";

/// Errors that can occur while saving or loading ballot snapshots
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("State corruption detected: {reason}")]
    StateCorruption { reason: String },

    #[error("Invalid ballot state: {0}")]
    InvalidState(#[from] StateError),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: String, found: String },

    #[error("Lock acquisition failed: {reason}")]
    LockError { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotReason {
    Created,
    CommandApplied,
    Replayed,
    UserRequested,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub snapshot_id: String,
    pub reason: SnapshotReason,
    pub integrity_hash: String,
    pub pid: Option<u32>,
    pub hostname: String,
}

/// A persisted ballot together with where and why it was written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotSnapshot {
    pub version: String,
    pub state: BallotState,
    pub metadata: SnapshotMetadata,
    pub saved_at: DateTime<Utc>,
}

impl BallotSnapshot {
    pub fn capture(ballot: &Ballot, reason: SnapshotReason) -> Self {
        Self {
            version: SNAPSHOT_FORMAT_VERSION.to_string(),
            state: ballot.to_state(),
            metadata: SnapshotMetadata {
                snapshot_id: format!("{}_{}", Utc::now().timestamp(), rand::rng().random::<u32>()),
                reason,
                integrity_hash: String::new(),
                pid: Some(std::process::id()),
                hostname: hostname::get()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string(),
            },
            saved_at: Utc::now(),
        }
    }

    pub fn into_ballot(self) -> Result<Ballot, PersistenceError> {
        if self.version != SNAPSHOT_FORMAT_VERSION {
            return Err(PersistenceError::VersionMismatch {
                expected: SNAPSHOT_FORMAT_VERSION.to_string(),
                found: self.version,
            });
        }
        Ok(Ballot::from_state(self.state)?)
    }
}

/// Hash over the fields that must not change between save and load
pub fn calculate_integrity_hash(snapshot: &BallotSnapshot) -> Result<String, PersistenceError> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    snapshot.version.hash(&mut hasher);
    serde_json::to_string(&snapshot.state)?.hash(&mut hasher);
    Ok(format!("{:x}", hasher.finish()))
}

#[async_trait]
pub trait SnapshotStore {
    /// Persist `snapshot`, returning its snapshot id
    async fn save(&self, snapshot: &BallotSnapshot) -> Result<String, PersistenceError>;

    /// Load the current snapshot, `None` if nothing was saved yet
    async fn load(&self) -> Result<Option<BallotSnapshot>, PersistenceError>;

    async fn exists(&self) -> bool;
}

/// Single JSON file holding the current ballot
#[derive(Debug, Clone)]
pub struct FileSystemSnapshotStore {
    path: PathBuf,
    enable_integrity_checks: bool,
}

impl FileSystemSnapshotStore {
    pub fn new(path: impl Into<PathBuf>, enable_integrity_checks: bool) -> Self {
        Self {
            path: path.into(),
            enable_integrity_checks,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file used to serialize writers across processes
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    async fn ensure_parent_dir(&self) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    async fn verify_integrity(&self, snapshot: &BallotSnapshot) -> Result<bool, PersistenceError> {
        if !self.enable_integrity_checks {
            return Ok(true);
        }

        let expected_hash = &snapshot.metadata.integrity_hash;
        let actual_hash = calculate_integrity_hash(snapshot)?;
        let is_valid = expected_hash == &actual_hash;

        if !is_valid {
            warn!(
                file = ?self.path,
                expected_hash = %expected_hash,
                actual_hash = %actual_hash,
                "Snapshot integrity check failed"
            );
        }

        Ok(is_valid)
    }
}

#[async_trait]
impl SnapshotStore for FileSystemSnapshotStore {
    async fn save(&self, snapshot: &BallotSnapshot) -> Result<String, PersistenceError> {
        self.ensure_parent_dir().await?;

        let mut to_save = snapshot.clone();
        to_save.saved_at = Utc::now();
        to_save.metadata.integrity_hash = if self.enable_integrity_checks {
            calculate_integrity_hash(&to_save)?
        } else {
            "integrity_disabled".to_string()
        };

        let serialized = serde_json::to_string_pretty(&to_save)?;

        // Write to temporary file first, then rename
        let temp_file = format!("{}.tmp", self.path.display());
        fs::write(&temp_file, serialized).await?;
        fs::rename(&temp_file, &self.path).await?;

        info!(
            snapshot_id = %to_save.metadata.snapshot_id,
            reason = ?to_save.metadata.reason,
            status = %to_save.state.status,
            file = ?self.path,
            "Ballot snapshot saved"
        );

        Ok(to_save.metadata.snapshot_id)
    }

    async fn load(&self) -> Result<Option<BallotSnapshot>, PersistenceError> {
        if !self.exists().await {
            debug!(file = ?self.path, "No existing ballot snapshot");
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).await?;
        let snapshot: BallotSnapshot = serde_json::from_str(&contents)?;

        if !self.verify_integrity(&snapshot).await? {
            return Err(PersistenceError::StateCorruption {
                reason: format!("integrity check failed for {}", self.path.display()),
            });
        }

        info!(
            snapshot_id = %snapshot.metadata.snapshot_id,
            saved_at = %snapshot.saved_at,
            status = %snapshot.state.status,
            "Ballot snapshot loaded"
        );

        Ok(Some(snapshot))
    }

    async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }
}

/// Advisory lock held while a command is loaded, applied and saved
pub struct SnapshotLock {
    lock: fd_lock::RwLock<File>,
}

impl SnapshotLock {
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        Ok(Self {
            lock: fd_lock::RwLock::new(file),
        })
    }

    /// Take the exclusive lock if it is free, `None` while another holder has it
    pub fn try_acquire(
        &mut self,
    ) -> Result<Option<fd_lock::RwLockWriteGuard<'_, File>>, PersistenceError> {
        match self.lock.try_write() {
            Ok(guard) => Ok(Some(guard)),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(PersistenceError::LockError {
                reason: e.to_string(),
            }),
        }
    }
}
