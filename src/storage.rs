//! Durable storage of the ledger as a full JSON snapshot, rewritten after
//! every mutating command.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Ledger;

/// Bumped whenever the snapshot layout changes incompatibly.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Full-snapshot persistence of the ledger.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Load the persisted ledger. `Ok(None)` means no snapshot exists yet.
    async fn load_all(&self) -> Result<Option<Ledger>>;

    /// Overwrite the snapshot with the current ledger.
    async fn save_all(&self, ledger: &Ledger) -> Result<()>;
}

#[derive(Deserialize)]
struct Snapshot {
    schema_version: u32,
    users: Ledger,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    schema_version: u32,
    users: &'a Ledger,
}

/// Stores the ledger as a single JSON file on local disk.
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileRepository { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl Repository for JsonFileRepository {
    async fn load_all(&self) -> Result<Option<Ledger>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read snapshot {}", self.path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse snapshot {}", self.path.display()))?;
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            bail!(
                "unsupported snapshot schema version {} (expected {})",
                snapshot.schema_version,
                SNAPSHOT_SCHEMA_VERSION
            );
        }
        Ok(Some(snapshot.users))
    }

    async fn save_all(&self, ledger: &Ledger) -> Result<()> {
        debug!(path = %self.path.display(), users = ledger.len(), "saving ledger snapshot");
        let snapshot = SnapshotRef {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            users: ledger,
        };
        let raw = serde_json::to_string(&snapshot).context("Failed to serialize snapshot")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write snapshot {}", self.path.display()))
    }
}
