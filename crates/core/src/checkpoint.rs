//! Checkpoint trait — durable session state.
//!
//! The workflow writes a checkpoint after every node it runs; the façade
//! reads the latest one when a turn starts or a session is resumed. Each
//! write is kept as a new row, so a session's history can be inspected and
//! pruned.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::CheckpointError;
use crate::session::{SessionId, SessionState};

/// One persisted snapshot of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Session this snapshot belongs to
    pub session_id: SessionId,

    /// Monotonic sequence number within the session (starts at 1)
    pub seq: u64,

    /// Name of the node that produced this snapshot
    pub node: String,

    /// The full state after that node ran
    pub state: SessionState,

    /// When the snapshot was written
    pub created_at: DateTime<Utc>,
}

/// Summary of a stored session, for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub user_id: Option<String>,
    pub checkpoints: u64,
    pub last_node: String,
    pub updated_at: DateTime<Utc>,
}

/// The core CheckpointStore trait.
///
/// Implementations: SQLite (durable), in-memory (tests and ephemeral runs).
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    /// Persist a snapshot written by `node`. Returns its sequence number.
    async fn put(&self, node: &str, state: &SessionState) -> std::result::Result<u64, CheckpointError>;

    /// The most recent snapshot for a session.
    async fn latest(&self, session_id: &SessionId) -> std::result::Result<Option<Checkpoint>, CheckpointError>;

    /// All snapshots for a session, oldest first.
    async fn history(&self, session_id: &SessionId) -> std::result::Result<Vec<Checkpoint>, CheckpointError>;

    /// All sessions with at least one snapshot, most recently updated first.
    async fn sessions(&self) -> std::result::Result<Vec<SessionSummary>, CheckpointError>;

    /// Drop all but the newest `keep_last` snapshots. Returns how many were removed.
    async fn prune(&self, session_id: &SessionId, keep_last: usize) -> std::result::Result<usize, CheckpointError>;

    /// Remove a session entirely. Returns whether anything was removed.
    async fn delete(&self, session_id: &SessionId) -> std::result::Result<bool, CheckpointError>;
}
