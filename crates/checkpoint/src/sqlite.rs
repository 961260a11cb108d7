//! SQLite checkpoint store.
//!
//! One table, `checkpoints`, keyed by `(session_id, seq)`. Each row holds
//! the full session state as JSON plus the node that produced it, so the
//! latest row is everything needed to resume a conversation.

use async_trait::async_trait;
use chrono::Utc;
use docassist_core::checkpoint::{Checkpoint, CheckpointStore, SessionSummary};
use docassist_core::error::CheckpointError;
use docassist_core::session::{SessionId, SessionState};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

/// A durable checkpoint store backed by a single SQLite file.
pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    /// Open (or create) the database at `path`.
    pub async fn open(path: &Path) -> Result<Self, CheckpointError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| CheckpointError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite checkpoint store initialized at {}", path.display());
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), CheckpointError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                session_id  TEXT NOT NULL,
                seq         INTEGER NOT NULL,
                node        TEXT NOT NULL,
                user_id     TEXT,
                state       TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (session_id, seq)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointError::MigrationFailed(format!("checkpoints table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_checkpoints_created_at ON checkpoints(created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointError::MigrationFailed(format!("created_at index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Parse a `Checkpoint` from a SQLite row.
    fn row_to_checkpoint(row: &sqlx::sqlite::SqliteRow) -> Result<Checkpoint, CheckpointError> {
        let session_id: String = row
            .try_get("session_id")
            .map_err(|e| CheckpointError::QueryFailed(format!("session_id column: {e}")))?;
        let seq: i64 = row
            .try_get("seq")
            .map_err(|e| CheckpointError::QueryFailed(format!("seq column: {e}")))?;
        let node: String = row
            .try_get("node")
            .map_err(|e| CheckpointError::QueryFailed(format!("node column: {e}")))?;
        let state_json: String = row
            .try_get("state")
            .map_err(|e| CheckpointError::QueryFailed(format!("state column: {e}")))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| CheckpointError::QueryFailed(format!("created_at column: {e}")))?;

        let state: SessionState =
            serde_json::from_str(&state_json).map_err(|e| CheckpointError::Corrupt {
                session_id: session_id.clone(),
                reason: e.to_string(),
            })?;

        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Checkpoint {
            session_id: SessionId(session_id),
            seq: seq as u64,
            node,
            state,
            created_at,
        })
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn put(&self, node: &str, state: &SessionState) -> Result<u64, CheckpointError> {
        let state_json = serde_json::to_string(state)
            .map_err(|e| CheckpointError::Storage(format!("Failed to serialize state: {e}")))?;
        let session_id = state.session_id.as_str();

        // Sequence is computed inside the insert so concurrent writers never collide
        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO checkpoints (session_id, seq, node, user_id, state, created_at)
            VALUES (
                ?1,
                (SELECT COALESCE(MAX(seq), 0) + 1 FROM checkpoints WHERE session_id = ?1),
                ?2, ?3, ?4, ?5
            )
            RETURNING seq
            "#,
        )
        .bind(session_id)
        .bind(node)
        .bind(state.user_id.as_deref())
        .bind(&state_json)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CheckpointError::QueryFailed(format!("insert checkpoint: {e}")))?;

        debug!(session_id, node, seq, "Checkpoint written");
        Ok(seq as u64)
    }

    async fn latest(&self, session_id: &SessionId) -> Result<Option<Checkpoint>, CheckpointError> {
        let row = sqlx::query(
            "SELECT * FROM checkpoints WHERE session_id = ? ORDER BY seq DESC LIMIT 1",
        )
        .bind(session_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CheckpointError::QueryFailed(format!("latest checkpoint: {e}")))?;

        row.as_ref().map(Self::row_to_checkpoint).transpose()
    }

    async fn history(&self, session_id: &SessionId) -> Result<Vec<Checkpoint>, CheckpointError> {
        let rows = sqlx::query("SELECT * FROM checkpoints WHERE session_id = ? ORDER BY seq ASC")
            .bind(session_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CheckpointError::QueryFailed(format!("history: {e}")))?;

        rows.iter().map(Self::row_to_checkpoint).collect()
    }

    async fn sessions(&self) -> Result<Vec<SessionSummary>, CheckpointError> {
        let rows = sqlx::query(
            r#"
            SELECT c.session_id, c.user_id, c.node, c.created_at, agg.n
            FROM checkpoints c
            JOIN (
                SELECT session_id, MAX(seq) AS max_seq, COUNT(*) AS n
                FROM checkpoints
                GROUP BY session_id
            ) agg ON c.session_id = agg.session_id AND c.seq = agg.max_seq
            ORDER BY c.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CheckpointError::QueryFailed(format!("sessions: {e}")))?;

        rows.iter()
            .map(|row| {
                let session_id: String = row
                    .try_get("session_id")
                    .map_err(|e| CheckpointError::QueryFailed(format!("session_id column: {e}")))?;
                let user_id: Option<String> = row
                    .try_get("user_id")
                    .map_err(|e| CheckpointError::QueryFailed(format!("user_id column: {e}")))?;
                let last_node: String = row
                    .try_get("node")
                    .map_err(|e| CheckpointError::QueryFailed(format!("node column: {e}")))?;
                let created_at_str: String = row
                    .try_get("created_at")
                    .map_err(|e| CheckpointError::QueryFailed(format!("created_at column: {e}")))?;
                let count: i64 = row
                    .try_get("n")
                    .map_err(|e| CheckpointError::QueryFailed(format!("count column: {e}")))?;

                let updated_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());

                Ok(SessionSummary {
                    session_id: SessionId(session_id),
                    user_id,
                    checkpoints: count as u64,
                    last_node,
                    updated_at,
                })
            })
            .collect()
    }

    async fn prune(&self, session_id: &SessionId, keep_last: usize) -> Result<usize, CheckpointError> {
        let result = sqlx::query(
            r#"
            DELETE FROM checkpoints
            WHERE session_id = ?1
              AND seq <= (SELECT MAX(seq) FROM checkpoints WHERE session_id = ?1) - ?2
            "#,
        )
        .bind(session_id.as_str())
        .bind(keep_last as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointError::QueryFailed(format!("prune: {e}")))?;

        Ok(result.rows_affected() as usize)
    }

    async fn delete(&self, session_id: &SessionId) -> Result<bool, CheckpointError> {
        let result = sqlx::query("DELETE FROM checkpoints WHERE session_id = ?")
            .bind(session_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| CheckpointError::QueryFailed(format!("delete: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
