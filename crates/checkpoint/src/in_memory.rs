//! In-memory store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use docassist_core::checkpoint::{Checkpoint, CheckpointStore, SessionSummary};
use docassist_core::error::CheckpointError;
use docassist_core::session::{SessionId, SessionState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps every checkpoint in a map keyed by session.
/// Nothing survives the process.
pub struct InMemoryCheckpointStore {
    sessions: Arc<RwLock<HashMap<SessionId, Vec<Checkpoint>>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, node: &str, state: &SessionState) -> Result<u64, CheckpointError> {
        let mut sessions = self.sessions.write().await;
        let history = sessions.entry(state.session_id.clone()).or_default();
        let seq = history.last().map(|c| c.seq + 1).unwrap_or(1);
        history.push(Checkpoint {
            session_id: state.session_id.clone(),
            seq,
            node: node.to_string(),
            state: state.clone(),
            created_at: Utc::now(),
        });
        Ok(seq)
    }

    async fn latest(&self, session_id: &SessionId) -> Result<Option<Checkpoint>, CheckpointError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).and_then(|h| h.last().cloned()))
    }

    async fn history(&self, session_id: &SessionId) -> Result<Vec<Checkpoint>, CheckpointError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned().unwrap_or_default())
    }

    async fn sessions(&self) -> Result<Vec<SessionSummary>, CheckpointError> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<SessionSummary> = sessions
            .values()
            .filter_map(|history| {
                let last = history.last()?;
                Some(SessionSummary {
                    session_id: last.session_id.clone(),
                    user_id: last.state.user_id.clone(),
                    checkpoints: history.len() as u64,
                    last_node: last.node.clone(),
                    updated_at: last.created_at,
                })
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn prune(&self, session_id: &SessionId, keep_last: usize) -> Result<usize, CheckpointError> {
        let mut sessions = self.sessions.write().await;
        let Some(history) = sessions.get_mut(session_id) else {
            return Ok(0);
        };
        let removed = history.len().saturating_sub(keep_last);
        history.drain(..removed);
        Ok(removed)
    }

    async fn delete(&self, session_id: &SessionId) -> Result<bool, CheckpointError> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }
}
