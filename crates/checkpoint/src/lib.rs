//! Checkpoint stores for the document assistant.
//!
//! The SQLite store is the default and survives restarts; the in-memory
//! store backs tests and `--ephemeral` runs.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryCheckpointStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCheckpointStore;

use docassist_config::{CheckpointBackend, CheckpointConfig};
use docassist_core::CheckpointStore;
use docassist_core::error::CheckpointError;
use std::sync::Arc;

/// Open the store selected by configuration.
pub async fn build_from_config(
    config: &CheckpointConfig,
) -> Result<Arc<dyn CheckpointStore>, CheckpointError> {
    match config.backend {
        CheckpointBackend::Memory => Ok(Arc::new(InMemoryCheckpointStore::new())),
        #[cfg(feature = "sqlite")]
        CheckpointBackend::Sqlite => {
            if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CheckpointError::Storage(format!(
                        "Failed to create {}: {e}",
                        parent.display()
                    ))
                })?;
            }
            Ok(Arc::new(SqliteCheckpointStore::open(&config.path).await?))
        }
        #[cfg(not(feature = "sqlite"))]
        CheckpointBackend::Sqlite => Err(CheckpointError::Storage(
            "built without the `sqlite` feature".into(),
        )),
    }
}
