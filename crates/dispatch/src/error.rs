use std::path::PathBuf;

use turntable_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Worker pool closed before all commands were submitted")]
    PoolClosed,

    #[error("Worker task was lost: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Failed to write report {}: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}
