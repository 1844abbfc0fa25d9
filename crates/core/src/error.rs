use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata table is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("Malformed metadata row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl CoreError {
    /// Wrap an I/O error together with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
