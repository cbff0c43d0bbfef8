use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Browsing context lost: {0}")]
    ContextLost(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Timed out after {ms}ms waiting for {what}")]
    Timeout { what: String, ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl ScanError {
    /// Only the loss of the browsing context ends a run; everything else
    /// becomes a failed row.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::ContextLost(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ScanError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
