//! Error types for file serving.
//!
//! Every variant is raised before the response is committed, so the caller
//! can still answer with a proper error status. Read failures after that
//! point are reported as [`crate::service::ServeOutcome::Failed`].

use std::path::PathBuf;

/// Failure while preparing or streaming a file response.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Request inputs were unusable (empty path, empty filename, bad directives).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The file is missing, not a regular file, or cannot be opened.
    #[error("{} is not readable: {source}", path.display())]
    NotReadable {
        /// Path that was probed.
        path: PathBuf,
        /// Error reported by the probe.
        source: std::io::Error,
    },

    /// The requested range starts at or beyond the end of the file.
    #[error("Range not satisfiable for {size} byte file")]
    RangeNotSatisfiable {
        /// Current file size, echoed in `Content-Range: bytes */{size}`.
        size: u64,
    },
}

impl ServeError {
    /// Map this error to an HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotReadable { source, .. } => {
                if source.kind() == std::io::ErrorKind::PermissionDenied {
                    403
                } else {
                    404
                }
            }
            Self::RangeNotSatisfiable { .. } => 416,
        }
    }
}
