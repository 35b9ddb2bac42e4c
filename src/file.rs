//! File snapshot module
//!
//! Takes the one-time metadata snapshot a request is served from.

use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Immutable view of a file taken at request start
///
/// If the file changes while it is being streamed, what the client receives
/// is undefined; a file that shrinks ends the stream early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub readable: bool,
}

impl FileDescriptor {
    /// Probe `path` and snapshot its metadata
    ///
    /// The file counts as readable only if it is a regular file that can be
    /// opened for reading. Errors from the open are returned as-is so the
    /// caller can tell missing files from permission problems.
    pub async fn probe(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a regular file", path.display()),
            ));
        }

        // Opening is the only reliable readability check; the handle is
        // released straight away and reopened by the stream writer.
        drop(fs::File::open(path).await?);

        let modified = metadata
            .modified()
            .map_or_else(|_| DateTime::<Utc>::UNIX_EPOCH, DateTime::<Utc>::from);

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified,
            readable: true,
        })
    }
}
