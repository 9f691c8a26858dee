use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Errors that abort a whole snapshot or purge operation.
///
/// Per-file deletion failures during a purge are not errors at this level;
/// they are collected as [`FailureKind`] entries in the purge report so a
/// single bad file cannot abort the batch.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The path does not exist or is not a directory at scan time.
    #[error("directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// The directory exists but cannot be read.
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// An empty or nonexistent path was supplied to `snapshot`.
    #[error("invalid directory path: '{}'", .0.display())]
    InvalidDirectory(PathBuf),

    /// An empty path was supplied to `purge` or `status`.
    #[error("no directory path set")]
    EmptyPath,

    /// Any other I/O failure while scanning the directory.
    #[error("i/o error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ManagerError {
    /// Stable machine-readable tag, used by the JSON output mode.
    pub fn kind_str(&self) -> &'static str {
        match self {
            ManagerError::DirectoryNotFound(_) => "directory_not_found",
            ManagerError::PermissionDenied(_) => "permission_denied",
            ManagerError::InvalidDirectory(_) => "invalid_directory",
            ManagerError::EmptyPath => "empty_path",
            ManagerError::Io { .. } => "io",
        }
    }
}

/// Why a single file could not be deleted during a purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The file vanished between listing and removal.
    NotFound,
    PermissionDenied,
    Other,
}

impl FailureKind {
    /// Human-readable form for text output.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "not found",
            FailureKind::PermissionDenied => "permission denied",
            FailureKind::Other => "i/o error",
        }
    }

    /// Machine-readable tag, matching the serde serialization.
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "not_found",
            FailureKind::PermissionDenied => "permission_denied",
            FailureKind::Other => "other",
        }
    }
}

impl From<io::ErrorKind> for FailureKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => FailureKind::NotFound,
            io::ErrorKind::PermissionDenied => FailureKind::PermissionDenied,
            _ => FailureKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_from_io() {
        assert_eq!(
            FailureKind::from(io::ErrorKind::NotFound),
            FailureKind::NotFound
        );
        assert_eq!(
            FailureKind::from(io::ErrorKind::PermissionDenied),
            FailureKind::PermissionDenied
        );
        assert_eq!(
            FailureKind::from(io::ErrorKind::Interrupted),
            FailureKind::Other
        );
    }

    #[test]
    fn test_error_kind_tags() {
        assert_eq!(ManagerError::EmptyPath.kind_str(), "empty_path");
        assert_eq!(
            ManagerError::DirectoryNotFound(PathBuf::from("/missing")).kind_str(),
            "directory_not_found"
        );
    }
}
