use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::FailureKind;

/// Result of a successful snapshot: the whitelist was replaced wholesale.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    pub directory: PathBuf,
    pub file_count: usize,
    pub taken_at: DateTime<Utc>,
}

/// One file that could not be deleted during a purge.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeFailure {
    pub name: String,
    pub kind: FailureKind,
}

/// Result of a purge. `deleted` counts successful removals; `failures`
/// lists every file the purge attempted but could not remove.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeReport {
    pub directory: PathBuf,
    pub deleted: usize,
    pub failures: Vec<PurgeFailure>,
    /// Failures dropped from `failures` by the reporting cap. The files were
    /// still attempted; only their entries are suppressed.
    pub suppressed_failures: usize,
}

impl PurgeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.suppressed_failures == 0
    }

    /// Keep at most `max` failure entries (0 = unlimited).
    pub fn cap_failures(&mut self, max: usize) {
        if max > 0 && self.failures.len() > max {
            self.suppressed_failures = self.failures.len() - max;
            self.failures.truncate(max);
        }
    }
}

/// Read-only view of the directory against the current whitelist.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub directory: PathBuf,
    /// Files present both on disk and in the whitelist.
    pub tracked: usize,
    /// Files on disk but not in the whitelist; a purge would delete these.
    pub untracked: Vec<String>,
    /// Whitelisted files no longer present on disk.
    pub missing: Vec<String>,
    pub snapshot_taken_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(name: &str) -> PurgeFailure {
        PurgeFailure {
            name: name.to_string(),
            kind: FailureKind::PermissionDenied,
        }
    }

    #[test]
    fn test_cap_failures() {
        let mut report = PurgeReport {
            directory: PathBuf::from("/tmp/d"),
            deleted: 1,
            failures: vec![failure("a"), failure("b"), failure("c")],
            suppressed_failures: 0,
        };

        report.cap_failures(2);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.suppressed_failures, 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_cap_zero_is_unlimited() {
        let mut report = PurgeReport {
            directory: PathBuf::from("/tmp/d"),
            deleted: 0,
            failures: vec![failure("a")],
            suppressed_failures: 0,
        };

        report.cap_failures(0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.suppressed_failures, 0);
    }
}
