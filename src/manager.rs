use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::ManagerError;
use crate::filter::FileFilter;
use crate::report::{PurgeFailure, PurgeReport, SnapshotReport, StatusReport};

/// The whitelist captured by a snapshot, pinned to the directory it was
/// taken from. A whitelist captured for one directory must never apply to
/// another.
struct Snapshot {
    directory: PathBuf,
    names: HashSet<String>,
    taken_at: DateTime<Utc>,
}

/// Owns a target directory path and the whitelist of file names captured
/// from it.
///
/// Three operations: `set_directory` stores the path without touching the
/// filesystem, `snapshot` replaces the whitelist with the directory's
/// current files, and `purge_untracked` deletes every current file missing
/// from the whitelist. The whitelist lives only for the lifetime of this
/// value; nothing is persisted.
///
/// The directory is re-validated on every listing since it can change or
/// vanish between calls. Files appearing or disappearing between the
/// listing inside `purge_untracked` and the individual deletions are an
/// accepted race; such files surface as per-file failures, never as a
/// batch abort.
pub struct DirectorySnapshotManager {
    directory: PathBuf,
    snapshot: Option<Snapshot>,
    filter: FileFilter,
}

impl DirectorySnapshotManager {
    pub fn new(filter: FileFilter) -> Self {
        Self {
            directory: PathBuf::new(),
            snapshot: None,
            filter,
        }
    }

    /// Store the target path. No I/O happens here; an empty or bogus path
    /// is accepted and rejected later by the operations that need it.
    ///
    /// Switching to a different path drops the held snapshot: the purge
    /// capability is tied to a whitelist captured for the exact current
    /// path.
    pub fn set_directory<P: Into<PathBuf>>(&mut self, path: P) {
        let path = path.into();
        if path != self.directory {
            if self.snapshot.take().is_some() {
                tracing::debug!("Directory changed, dropping snapshot");
            }
            self.directory = path;
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// True iff a snapshot is held for the exact current path.
    pub fn has_snapshot(&self) -> bool {
        self.current_whitelist().is_some()
    }

    pub fn whitelist_len(&self) -> usize {
        self.current_whitelist().map_or(0, HashSet::len)
    }

    pub fn snapshot_taken_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot
            .as_ref()
            .filter(|s| s.directory == self.directory)
            .map(|s| s.taken_at)
    }

    fn current_whitelist(&self) -> Option<&HashSet<String>> {
        self.snapshot
            .as_ref()
            .filter(|s| s.directory == self.directory)
            .map(|s| &s.names)
    }

    /// Enumerate the regular files directly inside `path`, in no particular
    /// order. Subdirectories and symlinks to directories are excluded;
    /// symlinks to regular files count as files. Names the [`FileFilter`]
    /// rejects are left out, so snapshot and purge always agree on the
    /// visible universe.
    pub fn list_files(&self, path: &Path) -> Result<Vec<String>, ManagerError> {
        let meta = fs::metadata(path).map_err(|e| dir_error(path, e))?;
        if !meta.is_dir() {
            return Err(ManagerError::DirectoryNotFound(path.to_path_buf()));
        }

        let entries = fs::read_dir(path).map_err(|e| dir_error(path, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| dir_error(path, e))?;

            // Follow symlinks so a link to a regular file counts as a file
            // and a link to a directory does not. Broken links are skipped.
            match fs::metadata(entry.path()) {
                Ok(m) if m.is_file() => {}
                Ok(_) => continue,
                Err(err) => {
                    tracing::debug!("Skipping unreadable entry {:?}: {}", entry.path(), err);
                    continue;
                }
            }

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!("Skipping non UTF-8 file name: {:?}", raw);
                    continue;
                }
            };

            if self.filter.is_eligible(&name) {
                names.push(name);
            }
        }

        Ok(names)
    }

    /// List the current directory's files. Fails with `EmptyPath` when no
    /// directory has been set.
    pub fn list_current(&self) -> Result<Vec<String>, ManagerError> {
        if self.directory.as_os_str().is_empty() {
            return Err(ManagerError::EmptyPath);
        }
        self.list_files(&self.directory)
    }

    /// Capture the directory's current files as the new whitelist,
    /// replacing any previous one wholesale.
    ///
    /// Requires a non-empty, existing directory path; an empty or missing
    /// path fails with `InvalidDirectory`. On any failure the previous
    /// whitelist is left untouched. Calling twice with no filesystem change
    /// in between yields the same whitelist.
    pub fn snapshot(&mut self) -> Result<SnapshotReport, ManagerError> {
        if self.directory.as_os_str().is_empty() {
            return Err(ManagerError::InvalidDirectory(self.directory.clone()));
        }

        let directory = self.directory.clone();
        let names: HashSet<String> = match self.list_files(&directory) {
            Ok(list) => list.into_iter().collect(),
            Err(ManagerError::DirectoryNotFound(path)) => {
                return Err(ManagerError::InvalidDirectory(path));
            }
            Err(err) => return Err(err),
        };

        let taken_at = Utc::now();
        let file_count = names.len();
        self.snapshot = Some(Snapshot {
            directory: directory.clone(),
            names,
            taken_at,
        });

        tracing::info!(
            "Snapshot of {} captured {} file(s)",
            directory.display(),
            file_count
        );

        Ok(SnapshotReport {
            directory,
            file_count,
            taken_at,
        })
    }

    /// Delete every file currently in the directory whose name is not in
    /// the whitelist. Whitelisted files are never touched.
    ///
    /// A directory-level listing error aborts the operation; a per-file
    /// deletion failure is recorded and the batch continues. With no
    /// snapshot held for the current path the whitelist is empty and every
    /// current file is a candidate, so callers should gate this behind a
    /// warning (the interactive session does).
    pub fn purge_untracked(&mut self) -> Result<PurgeReport, ManagerError> {
        if self.directory.as_os_str().is_empty() {
            return Err(ManagerError::EmptyPath);
        }

        let directory = self.directory.clone();
        let current = self.list_files(&directory)?;

        let empty = HashSet::new();
        let whitelist = self.current_whitelist().unwrap_or(&empty);

        let mut deleted = 0;
        let mut failures = Vec::new();
        for name in current {
            if whitelist.contains(&name) {
                continue;
            }

            match fs::remove_file(directory.join(&name)) {
                Ok(()) => {
                    tracing::debug!("Deleted {}", name);
                    deleted += 1;
                }
                Err(err) => {
                    tracing::warn!("Failed to delete {}: {}", name, err);
                    failures.push(PurgeFailure {
                        name,
                        kind: err.kind().into(),
                    });
                }
            }
        }

        tracing::info!(
            "Purge of {} deleted {} file(s), {} failure(s)",
            directory.display(),
            deleted,
            failures.len()
        );

        Ok(PurgeReport {
            directory,
            deleted,
            failures,
            suppressed_failures: 0,
        })
    }

    /// Compare the directory against the whitelist without deleting
    /// anything. `untracked` is exactly the candidate set a purge would
    /// attempt right now.
    pub fn status(&self) -> Result<StatusReport, ManagerError> {
        if self.directory.as_os_str().is_empty() {
            return Err(ManagerError::EmptyPath);
        }

        let directory = self.directory.clone();
        let current: HashSet<String> = self.list_files(&directory)?.into_iter().collect();

        let empty = HashSet::new();
        let whitelist = self.current_whitelist().unwrap_or(&empty);

        let mut untracked: Vec<String> = current.difference(whitelist).cloned().collect();
        let mut missing: Vec<String> = whitelist.difference(&current).cloned().collect();
        untracked.sort();
        missing.sort();

        Ok(StatusReport {
            directory,
            tracked: current.intersection(whitelist).count(),
            untracked,
            missing,
            snapshot_taken_at: self.snapshot_taken_at(),
        })
    }
}

fn dir_error(path: &Path, err: io::Error) -> ManagerError {
    match err.kind() {
        io::ErrorKind::NotFound => ManagerError::DirectoryNotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => ManagerError::PermissionDenied(path.to_path_buf()),
        _ => ManagerError::Io {
            path: path.to_path_buf(),
            source: err,
        },
    }
}
