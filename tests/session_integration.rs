use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use tempfile::TempDir;

use dirsnap::cli::OutputFormat;
use dirsnap::config::DirsnapConfig;
use dirsnap::session::{Session, SessionOptions};
use dirsnap::{DirectorySnapshotManager, FileFilter, ManagerError};

fn write_files(dir: &Path, names: &[&str]) {
    for name in names {
        fs::write(dir.join(name), "contents").expect("Failed to write test file");
    }
}

fn names_on_disk(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("Failed to read dir")
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

fn manager_for(dir: &Path) -> DirectorySnapshotManager {
    let mut manager = DirectorySnapshotManager::new(FileFilter::permissive());
    manager.set_directory(dir);
    manager
}

#[test]
fn test_snapshot_then_added_file_is_purged() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_files(temp_dir.path(), &["a.txt", "b.txt"]);

    let mut manager = manager_for(temp_dir.path());
    let report = manager.snapshot().expect("Snapshot failed");
    assert_eq!(report.file_count, 2);

    write_files(temp_dir.path(), &["c.txt"]);

    let report = manager.purge_untracked().expect("Purge failed");
    assert_eq!(report.deleted, 1);
    assert!(report.failures.is_empty());
    assert_eq!(names_on_disk(temp_dir.path()), vec!["a.txt", "b.txt"]);
}

#[test]
fn test_repeated_snapshots_are_stable() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_files(temp_dir.path(), &["one.log", "two.log", "three.log"]);

    let mut manager = manager_for(temp_dir.path());
    for _ in 0..3 {
        let report = manager.snapshot().expect("Snapshot failed");
        assert_eq!(report.file_count, 3);
    }

    // An unchanged directory purges to nothing.
    let report = manager.purge_untracked().expect("Purge failed");
    assert_eq!(report.deleted, 0);
    assert_eq!(names_on_disk(temp_dir.path()).len(), 3);
}

#[test]
fn test_purge_on_missing_directory_deletes_nothing() {
    let mut manager = DirectorySnapshotManager::new(FileFilter::permissive());
    manager.set_directory("/no/such/directory/anywhere");

    match manager.purge_untracked() {
        Err(ManagerError::DirectoryNotFound(path)) => {
            assert_eq!(path, Path::new("/no/such/directory/anywhere"));
        }
        other => panic!("Expected DirectoryNotFound, got {:?}", other.map(|r| r.deleted)),
    }
}

#[test]
fn test_snapshot_on_empty_path_is_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_files(temp_dir.path(), &["a.txt"]);

    let mut manager = manager_for(temp_dir.path());
    manager.snapshot().expect("Snapshot failed");

    manager.set_directory("");
    assert!(matches!(
        manager.snapshot(),
        Err(ManagerError::InvalidDirectory(_))
    ));
}

#[test]
fn test_extension_scoped_purge() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_files(temp_dir.path(), &["report.pdf", "build.tmp"]);

    let filter = FileFilter::new(false, Some(vec!["tmp".to_string()]), &[]).unwrap();
    let mut manager = DirectorySnapshotManager::new(filter);
    manager.set_directory(temp_dir.path());

    let report = manager.snapshot().expect("Snapshot failed");
    assert_eq!(report.file_count, 1);

    write_files(temp_dir.path(), &["later.tmp", "notes.md"]);

    let report = manager.purge_untracked().expect("Purge failed");
    assert_eq!(report.deleted, 1);

    // Only the new .tmp file is gone; everything outside the extension
    // scope was never considered.
    assert_eq!(
        names_on_disk(temp_dir.path()),
        vec!["build.tmp", "notes.md", "report.pdf"]
    );
}

#[test]
fn test_piped_json_session() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_files(temp_dir.path(), &["a.txt", "b.txt"]);

    let script = format!(
        "dir {}\nsnapshot\npurge\nquit\n",
        temp_dir.path().display()
    );
    let mut out = Vec::new();
    let running = AtomicBool::new(true);

    let manager = DirectorySnapshotManager::new(FileFilter::permissive());
    let mut session = Session::new(
        manager,
        DirsnapConfig::default(),
        SessionOptions {
            output: OutputFormat::Json,
            ..Default::default()
        },
    );
    session
        .run(script.as_bytes(), &mut out, &running)
        .expect("Session failed");

    let output = String::from_utf8(out).expect("Output was not UTF-8");
    let lines: Vec<serde_json::Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).expect("Invalid JSON line"))
        .collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["command"], "dir");
    assert_eq!(lines[1]["command"], "snapshot");
    assert_eq!(lines[1]["report"]["file_count"], 2);
    assert_eq!(lines[2]["command"], "purge");
    assert_eq!(lines[2]["report"]["deleted"], 0);

    assert_eq!(names_on_disk(temp_dir.path()), vec!["a.txt", "b.txt"]);
}

#[test]
fn test_session_survives_directory_vanishing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let doomed = temp_dir.path().join("doomed");
    fs::create_dir(&doomed).unwrap();
    write_files(&doomed, &["a.txt"]);

    let mut manager = manager_for(&doomed);
    manager.snapshot().expect("Snapshot failed");

    fs::remove_file(doomed.join("a.txt")).unwrap();
    fs::remove_dir(&doomed).unwrap();

    // The directory vanished between operations; the purge reports it and
    // the session keeps going.
    assert!(matches!(
        manager.purge_untracked(),
        Err(ManagerError::DirectoryNotFound(_))
    ));

    fs::create_dir(&doomed).unwrap();
    write_files(&doomed, &["b.txt"]);
    let report = manager.purge_untracked().expect("Purge failed");
    assert_eq!(report.deleted, 1, "b.txt was never whitelisted");
}

#[cfg(unix)]
#[test]
fn test_partial_failure_reports_per_file() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_files(temp_dir.path(), &["a.txt", "b.txt", "c.txt"]);

    let mut manager = manager_for(temp_dir.path());

    fs::set_permissions(temp_dir.path(), fs::Permissions::from_mode(0o555)).unwrap();
    let report = manager.purge_untracked().expect("Purge failed");
    fs::set_permissions(temp_dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

    // Every candidate was attempted despite the failures.
    assert_eq!(report.deleted, 0);
    assert_eq!(report.failures.len(), 3);
    assert!(report
        .failures
        .iter()
        .all(|f| f.kind == dirsnap::FailureKind::PermissionDenied));
}
