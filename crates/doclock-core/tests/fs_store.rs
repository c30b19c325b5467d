//! Coordinator over real files in a temporary directory

use std::path::Path;

use doclock_core::{
    AgentId, Config, Coordinator, DocumentStore, FsStore, LockClass, LockStatus, StoreError,
};

fn agent(id: &str) -> AgentId {
    AgentId::new(id).unwrap()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn store(root: &Path) -> FsStore {
    FsStore::new(root, &Config::default().extensions)
}

#[test]
fn test_checkout_rewrites_file_in_place() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "specs/api.md", "---\nstatus: available\n---\n# API\n");

    let fs = store(dir.path());
    let id = fs.document_id(Path::new("specs/api.md")).unwrap();
    let c = Coordinator::new(fs, Config::default().rules());

    c.checkout(&id, &agent("a1")).unwrap();

    let content = std::fs::read_to_string(dir.path().join("specs/api.md")).unwrap();
    assert!(content.contains("locked_by: a1"));
    assert!(content.contains("status: editing"));
    assert!(content.ends_with("---\n# API\n"));

    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("specs"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1, "temporary files left behind: {leftovers:?}");
}

#[test]
fn test_init_then_scan() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.md", "# A\n");
    write(dir.path(), "b.md", "---\ntitle: B\n---\n# B\n");
    write(dir.path(), "notes.txt", "not managed");
    write(dir.path(), ".doclock/config.toml", "");

    let fs = store(dir.path());
    let c = Coordinator::new(fs, Config::default().rules());

    let before = c.scan().unwrap();
    assert_eq!(before.summary.skipped, 2);

    for id in c.store().list().unwrap() {
        assert!(c.init(&id, &agent("setup")).unwrap().created);
    }

    let after = c.scan().unwrap();
    assert_eq!(after.summary.total, 2);
    assert_eq!(after.summary.available, 2);
    assert!(after.entries.iter().all(|e| e.class == LockClass::Available));

    let b = std::fs::read_to_string(dir.path().join("b.md")).unwrap();
    assert!(b.starts_with("---\ntitle: B\n"));
    assert!(b.ends_with("---\n# B\n"));
}

#[test]
fn test_missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let fs = store(dir.path());
    let id = fs.document_id(Path::new("ghost.md")).unwrap();
    let c = Coordinator::new(fs, Config::default().rules());

    let err = c.status(&id).unwrap_err();
    assert!(matches!(
        err,
        doclock_core::Error::Store(StoreError::NotFound(_))
    ));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn test_review_round_trip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "doc.md", "---\nstatus: available\n---\n");
    let fs = store(dir.path());
    let id = fs.document_id(&dir.path().join("doc.md")).unwrap();
    let c = Coordinator::new(fs, Config::default().rules());

    c.checkout(&id, &agent("writer")).unwrap();
    let result = c.checkin_for_review(&id, &agent("writer")).unwrap();
    assert_eq!(result.status, LockStatus::Review);

    c.checkout(&id, &agent("reviewer")).unwrap();
    assert_eq!(
        c.status(&id).unwrap().locked_by(),
        Some(&agent("reviewer"))
    );
}

#[cfg(unix)]
#[test]
fn test_lock_changes_keep_file_mode() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "shared.md", "---\nstatus: available\n---\n# Shared\n");
    let path = dir.path().join("shared.md");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

    let fs = store(dir.path());
    let id = fs.document_id(Path::new("shared.md")).unwrap();
    let c = Coordinator::new(fs, Config::default().rules());

    c.checkout(&id, &agent("a1")).unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o644);

    c.force_unlock(&id, &agent("ops"), "host died").unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o644);
}

#[test]
fn test_bom_prefixed_document_is_managed() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "bom.md", "\u{feff}---\ntitle: B\nstatus: available\n---\n# B\n");
    let fs = store(dir.path());
    let id = fs.document_id(Path::new("bom.md")).unwrap();
    let c = Coordinator::new(fs, Config::default().rules());

    assert!(!c.init(&id, &agent("setup")).unwrap().created);
    c.checkout(&id, &agent("a1")).unwrap();

    let content = std::fs::read_to_string(dir.path().join("bom.md")).unwrap();
    assert_eq!(content.matches("status:").count(), 1);
    assert!(content.contains("status: editing"));
}
