use std::{
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use walkdir::{DirEntry, WalkDir};

use super::{DocumentStore, StoreError};
use crate::document::DocumentId;

/// Directory holding doclock's own files; never part of the managed set.
pub const STATE_DIR: &str = ".doclock";

/// Documents stored as files under a root directory.
///
/// The managed set is every regular file below `root` whose extension is in
/// `extensions`. Hidden directories (including `.doclock` and VCS metadata)
/// are not traversed. Writes go through a temporary file in the target's
/// directory that is renamed over the document, so a reader never sees a
/// half-written file.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    extensions: Vec<String>,
}

impl FsStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            root: root.into(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a user-supplied path to a document identifier.
    ///
    /// Relative paths are taken relative to the root. Absolute paths must
    /// point inside it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` for paths outside the root, without
    /// a managed extension, or that cannot form a valid identifier.
    pub fn document_id(&self, path: &Path) -> Result<DocumentId, StoreError> {
        let relative = if path.is_absolute() {
            let root = self
                .root
                .canonicalize()
                .map_err(|e| StoreError::io(self.root.display(), e))?;
            let target = canonicalize_lenient(path);
            target
                .strip_prefix(&root)
                .map(Path::to_path_buf)
                .map_err(|_| {
                    StoreError::InvalidPath(format!(
                        "'{}' is outside the managed root '{}'",
                        path.display(),
                        root.display()
                    ))
                })?
        } else {
            path.to_path_buf()
        };

        if !self.is_managed(&relative) {
            return Err(StoreError::InvalidPath(format!(
                "'{}' is not a managed document (extensions: {})",
                path.display(),
                self.extensions.join(", ")
            )));
        }

        DocumentId::from_relative_path(&relative).map_err(|e| StoreError::InvalidPath(e.to_string()))
    }

    fn is_managed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext.to_lowercase()))
    }
}

/// Canonicalize the parent so a not-yet-existing file still resolves.
fn canonicalize_lenient(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => parent
                .canonicalize()
                .map(|p| p.join(name))
                .unwrap_or_else(|_| path.to_path_buf()),
            _ => path.to_path_buf(),
        }
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

impl DocumentStore for FsStore {
    fn read(&self, id: &DocumentId) -> Result<String, StoreError> {
        let path = id.to_path(&self.root);
        std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(id.clone())
            } else {
                StoreError::io(path.display(), e)
            }
        })
    }

    fn write(&self, id: &DocumentId, content: &str) -> Result<(), StoreError> {
        let path = id.to_path(&self.root);
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::InvalidPath(id.to_string()))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir.display(), e))?;
        tmp.write_all(content.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io(tmp.path().display(), e))?;

        // The temp file is created 0600; an existing document keeps its mode.
        match std::fs::metadata(&path) {
            Ok(meta) => tmp
                .as_file()
                .set_permissions(meta.permissions())
                .map_err(|e| StoreError::io(path.display(), e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(path.display(), e)),
        }

        tmp.persist(&path)
            .map_err(|e| StoreError::io(path.display(), e.error))?;

        tracing::debug!(document = %id, bytes = content.len(), "document written");
        Ok(())
    }

    fn list(&self) -> Result<Vec<DocumentId>, StoreError> {
        let mut ids = Vec::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
        {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map_or_else(|| self.root.display().to_string(), |p| p.display().to_string());
                StoreError::io(path, e.into())
            })?;

            if !entry.file_type().is_file() || !self.is_managed(entry.path()) {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|_| StoreError::InvalidPath(entry.path().display().to_string()))?;
            match DocumentId::from_relative_path(relative) {
                Ok(id) => ids.push(id),
                Err(e) => tracing::warn!(path = %entry.path().display(), error = %e, "skipping unaddressable file"),
            }
        }

        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md() -> Vec<String> {
        vec!["md".to_string()]
    }

    #[test]
    fn test_list_filters_extensions_and_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("notes")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::create_dir_all(root.join(STATE_DIR)).unwrap();
        std::fs::write(root.join("notes/a.md"), "").unwrap();
        std::fs::write(root.join("b.MD"), "").unwrap();
        std::fs::write(root.join("c.txt"), "").unwrap();
        std::fs::write(root.join(".git/d.md"), "").unwrap();
        std::fs::write(root.join(STATE_DIR).join("e.md"), "").unwrap();

        let store = FsStore::new(root, &md());
        let ids: Vec<String> = store
            .list()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(ids, vec!["b.MD", "notes/a.md"]);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path(), &md());
        let id = DocumentId::parse("x.md").unwrap();

        store.write(&id, "hello").unwrap();
        assert_eq!(store.read(&id).unwrap(), "hello");
        store.write(&id, "again").unwrap();
        assert_eq!(store.read(&id).unwrap(), "again");
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path(), &md());
        let id = DocumentId::parse("missing.md").unwrap();
        assert!(matches!(store.read(&id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_document_id_for_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("notes")).unwrap();
        std::fs::write(dir.path().join("notes/a.md"), "").unwrap();
        let store = FsStore::new(dir.path(), &md());

        let relative = store.document_id(Path::new("notes/a.md")).unwrap();
        assert_eq!(relative.as_str(), "notes/a.md");

        let absolute = store
            .document_id(&dir.path().join("notes").join("a.md"))
            .unwrap();
        assert_eq!(absolute, relative);

        let outside = tempfile::tempdir().unwrap();
        assert!(store.document_id(&outside.path().join("x.md")).is_err());
        assert!(store.document_id(Path::new("notes/a.txt")).is_err());
    }
}
