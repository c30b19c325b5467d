//! Document identifiers

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Stable identifier of a managed document.
///
/// A normalized, relative, `/`-separated path inside the managed root. It
/// never starts with `/`, never contains `.` or `..` components, and is the
/// same on every machine regardless of the platform's path separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    /// Parse and normalize a document identifier.
    ///
    /// Backslashes are treated as separators, `.` components and repeated
    /// separators are dropped.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidIdentifier` if the path is empty, absolute,
    /// escapes the root with `..`, or contains a NUL byte.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.contains('\0') {
            return Err(Error::InvalidIdentifier(format!(
                "document path {raw:?} contains a NUL byte"
            )));
        }

        let unified = raw.replace('\\', "/");
        if unified.starts_with('/') {
            return Err(Error::InvalidIdentifier(format!(
                "document path '{raw}' must be relative to the managed root"
            )));
        }

        let mut parts = Vec::new();
        for part in unified.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    return Err(Error::InvalidIdentifier(format!(
                        "document path '{raw}' escapes the managed root"
                    )))
                }
                other => parts.push(other),
            }
        }

        if parts.is_empty() {
            return Err(Error::InvalidIdentifier(
                "document path cannot be empty".to_string(),
            ));
        }

        Ok(Self(parts.join("/")))
    }

    /// Build an identifier from a path relative to the managed root.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidIdentifier` for absolute paths, `..` components
    /// or non-UTF-8 names.
    pub fn from_relative_path(path: &Path) -> Result<Self> {
        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(name) => {
                    let name = name.to_str().ok_or_else(|| {
                        Error::InvalidIdentifier(format!(
                            "document path '{}' is not valid UTF-8",
                            path.display()
                        ))
                    })?;
                    parts.push(name);
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::InvalidIdentifier(format!(
                        "document path '{}' must stay inside the managed root",
                        path.display()
                    )))
                }
            }
        }
        Self::parse(&parts.join("/"))
    }

    /// Get the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve this identifier against a root directory.
    #[must_use]
    pub fn to_path(&self, root: &Path) -> PathBuf {
        self.0
            .split('/')
            .fold(root.to_path_buf(), |path, part| path.join(part))
    }
}

impl std::str::FromStr for DocumentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_separators() {
        let id = DocumentId::parse("./notes//2026\\today.md").unwrap();
        assert_eq!(id.as_str(), "notes/2026/today.md");
    }

    #[test]
    fn test_parse_rejects_escape_and_absolute() {
        assert!(DocumentId::parse("../secrets.md").is_err());
        assert!(DocumentId::parse("notes/../../x.md").is_err());
        assert!(DocumentId::parse("/etc/passwd").is_err());
        assert!(DocumentId::parse("").is_err());
        assert!(DocumentId::parse("./").is_err());
    }

    #[test]
    fn test_from_relative_path() {
        let id = DocumentId::from_relative_path(Path::new("decisions/adr-1.md")).unwrap();
        assert_eq!(id.as_str(), "decisions/adr-1.md");
        assert!(DocumentId::from_relative_path(Path::new("../x.md")).is_err());
    }

    #[test]
    fn test_to_path_joins_components() {
        let id = DocumentId::parse("a/b.md").unwrap();
        assert_eq!(
            id.to_path(Path::new("/root")),
            Path::new("/root").join("a").join("b.md")
        );
    }
}
