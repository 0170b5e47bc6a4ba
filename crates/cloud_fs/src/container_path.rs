//! Container-relative path validation and resolution
//!
//! Purely lexical: existence checks belong to the operation layer. A
//! relative path is valid when it stays strictly inside the container
//! root after normalization.

use crate::error::{CloudError, Result};
use std::path::{Component, Path, PathBuf};

/// Validate a client-supplied relative path.
///
/// Rejects the empty string, absolute paths, and any traversal that
/// would escape the container root. `.` components are dropped; a bare
/// `"."` addresses the root itself.
pub fn validate_relative(relative: &str) -> Result<PathBuf> {
    if relative.is_empty() {
        return Err(CloudError::file_access("empty path"));
    }

    let path = Path::new(relative);
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(CloudError::file_access(format!(
                        "path escapes container root: {}",
                        relative
                    )));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(CloudError::file_access(format!(
                    "absolute path not allowed: {}",
                    relative
                )));
            }
        }
    }

    Ok(normalized)
}

/// Resolve a relative path against the container root
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf> {
    let normalized = validate_relative(relative)?;
    Ok(root.join(normalized))
}

/// Build the container-relative path string for a child of `relative_dir`
pub fn child_relative(relative_dir: &Path, name: &str) -> String {
    if relative_dir.as_os_str().is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", relative_dir.display(), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_plain_paths_resolve_under_root() {
        let root = Path::new("/containers/notes");
        assert_eq!(
            resolve(root, "a/b.txt").unwrap(),
            PathBuf::from("/containers/notes/a/b.txt")
        );
        assert_eq!(resolve(root, ".").unwrap(), PathBuf::from("/containers/notes"));
    }

    #[test]
    fn test_empty_path_rejected() {
        let err = validate_relative("").unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileAccessFailed);
    }

    #[test]
    fn test_absolute_path_rejected() {
        let err = validate_relative("/etc/passwd").unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileAccessFailed);
    }

    #[test]
    fn test_traversal_escape_rejected() {
        assert!(validate_relative("..").is_err());
        assert!(validate_relative("../sibling").is_err());
        assert!(validate_relative("a/../../escape").is_err());
    }

    #[test]
    fn test_internal_traversal_normalizes() {
        assert_eq!(
            validate_relative("a/b/../c.txt").unwrap(),
            PathBuf::from("a/c.txt")
        );
        assert_eq!(validate_relative("./a/./b").unwrap(), PathBuf::from("a/b"));
    }

    #[test]
    fn test_resolved_paths_are_descendants() {
        let root = Path::new("/containers/notes");
        for relative in ["a", "a/b", "deep/tree/file.bin", "x/../y"] {
            let resolved = resolve(root, relative).unwrap();
            assert!(resolved.starts_with(root), "{:?} escaped root", resolved);
            assert_ne!(resolved, root);
        }
    }

    #[test]
    fn test_child_relative_joins_with_slash() {
        assert_eq!(child_relative(Path::new("notes"), "a.txt"), "notes/a.txt");
        assert_eq!(child_relative(Path::new(""), "a.txt"), "a.txt");
    }
}
