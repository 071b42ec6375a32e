//! Path validation: filesystem sandboxing to the working root.
//!
//! A path supplied by the model is joined onto the working root, canonicalized
//! (symlinks and `..` resolved) and accepted only when the result is the root
//! itself or lies beneath it. Containment is decided on path components, so a
//! root of `/work` never admits `/work2`.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use agentbox_core::tool::WorkingRoot;
use tracing::debug;

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("Path '{path}' is outside the working directory")]
    OutsideRoot { path: String },

    #[error("Failed to canonicalize path '{path}': {reason}")]
    CanonicalizeFailed { path: String, reason: String },
}

/// Resolve `relative` against `root` and check it stays inside.
///
/// Returns the canonical absolute path on success. The target does not have
/// to exist: the existing part of the path is canonicalized through the
/// filesystem and the missing tail is appended lexically, which is what a
/// write to a new file needs. An absolute `relative` replaces the root as the
/// join base, exactly as [`Path::join`] does, and is then judged like any
/// other path.
pub fn resolve(root: &WorkingRoot, relative: &str) -> Result<PathBuf, PathValidationError> {
    let canonical_root =
        root.path()
            .canonicalize()
            .map_err(|e| PathValidationError::CanonicalizeFailed {
                path: root.path().display().to_string(),
                reason: e.to_string(),
            })?;

    let target = canonicalize_lenient(&canonical_root.join(relative), relative)?;

    // Component-wise ancestor test (not a string prefix).
    if target.starts_with(&canonical_root) {
        Ok(target)
    } else {
        debug!(path = %relative, resolved = %target.display(), "Rejected path outside working root");
        Err(PathValidationError::OutsideRoot {
            path: relative.into(),
        })
    }
}

/// Canonicalize `path` one component at a time.
///
/// Every prefix that exists on disk is replaced by its canonical form, so a
/// symlink anywhere along the way is followed before the next component is
/// applied. Once a component is missing, the rest is normalized lexically.
fn canonicalize_lenient(path: &Path, original: &str) -> Result<PathBuf, PathValidationError> {
    let mut resolved = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                resolved.push(name);
                match std::fs::symlink_metadata(&resolved) {
                    Ok(_) => {
                        // Dangling symlinks fail here and are refused.
                        resolved = resolved.canonicalize().map_err(|e| {
                            PathValidationError::CanonicalizeFailed {
                                path: original.into(),
                                reason: e.to_string(),
                            }
                        })?;
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(PathValidationError::CanonicalizeFailed {
                            path: original.into(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    Ok(resolved)
}
