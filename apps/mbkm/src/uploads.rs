//! # Uploaded File Cleanup
//!
//! Deleting a registration or replacing its report leaves stored file
//! references behind. They are removed here, best-effort: a failure is
//! logged and never fails the request that triggered it.

use std::path::{Component, Path, PathBuf};

/// Resolve a stored reference under `root`.
///
/// Only plain relative paths are accepted. Absolute paths and `..`
/// components yield `None`, so a reference can never leave the uploads
/// directory.
pub fn resolve(root: &Path, reference: &str) -> Option<PathBuf> {
    let relative = Path::new(reference.trim());
    if relative.as_os_str().is_empty() {
        return None;
    }
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

/// Remove every reference under `root`. Returns the number of files removed.
pub async fn remove_files(root: &Path, references: &[String]) -> usize {
    let mut removed = 0;
    for reference in references {
        let Some(path) = resolve(root, reference) else {
            tracing::warn!(
                event = "file_cleanup_skipped",
                reference = %reference,
                "Refusing to remove file outside the uploads directory"
            );
            continue;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(event = "file_removed", path = %path.display(), "Removed stored file");
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Stored file {:?} already gone", path);
            }
            Err(e) => {
                tracing::warn!(
                    event = "file_cleanup_failed",
                    path = %path.display(),
                    error = %e,
                    "Could not remove stored file"
                );
            }
        }
    }
    removed
}
