use std::path::{Component, Path, PathBuf};

use super::SecurityPolicy;
use super::types::Verdict;

/// Lexically resolve `.` and `..` segments without touching the filesystem.
/// Must run AFTER the caller path has been joined onto its base: `..`
/// segments are exactly how escape attempts are smuggled in, so a
/// pre-normalized caller string is never trusted.
pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            // Popping at the root is a no-op, so `/..` stays `/`.
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl SecurityPolicy {
    /// Resolve `target` (relative to `base`, defaulting to the process
    /// working directory) and check containment within the allowed roots.
    ///
    /// A path is inside a root only when it equals the root or is a strict
    /// subdirectory of it; the comparison is component-aware, so `/data/ok2`
    /// is not inside `/data/ok`.
    pub fn confine_path(&self, target: &str, base: Option<&Path>) -> Verdict {
        // Null bytes can truncate paths in C-backed syscalls.
        if target.contains('\0') {
            return Verdict::deny("path contains a null byte");
        }

        let candidate = Path::new(target);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            let base = match base {
                Some(base) => base.to_path_buf(),
                None => match std::env::current_dir() {
                    Ok(dir) => dir,
                    Err(err) => {
                        return Verdict::deny(format!(
                            "cannot resolve relative path '{target}': {err}"
                        ));
                    }
                },
            };
            base.join(candidate)
        };

        let resolved = normalize_lexically(&joined);
        for root in &self.allowed_roots {
            let root = normalize_lexically(root);
            if resolved.starts_with(&root) {
                return Verdict::Permitted;
            }
        }

        Verdict::deny(format!(
            "path '{}' is outside the sandbox (allowed roots: {})",
            resolved.display(),
            self.allowed_roots
                .iter()
                .map(|r| r.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }
}
