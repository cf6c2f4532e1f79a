mod command;
mod path;
mod types;

pub use types::{EmptySandboxError, Verdict};

use std::path::{Path, PathBuf};

/// Security policy enforced on every remote tool invocation. Pure and
/// immutable after construction, so one instance is shared across concurrent
/// request handlers without locking.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    pub allowed_commands: Vec<String>,
    pub allowed_roots: Vec<PathBuf>,
}

/// A token is treated as a path argument when it does not look like a flag
/// and carries any path shape: absolute, explicitly relative, or containing a
/// separator.
fn is_path_like(token: &str) -> bool {
    !token.starts_with('-')
        && (token.starts_with('/') || token.starts_with('.') || token.contains('/'))
}

impl SecurityPolicy {
    /// A policy with zero allowed roots would deny everything while looking
    /// configured; refuse to construct one instead.
    pub fn new(
        allowed_commands: Vec<String>,
        allowed_roots: Vec<PathBuf>,
    ) -> Result<Self, EmptySandboxError> {
        if allowed_roots.is_empty() {
            return Err(EmptySandboxError);
        }
        Ok(Self {
            allowed_commands,
            allowed_roots,
        })
    }

    /// Full validation of one command line: whitelist, injection scan,
    /// working-directory confinement, then confinement of every path-like
    /// argument. Short-circuits on the first denial; for arguments, the
    /// first offending one wins.
    pub fn validate_command(&self, command: &str, cwd: Option<&Path>) -> Verdict {
        let verdict = self.check_whitelist(command);
        if !verdict.is_permitted() {
            return verdict;
        }

        let verdict = Self::check_injection(command);
        if !verdict.is_permitted() {
            return verdict;
        }

        if let Some(cwd) = cwd {
            let verdict = self.confine_path(&cwd.to_string_lossy(), None);
            if !verdict.is_permitted() {
                return verdict;
            }
        }

        for token in command.split_whitespace().skip(1) {
            if is_path_like(token) {
                let verdict = self.confine_path(token, cwd);
                if !verdict.is_permitted() {
                    return verdict;
                }
            }
        }

        Verdict::Permitted
    }
}

#[cfg(test)]
mod tests;
