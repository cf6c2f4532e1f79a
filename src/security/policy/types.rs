use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of a single validation check.
///
/// Denials are ordinary values, never errors: every check completes and the
/// orchestrator (or the gateway) decides what to do with the reason string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "lowercase")]
pub enum Verdict {
    Permitted,
    Denied(String),
}

impl Verdict {
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Denied(reason.into())
    }

    pub fn is_permitted(&self) -> bool {
        matches!(self, Self::Permitted)
    }

    /// The denial reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Permitted => None,
            Self::Denied(reason) => Some(reason),
        }
    }
}

/// Raised at construction time when the policy would have no allowed roots.
/// Running without path confinement is the one unacceptable failure mode, so
/// this is fatal rather than a per-request denial.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("sandbox allow-list is empty; refusing to run without path confinement")]
pub struct EmptySandboxError;
