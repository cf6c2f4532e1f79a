//! The trust boundary of the agent: command whitelisting, shell-injection
//! filtering, path confinement, and regex safety screening. Everything here
//! is pure, synchronous, and shares no mutable state; I/O happens only in
//! the collaborators that consume the verdicts.

pub mod defaults;
pub mod policy;
pub mod regex_guard;

pub use defaults::default_allowed_commands;
pub use policy::{EmptySandboxError, SecurityPolicy, Verdict};
pub use regex_guard::{
    MAX_LINE_LENGTH, MAX_PATTERN_LENGTH, PatternRejection, ScreenedPattern, screen_pattern,
};
