use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for guardpost.
///
/// Each subsystem defines its own error variant. Validation denials are NOT
/// errors — they travel as `security::Verdict` values; only faults that
/// prevent an operation from completing end up here.
#[derive(Debug, Error)]
pub enum GuardError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Process manager ──────────────────────────────────────────────────
    #[error("process: {0}")]
    Process(#[from] crate::process::ProcessError),

    // ── Gateway ──────────────────────────────────────────────────────────
    #[error("gateway: {0}")]
    Gateway(#[from] GatewayError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Gateway errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to bind {addr}: {message}")]
    Bind { addr: String, message: String },

    #[error("server error: {0}")]
    Serve(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, GuardError>;
