//! PM2 process-manager client.
//!
//! All operations shell out to the `pm2` binary with a bounded timeout and
//! parse its JSON output. The daemon connection is an explicit handle owned
//! by this client, acquired lazily on first use via a `pm2 ping` probe — not
//! a module-level flag.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;

/// Timeout for any single pm2 invocation.
const PM2_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("pm2 daemon unreachable: {0}")]
    Unreachable(String),

    #[error("process name '{0}' contains characters outside [A-Za-z0-9._-]")]
    InvalidName(String),

    #[error("process '{0}' not found")]
    NotFound(String),

    #[error("pm2 {action} failed: {message}")]
    CommandFailed { action: String, message: String },

    #[error("unexpected pm2 output: {0}")]
    Malformed(String),
}

/// Lifecycle actions a caller may request on a managed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessAction {
    Start,
    Stop,
    Restart,
}

impl ProcessAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

/// Snapshot of one managed process as reported by `pm2 jlist`.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    pub name: String,
    pub status: String,
    pub memory_bytes: u64,
    pub cpu_percent: f64,
    pub uptime_ms: u64,
    pub restarts: u64,
    pub out_log_path: Option<String>,
    pub err_log_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Pm2Row {
    name: String,
    #[serde(default)]
    monit: Pm2Monit,
    pm2_env: Pm2Env,
}

#[derive(Debug, Default, Deserialize)]
struct Pm2Monit {
    #[serde(default)]
    memory: u64,
    #[serde(default)]
    cpu: f64,
}

#[derive(Debug, Deserialize)]
struct Pm2Env {
    #[serde(default)]
    status: String,
    /// Epoch milliseconds of the last (re)start.
    #[serde(default)]
    pm_uptime: Option<u64>,
    #[serde(default)]
    restart_time: u64,
    #[serde(default)]
    pm_out_log_path: Option<String>,
    #[serde(default)]
    pm_err_log_path: Option<String>,
}

/// Proof that the pm2 daemon answered a ping. Held by the client for its
/// lifetime; dropping the client releases it.
#[derive(Debug)]
struct Pm2Handle;

#[derive(Debug, Default)]
pub struct Pm2Client {
    handle: OnceCell<Pm2Handle>,
}

/// Names are interpolated into pm2 command lines, so the accepted alphabet
/// is deliberately narrow.
fn validate_name(name: &str) -> Result<(), ProcessError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ProcessError::InvalidName(name.to_string()))
    }
}

fn epoch_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

impl From<Pm2Row> for ProcessInfo {
    fn from(row: Pm2Row) -> Self {
        let uptime_ms = match (row.pm2_env.status.as_str(), row.pm2_env.pm_uptime) {
            ("online", Some(started)) => epoch_ms_now().saturating_sub(started),
            _ => 0,
        };
        Self {
            name: row.name,
            status: row.pm2_env.status,
            memory_bytes: row.monit.memory,
            cpu_percent: row.monit.cpu,
            uptime_ms,
            restarts: row.pm2_env.restart_time,
            out_log_path: row.pm2_env.pm_out_log_path,
            err_log_path: row.pm2_env.pm_err_log_path,
        }
    }
}

async fn run_pm2(args: &[&str]) -> Result<std::process::Output, ProcessError> {
    let mut cmd = tokio::process::Command::new("pm2");
    cmd.args(args);
    let action = args.first().copied().unwrap_or("pm2").to_string();
    match tokio::time::timeout(Duration::from_secs(PM2_TIMEOUT_SECS), cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(ProcessError::Unreachable(err.to_string())),
        Err(_) => Err(ProcessError::CommandFailed {
            action,
            message: format!("timed out after {PM2_TIMEOUT_SECS}s"),
        }),
    }
}

impl Pm2Client {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the daemon handle, probing with `pm2 ping` on first call.
    async fn ensure_connected(&self) -> Result<&Pm2Handle, ProcessError> {
        self.handle
            .get_or_try_init(|| async {
                let output = run_pm2(&["ping"]).await?;
                if output.status.success() {
                    tracing::debug!("pm2 daemon handle acquired");
                    Ok(Pm2Handle)
                } else {
                    Err(ProcessError::Unreachable(
                        String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    ))
                }
            })
            .await
    }

    /// All managed processes.
    pub async fn list(&self) -> Result<Vec<ProcessInfo>, ProcessError> {
        self.ensure_connected().await?;
        let output = run_pm2(&["jlist"]).await?;
        if !output.status.success() {
            return Err(ProcessError::CommandFailed {
                action: "jlist".into(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let rows: Vec<Pm2Row> = serde_json::from_slice(&output.stdout)
            .map_err(|err| ProcessError::Malformed(err.to_string()))?;
        Ok(rows.into_iter().map(ProcessInfo::from).collect())
    }

    /// One managed process by name.
    pub async fn describe(&self, name: &str) -> Result<ProcessInfo, ProcessError> {
        validate_name(name)?;
        self.list()
            .await?
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ProcessError::NotFound(name.to_string()))
    }

    /// Start, stop, or restart a process by name.
    pub async fn dispatch(&self, action: ProcessAction, name: &str) -> Result<(), ProcessError> {
        validate_name(name)?;
        self.ensure_connected().await?;
        let output = run_pm2(&[action.as_str(), name]).await?;
        if output.status.success() {
            tracing::info!(process = name, action = action.as_str(), "pm2 action applied");
            Ok(())
        } else {
            Err(ProcessError::CommandFailed {
                action: action.as_str().into(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
