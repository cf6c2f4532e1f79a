//! Execution of already-validated commands. Nothing here re-checks policy:
//! callers must hold a `Verdict::Permitted` from the security layer before
//! reaching this module.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;

/// Maximum command execution time before kill.
const COMMAND_TIMEOUT_SECS: u64 = 60;
/// Maximum captured output size in bytes (1 MiB) per stream.
const MAX_OUTPUT_BYTES: usize = 1_048_576;
/// Environment variables safe to pass through. Only functional variables —
/// never tokens or secrets.
const SAFE_ENV_VARS: &[&str] = &[
    "PATH", "HOME", "TERM", "LANG", "LC_ALL", "LC_CTYPE", "USER", "SHELL",
];

/// Captured result of one command run. Timeouts and spawn failures are
/// reported here, never as panics.
#[derive(Debug, Clone, Serialize)]
pub struct ExecOutcome {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

fn truncate_on_char_boundary(text: &mut String, max: usize) {
    if text.len() > max {
        let mut cut = max;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("\n... [output truncated at 1MB]");
    }
}

/// Run a validated command line under `sh -c` with a cleared environment,
/// a fixed timeout, and truncated captured output.
pub async fn run_validated(command: &str, cwd: Option<&Path>) -> ExecOutcome {
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c").arg(command).env_clear();
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    for var in SAFE_ENV_VARS {
        if let Ok(val) = std::env::var(var) {
            cmd.env(var, val);
        }
    }

    let result = tokio::time::timeout(Duration::from_secs(COMMAND_TIMEOUT_SECS), cmd.output()).await;

    match result {
        Ok(Ok(output)) => {
            let mut stdout = String::from_utf8_lossy(&output.stdout).to_string();
            let mut stderr = String::from_utf8_lossy(&output.stderr).to_string();
            truncate_on_char_boundary(&mut stdout, MAX_OUTPUT_BYTES);
            truncate_on_char_boundary(&mut stderr, MAX_OUTPUT_BYTES);

            ExecOutcome {
                success: output.status.success(),
                output: stdout,
                error: if stderr.is_empty() { None } else { Some(stderr) },
            }
        }
        Ok(Err(err)) => ExecOutcome {
            success: false,
            output: String::new(),
            error: Some(format!("failed to execute command: {err}")),
        },
        Err(_) => ExecOutcome {
            success: false,
            output: String::new(),
            error: Some(format!(
                "command timed out after {COMMAND_TIMEOUT_SECS}s and was killed"
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_of_successful_command() {
        let tmp = std::env::temp_dir();
        let outcome = run_validated("pwd", Some(tmp.as_path())).await;
        assert!(outcome.success);
        assert!(!outcome.output.trim().is_empty());
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn failing_command_reports_stderr() {
        let outcome = run_validated("ls /nonexistent_dir_xyz", None).await;
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn environment_is_scrubbed() {
        // SAFETY: test-only env mutation, removed again below.
        unsafe { std::env::set_var("GUARDPOST_TEST_SECRET", "sk-leak-me") };
        let outcome = run_validated("env", None).await;
        unsafe { std::env::remove_var("GUARDPOST_TEST_SECRET") };
        assert!(
            !outcome.output.contains("sk-leak-me"),
            "secret leaked into command environment"
        );
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut text = "é".repeat(10);
        truncate_on_char_boundary(&mut text, 5);
        assert!(text.starts_with("éé"));
        assert!(text.contains("truncated"));
    }
}
