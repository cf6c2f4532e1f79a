//! Bounded log search: regex grep with context, and metric extraction from
//! the tail of a log.
//!
//! Both operations stream the file instead of slurping it, because process
//! logs are effectively unbounded. Every line is capped at
//! [`MAX_LINE_LENGTH`] characters before a pattern touches it, and grep
//! bails out at `max_matches` — both are correctness caps, not
//! optimizations. A missing or unreadable log is a normal state for a
//! freshly started process and yields empty results, never an error.

use std::collections::{BTreeMap, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::security::{MAX_LINE_LENGTH, ScreenedPattern};

/// Upper bound on simultaneous metric patterns per call. Bounds worst-case
/// work to `MAX_METRIC_PATTERNS × window_lines` line scans.
pub const MAX_METRIC_PATTERNS: usize = 10;

/// One grep hit: the matched line, its 1-based number, and bounded context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogMatch {
    pub line_number: usize,
    pub line: String,
    pub before: Vec<String>,
    pub after: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricSample {
    pub line_number: usize,
    pub value: String,
}

/// All samples a metric pattern matched in the window, oldest first, plus
/// the latest value for convenience.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricSeries {
    pub samples: Vec<MetricSample>,
    pub latest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricQueryError {
    #[error("at least one metric pattern is required")]
    NoPatterns,

    #[error("at most {MAX_METRIC_PATTERNS} metric patterns per call, got {0}")]
    TooManyPatterns(usize),

    #[error("pattern for metric '{0}' must contain exactly one capture group")]
    WrongCaptureCount(String),
}

/// Read one line, tolerating invalid UTF-8 and capping length. Returns
/// `None` at end of file.
fn read_capped_line(
    reader: &mut impl BufRead,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    let line = String::from_utf8_lossy(buf);
    if line.chars().count() > MAX_LINE_LENGTH {
        return Ok(Some(line.chars().take(MAX_LINE_LENGTH).collect()));
    }
    Ok(Some(line.into_owned()))
}

/// Scan a log for lines matching a screened pattern, collecting up to
/// `context_lines` of surrounding context per hit and stopping at
/// `max_matches` hits.
pub fn grep_log(
    path: &Path,
    pattern: &ScreenedPattern,
    context_lines: usize,
    max_matches: usize,
) -> Vec<LogMatch> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "log not readable, returning no matches");
            return Vec::new();
        }
    };
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let mut before: VecDeque<String> = VecDeque::with_capacity(context_lines);
    let mut matches: Vec<LogMatch> = Vec::new();
    // Matches still waiting for their after-context.
    let mut open: Vec<usize> = Vec::new();
    let mut line_number = 0usize;

    loop {
        let line = match read_capped_line(&mut reader, &mut buf) {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "log read failed mid-scan");
                break;
            }
        };
        line_number += 1;

        open.retain(|&idx| {
            let hit = &mut matches[idx];
            hit.after.push(line.clone());
            hit.after.len() < context_lines
        });

        if matches.len() < max_matches && pattern.as_regex().is_match(&line) {
            matches.push(LogMatch {
                line_number,
                line: line.clone(),
                before: before.iter().cloned().collect(),
                after: Vec::new(),
            });
            if context_lines > 0 {
                open.push(matches.len() - 1);
            }
        }

        if matches.len() >= max_matches && open.is_empty() {
            break;
        }

        if context_lines > 0 {
            if before.len() == context_lines {
                before.pop_front();
            }
            before.push_back(line);
        }
    }

    matches
}

/// Async front end for [`grep_log`]. The scan is synchronous streaming I/O,
/// so it runs on tokio's blocking pool — a multi-gigabyte log must not pin
/// an async worker thread. A panicked scan task is reported and treated
/// like an unreadable log.
pub async fn grep_log_async(
    path: PathBuf,
    pattern: ScreenedPattern,
    context_lines: usize,
    max_matches: usize,
) -> Vec<LogMatch> {
    tokio::task::spawn_blocking(move || grep_log(&path, &pattern, context_lines, max_matches))
        .await
        .unwrap_or_else(|err| {
            tracing::error!(%err, "log grep task failed");
            Vec::new()
        })
}

/// Async front end for [`extract_metrics`]; same blocking-pool contract as
/// [`grep_log_async`].
pub async fn extract_metrics_async(
    path: PathBuf,
    patterns: Vec<(String, ScreenedPattern)>,
    window_lines: usize,
) -> Result<BTreeMap<String, MetricSeries>, MetricQueryError> {
    tokio::task::spawn_blocking(move || extract_metrics(&path, &patterns, window_lines))
        .await
        .unwrap_or_else(|err| {
            tracing::error!(%err, "metric extraction task failed");
            Ok(BTreeMap::new())
        })
}

/// Extract named metric samples from the trailing `window_lines` lines of a
/// log. Each pattern must carry exactly one capture group; group 1 is the
/// sample value.
pub fn extract_metrics(
    path: &Path,
    patterns: &[(String, ScreenedPattern)],
    window_lines: usize,
) -> Result<BTreeMap<String, MetricSeries>, MetricQueryError> {
    if patterns.is_empty() {
        return Err(MetricQueryError::NoPatterns);
    }
    if patterns.len() > MAX_METRIC_PATTERNS {
        return Err(MetricQueryError::TooManyPatterns(patterns.len()));
    }
    for (name, pattern) in patterns {
        // captures_len counts the implicit whole-match group 0.
        if pattern.as_regex().captures_len() != 2 {
            return Err(MetricQueryError::WrongCaptureCount(name.clone()));
        }
    }

    let mut window: VecDeque<(usize, String)> = VecDeque::with_capacity(window_lines.min(4096));
    if let Ok(file) = File::open(path) {
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut line_number = 0usize;
        loop {
            let line = match read_capped_line(&mut reader, &mut buf) {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "log read failed mid-scan");
                    break;
                }
            };
            line_number += 1;
            if window.len() == window_lines {
                window.pop_front();
            }
            if window_lines > 0 {
                window.push_back((line_number, line));
            }
        }
    } else {
        tracing::debug!(path = %path.display(), "log not readable, returning empty series");
    }

    let mut out = BTreeMap::new();
    for (name, pattern) in patterns {
        let mut series = MetricSeries::default();
        for (line_number, line) in &window {
            if let Some(caps) = pattern.as_regex().captures(line)
                && let Some(value) = caps.get(1)
            {
                series.samples.push(MetricSample {
                    line_number: *line_number,
                    value: value.as_str().to_string(),
                });
            }
        }
        series.latest = series.samples.last().map(|sample| sample.value.clone());
        out.insert(name.clone(), series);
    }
    Ok(out)
}
