//! Parsing of yt-dlp's line-oriented output.

use regex::Regex;
use rhythmforge_ports::acquisition::AcquisitionError;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Passed to `--print`; emitted once the final file is in place.
pub const RESULT_TEMPLATE: &str = "after_move:RF\t%(filepath)s\t%(title)s\t%(duration)s";

const RESULT_TAG: &str = "RF";

#[derive(Clone, Debug, PartialEq)]
pub struct DownloadResult {
    pub path: PathBuf,
    pub title: String,
    pub duration_secs: Option<f64>,
}

/// Percent from a `[download]  42.3% of ...` line, truncated.
pub fn parse_download_percent(line: &str) -> Option<u8> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let re = PATTERN
        .get_or_init(|| Regex::new(r"^\[download\]\s+(\d{1,3}(?:\.\d+)?)%").ok())
        .as_ref()?;
    let caps = re.captures(line.trim_start())?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(value.clamp(0.0, 100.0) as u8)
}

pub fn parse_result_line(line: &str) -> Option<DownloadResult> {
    let mut fields = line.split('\t');
    if fields.next()? != RESULT_TAG {
        return None;
    }
    let path = fields.next().filter(|p| !p.is_empty() && *p != "NA")?;
    let title = fields
        .next()
        .filter(|t| !t.is_empty() && *t != "NA")
        .map(str::to_string)
        .unwrap_or_else(|| {
            PathBuf::from(path)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string())
        });
    let duration_secs = fields
        .next()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0);
    Some(DownloadResult {
        path: PathBuf::from(path),
        title,
        duration_secs,
    })
}

/// Maps a failed run's stderr to a failure class. The last `ERROR:` line is
/// used as the message when present.
pub fn classify_failure(stderr: &str) -> AcquisitionError {
    let message = stderr
        .lines()
        .rev()
        .find(|l| l.contains("ERROR"))
        .or_else(|| stderr.lines().rev().find(|l| !l.trim().is_empty()))
        .unwrap_or("yt-dlp exited with an error")
        .trim()
        .to_string();
    let lower = stderr.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["403", "forbidden"]) {
        AcquisitionError::Forbidden(message)
    } else if has(&["404", "not found", "video unavailable", "unavailable video"]) {
        AcquisitionError::NotFound(message)
    } else if has(&["blocked", "sign in", "bot"]) {
        AcquisitionError::Blocked(message)
    } else if has(&["timed out", "timeout"]) {
        AcquisitionError::Timeout(message)
    } else if has(&["connection", "network"]) {
        AcquisitionError::Unavailable(message)
    } else {
        AcquisitionError::Generic(message)
    }
}
