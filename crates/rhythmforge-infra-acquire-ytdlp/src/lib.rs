pub mod output;

use crate::output::{classify_failure, parse_download_percent, parse_result_line, DownloadResult};
use regex::Regex;
use rhythmforge_ports::acquisition::{
    AcquiredMedia, AcquisitionError, AcquisitionProgress, MediaAcquisitionPort,
};
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// Percent shown while the download itself runs; the rest is post-processing.
pub const DOWNLOAD_PERCENT_CAP: u8 = 90;

const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Accepted source forms: `youtube.com/watch?v=`, `youtu.be/`,
/// `youtube.com/embed/` and `youtube.com/v/`, with or without scheme and `www.`.
pub fn is_supported_source(source_ref: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|v/)|youtu\.be/)[\w-]+",
            )
            .ok()
        })
        .as_ref()
        .is_some_and(|re| re.is_match(source_ref.trim()))
}

pub struct YtDlpAcquirer {
    program: String,
    output_dir: PathBuf,
    attempts: u32,
}

impl YtDlpAcquirer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: "yt-dlp".to_string(),
            output_dir: output_dir.into(),
            attempts: 3,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn run_once(
        &self,
        source_ref: &str,
        on_progress: &mut dyn FnMut(AcquisitionProgress),
    ) -> Result<DownloadResult, AcquisitionError> {
        let template = self.output_dir.join("%(title)s.%(ext)s");
        let mut child = Command::new(&self.program)
            .arg("--no-playlist")
            .arg("-x")
            .arg("--audio-format")
            .arg("wav")
            .arg("--newline")
            .arg("--progress")
            .arg("--print")
            .arg(output::RESULT_TEMPLATE)
            .arg("-o")
            .arg(&template)
            .arg(source_ref)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AcquisitionError::Generic(format!("failed to start {}: {e}", self.program))
            })?;

        // Stderr is drained concurrently with stdout.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text);
                text
            })
        });

        let mut result = None;
        let mut last_percent = 0u8;
        let mut post_processing = false;
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if let Some(percent) = parse_download_percent(&line) {
                    let percent = percent.min(DOWNLOAD_PERCENT_CAP);
                    if percent > last_percent {
                        last_percent = percent;
                        on_progress(AcquisitionProgress {
                            percent,
                            message: format!("downloading {percent}%"),
                        });
                    }
                } else if line.starts_with("[ExtractAudio]") && !post_processing {
                    post_processing = true;
                    on_progress(AcquisitionProgress {
                        percent: 95,
                        message: "converting audio".to_string(),
                    });
                } else if let Some(parsed) = parse_result_line(&line) {
                    result = Some(parsed);
                } else {
                    log::debug!("yt-dlp: {line}");
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| AcquisitionError::Generic(e.to_string()))?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(classify_failure(&stderr));
        }
        result.ok_or_else(|| {
            AcquisitionError::Generic("yt-dlp finished without reporting a file".to_string())
        })
    }
}

fn is_transient(err: &AcquisitionError) -> bool {
    matches!(
        err,
        AcquisitionError::Timeout(_) | AcquisitionError::Unavailable(_)
    )
}

impl MediaAcquisitionPort for YtDlpAcquirer {
    fn fetch(
        &self,
        source_ref: &str,
        on_progress: &mut dyn FnMut(AcquisitionProgress),
    ) -> Result<AcquiredMedia, AcquisitionError> {
        if !is_supported_source(source_ref) {
            return Err(AcquisitionError::InvalidSource(source_ref.to_string()));
        }
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| AcquisitionError::Generic(e.to_string()))?;

        on_progress(AcquisitionProgress {
            percent: 0,
            message: "preparing download".to_string(),
        });

        let mut delay = RETRY_DELAY;
        let mut attempt = 1;
        let downloaded = loop {
            match self.run_once(source_ref, on_progress) {
                Ok(result) => break result,
                Err(err) if is_transient(&err) && attempt < self.attempts => {
                    log::warn!("fetch attempt {attempt} failed ({err}); retrying in {delay:?}");
                    thread::sleep(delay);
                    delay *= 2;
                    attempt += 1;
                }
                Err(err) => {
                    log::error!("fetch of {source_ref} failed: {err}");
                    return Err(err);
                }
            }
        };

        on_progress(AcquisitionProgress {
            percent: 98,
            message: "verifying file".to_string(),
        });
        let size = fs::metadata(&downloaded.path)
            .map(|m| m.len())
            .map_err(|e| AcquisitionError::Generic(format!("downloaded file missing: {e}")))?;
        if size == 0 {
            return Err(AcquisitionError::Generic(
                "downloaded file is empty".to_string(),
            ));
        }

        on_progress(AcquisitionProgress {
            percent: 100,
            message: "download complete".to_string(),
        });
        log::info!("fetched {:?} -> {}", downloaded.title, downloaded.path.display());
        Ok(AcquiredMedia {
            local_path: downloaded.path,
            title: downloaded.title,
            duration_secs: downloaded.duration_secs,
        })
    }
}
