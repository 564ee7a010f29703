use parking_lot::Mutex;
use rhythmforge_core::{
    AppCore, AppPorts, Command, ErrorPayload, Event, EventSink, Outbound, SystemClock,
};
use rhythmforge_infra_acquire_ytdlp::YtDlpAcquirer;
use rhythmforge_infra_analysis_flux::FluxAnalyzer;
use rhythmforge_infra_audio_hound::HoundDecoder;
use rhythmforge_infra_audio_symphonia::{ExtensionRouter, SymphoniaDecoder};
use rhythmforge_infra_storage_fs::{FsMediaLibrary, FsStorage};
use rhythmforge_ports::storage::SettingsPort;
use rhythmforge_ports::types::SessionId;
use serde::Deserialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Overrides the platform config directory.
const DATA_DIR_ENV: &str = "RHYTHMFORGE_DATA_DIR";

/// One stdin line: `{"connection": "...", "command": {"type": ..., "payload": ...}}`.
#[derive(Deserialize)]
struct Inbound {
    connection: SessionId,
    command: Command,
}

type SharedOut = Arc<Mutex<io::Stdout>>;

fn write_event(out: &SharedOut, outbound: &Outbound) {
    match serde_json::to_string(outbound) {
        Ok(line) => {
            let mut out = out.lock();
            let _ = writeln!(out, "{line}");
            let _ = out.flush();
        }
        Err(err) => log::error!("failed to encode event: {err}"),
    }
}

fn build_core(out: SharedOut) -> AppCore {
    let base_dir = std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            FsStorage::default_base_dir().unwrap_or_else(|err| {
                log::warn!("no config directory ({err}); using the working directory");
                PathBuf::from(".")
            })
        });

    let settings = FsStorage::new(base_dir.clone())
        .load_settings()
        .unwrap_or_default();
    let mut storage = FsStorage::new(base_dir.clone());
    if let Some(dir) = settings.charts_dir.as_deref() {
        storage = storage.with_charts_dir(PathBuf::from(dir));
    }
    let media_dir = settings
        .media_dir
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(FsStorage::default_media_dir);
    log::info!(
        "charts in {}, media in {}",
        storage.charts_dir().display(),
        media_dir.display()
    );

    let ports = AppPorts {
        charts: Arc::new(storage),
        decoder: Arc::new(ExtensionRouter::new(
            Box::new(HoundDecoder::new()),
            Box::new(SymphoniaDecoder::new()),
        )),
        analyzer: Arc::new(FluxAnalyzer::new()),
        acquirer: Some(Arc::new(YtDlpAcquirer::new(media_dir.clone()))),
        media: Some(Arc::new(FsMediaLibrary::new(media_dir))),
        settings: Some(Box::new(FsStorage::new(base_dir))),
    };
    let sink: EventSink = Arc::new(move |outbound: Outbound| write_event(&out, &outbound));
    AppCore::new(ports, Arc::new(SystemClock), sink)
}

fn main() {
    env_logger::init();

    let out: SharedOut = Arc::new(Mutex::new(io::stdout()));
    let mut core = build_core(out.clone());

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::error!("stdin read failed: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let events = match serde_json::from_str::<Inbound>(&line) {
            Ok(inbound) => {
                core.dispatch(&inbound.connection, inbound.command);
                core.drain_events()
            }
            Err(err) => {
                log::warn!("rejected input line: {err}");
                vec![Outbound {
                    connection: SessionId(String::new()),
                    event: Event::Error {
                        error: ErrorPayload {
                            code: "invalid_command".to_string(),
                            message: err.to_string(),
                            cause: None,
                        },
                    },
                }]
            }
        };
        for event in &events {
            write_event(&out, event);
        }
    }

    core.join_jobs();
}
