//! Progress events reported by yt-dlp and the relay that turns them into log
//! lines and cancellation decisions.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::cancel::CancellationToken;
use crate::log_sink::LogSink;

const DOWNLOAD_TAG: &str = "tubegrab-dl";
const POSTPROCESS_TAG: &str = "tubegrab-pp";

/// `--progress-template` for the download phase. The filename goes last
/// because it is the only field that may contain the separator.
pub const DOWNLOAD_TEMPLATE: &str = "download:tubegrab-dl|%(progress.status)s|%(progress._percent_str)s|%(progress._speed_str)s|%(progress._eta_str)s|%(progress.filename)s";

pub const POSTPROCESS_TEMPLATE: &str =
    "postprocess:tubegrab-pp|%(progress.status)s|%(progress.postprocessor)s";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Downloading {
        filename: String,
        percent: String,
        speed: String,
        eta: String,
    },
    Finished {
        filename: String,
    },
    Postprocessing {
        postprocessor: String,
    },
}

/// What the orchestrator should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Abort,
}

fn ansi_escape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid ANSI regex"))
}

fn field(raw: &str) -> String {
    let cleaned = ansi_escape().replace_all(raw, "");
    let cleaned = cleaned.trim();
    if cleaned == "NA" {
        String::new()
    } else {
        cleaned.to_string()
    }
}

/// True for any line produced by one of our progress templates, including
/// ticks `parse_line` chooses to ignore.
pub fn is_template_line(line: &str) -> bool {
    line.starts_with(DOWNLOAD_TAG) || line.starts_with(POSTPROCESS_TAG)
}

/// Parses one output line. Anything that is not one of our template lines
/// yields `None`.
pub fn parse_line(line: &str) -> Option<ProgressEvent> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(rest) = line.strip_prefix(DOWNLOAD_TAG) {
        let mut parts = rest.strip_prefix('|')?.splitn(5, '|');
        let status = field(parts.next()?);
        let percent = field(parts.next()?);
        let speed = field(parts.next()?);
        let eta = field(parts.next()?);
        let filename = field(parts.next()?);

        return match status.as_str() {
            "downloading" => Some(ProgressEvent::Downloading {
                filename,
                percent,
                speed,
                eta,
            }),
            "finished" => Some(ProgressEvent::Finished { filename }),
            _ => None,
        };
    }

    if let Some(rest) = line.strip_prefix(POSTPROCESS_TAG) {
        let mut parts = rest.strip_prefix('|')?.splitn(2, '|');
        let status = field(parts.next()?);
        let postprocessor = field(parts.next().unwrap_or_default());
        // one notice per post-processor, not one per tick
        return (status == "started").then_some(ProgressEvent::Postprocessing { postprocessor });
    }

    None
}

fn display_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename)
}

/// Called once per progress tick on the worker thread.
pub struct ProgressRelay<'a> {
    sink: &'a dyn LogSink,
    cancel: &'a CancellationToken,
}

impl<'a> ProgressRelay<'a> {
    pub fn new(sink: &'a dyn LogSink, cancel: &'a CancellationToken) -> Self {
        Self { sink, cancel }
    }

    pub fn on_event(&self, event: &ProgressEvent) -> Flow {
        if self.cancel.is_cancelled() {
            return Flow::Abort;
        }

        match event {
            ProgressEvent::Downloading {
                filename,
                percent,
                speed,
                eta,
            } => {
                self.sink.update_last_line(&format!(
                    "Downloading: {} - {} ({}, ETA {})",
                    display_name(filename),
                    percent,
                    speed,
                    eta
                ));
            }
            ProgressEvent::Finished { filename } => {
                self.sink.append_line(&format!(
                    "Download finished, processing {}...",
                    display_name(filename)
                ));
            }
            ProgressEvent::Postprocessing { postprocessor } => {
                if postprocessor.is_empty() {
                    self.sink.append_line("Post-processing with FFmpeg...");
                } else {
                    self.sink
                        .append_line(&format!("Post-processing with FFmpeg ({postprocessor})..."));
                }
            }
        }

        Flow::Continue
    }
}
