use std::ffi::OsString;
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, OnceLock};
use std::thread;

use regex::Regex;

use crate::bootstrap;
use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::error::{DownloadError, Result};
use crate::log_sink::LogSink;
use crate::models::{JobOutcome, JobRequest, MediaFormat};
use crate::progress::{self, Flow, ProgressEvent, ProgressRelay};
use crate::tools::{self, Launcher};

pub const AUDIO_QUALITY_KBPS: u32 = 192;
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessor {
    ExtractAudio {
        codec: &'static str,
        quality_kbps: u32,
    },
    RemuxVideo {
        container: &'static str,
    },
    EmbedMetadata,
}

/// yt-dlp configuration for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub output_template: PathBuf,
    pub ignore_errors: bool,
    pub single_item: bool,
    pub format_selector: &'static str,
    pub merge_output_format: Option<&'static str>,
    pub postprocessors: Vec<PostProcessor>,
    pub ffmpeg_location: PathBuf,
}

impl DownloadOptions {
    pub fn for_format(
        format: MediaFormat,
        destination: &Path,
        single_item: bool,
        ffmpeg_location: PathBuf,
    ) -> Self {
        let (format_selector, merge_output_format, first) = if format.is_audio() {
            (
                "bestaudio/best",
                None,
                PostProcessor::ExtractAudio {
                    codec: format.ytdlp_name(),
                    quality_kbps: AUDIO_QUALITY_KBPS,
                },
            )
        } else {
            (
                "bestvideo+bestaudio/best",
                Some(format.ytdlp_name()),
                PostProcessor::RemuxVideo {
                    container: format.ytdlp_name(),
                },
            )
        };

        Self {
            output_template: destination.join(OUTPUT_TEMPLATE),
            ignore_errors: true,
            single_item,
            format_selector,
            merge_output_format,
            postprocessors: vec![first, PostProcessor::EmbedMetadata],
            ffmpeg_location,
        }
    }

    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        let mut push = |arg: &str| args.push(arg.into());

        push("--newline");
        push("--progress-template");
        push(progress::DOWNLOAD_TEMPLATE);
        push("--progress-template");
        push(progress::POSTPROCESS_TEMPLATE);
        if self.ignore_errors {
            push("--ignore-errors");
        }
        if self.single_item {
            push("--no-playlist");
        }
        push("-f");
        push(self.format_selector);
        if let Some(container) = self.merge_output_format {
            push("--merge-output-format");
            push(container);
        }

        for pp in &self.postprocessors {
            match pp {
                PostProcessor::ExtractAudio {
                    codec,
                    quality_kbps,
                } => {
                    push("-x");
                    push("--audio-format");
                    push(codec);
                    push("--audio-quality");
                    push(&format!("{quality_kbps}K"));
                }
                PostProcessor::RemuxVideo { container } => {
                    push("--remux-video");
                    push(container);
                }
                PostProcessor::EmbedMetadata => push("--embed-metadata"),
            }
        }

        args.push("--ffmpeg-location".into());
        args.push(self.ffmpeg_location.clone().into_os_string());
        args.push("-o".into());
        args.push(self.output_template.clone().into_os_string());
        args
    }
}

/// Playlist item links (`...&index=3`) download only that item.
pub fn is_single_item_link(url: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?&]index=\d+").expect("valid index regex"))
        .is_match(url)
}

pub fn is_partial_artifact(file_name: &str) -> bool {
    file_name.ends_with(".part") || file_name.ends_with(".ytdl") || file_name.contains(".part-Frag")
}

/// Best-effort removal of unfinished downloads in `dir`. Returns what was
/// deleted.
pub fn cleanup_partials(dir: &Path, sink: &dyn LogSink) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("could not scan {} for partial files: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut removed = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_partial_artifact(&name) || !path.is_file() {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                sink.append_line(&format!("Deleted partial file: {name}"));
                removed.push(path);
            }
            Err(e) => log::warn!("could not delete {}: {}", path.display(), e),
        }
    }
    removed
}

/// Runs one job to a terminal outcome. Every failure ends up in the log;
/// nothing escapes to the caller.
pub fn download_media(
    job: &JobRequest,
    launcher: &Launcher,
    settings: &Settings,
    sink: &dyn LogSink,
    cancel: &CancellationToken,
) -> JobOutcome {
    let Some(format) = job.format.concrete() else {
        sink.append_line("Please select a valid output format.");
        return JobOutcome::Rejected;
    };
    let destination = job.destination(format).to_path_buf();

    match run_ytdlp(job, format, &destination, launcher, settings, sink, cancel) {
        Ok(()) => {
            log::info!("job for {} completed", job.url);
            sink.append_line("Download complete.");
            sink.append_line(&format!("Saved to: {}", destination.display()));
            JobOutcome::Completed { destination }
        }
        Err(DownloadError::Canceled) => {
            log::info!("job for {} canceled", job.url);
            sink.append_line("Download canceled.");
            let removed = cleanup_partials(&destination, sink);
            JobOutcome::Canceled { removed }
        }
        Err(e) => {
            log::warn!("job for {} failed: {}", job.url, e);
            sink.append_line(&format!("Error: {e}"));
            JobOutcome::Failed(e.to_string())
        }
    }
}

fn run_ytdlp(
    job: &JobRequest,
    format: MediaFormat,
    destination: &Path,
    launcher: &Launcher,
    settings: &Settings,
    sink: &dyn LogSink,
    cancel: &CancellationToken,
) -> Result<()> {
    fs::create_dir_all(destination).map_err(|source| DownloadError::CreateDir {
        path: destination.to_path_buf(),
        source,
    })?;

    let options = DownloadOptions::for_format(
        format,
        destination,
        is_single_item_link(&job.url),
        tools::locate_ffmpeg(settings),
    );

    let mut command = launcher.command();
    command
        .args(options.to_args())
        .arg("--")
        .arg(&job.url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    tools::own_process_group(&mut command);
    log::debug!("running {:?}", command);

    sink.append_line(&format!("Starting download in {}...", destination.display()));

    let mut child = command.spawn().map_err(|source| DownloadError::Spawn {
        program: launcher.display(),
        source,
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "yt-dlp stdout not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "yt-dlp stderr not captured"))?;

    // post-processor templates may arrive on either stream
    let (tx, rx) = mpsc::channel();
    forward_lines(stdout, Stream::Stdout, tx.clone());
    forward_lines(stderr, Stream::Stderr, tx);

    let relay = ProgressRelay::new(sink, cancel);
    let mut errors = StderrTail::default();
    let mut finished_items = 0usize;
    let mut aborted = false;
    for (stream, line) in rx {
        match progress::parse_line(&line) {
            Some(event) => {
                if matches!(event, ProgressEvent::Finished { .. }) {
                    finished_items += 1;
                }
                if relay.on_event(&event) == Flow::Abort {
                    aborted = true;
                    break;
                }
            }
            None if stream == Stream::Stderr && !progress::is_template_line(&line) => {
                errors.record(&line)
            }
            None => log::debug!("yt-dlp: {}", line),
        }
    }

    if aborted {
        tools::kill_process_tree(&mut child);
        return Err(DownloadError::Canceled);
    }

    let status = child.wait()?;

    if cancel.is_cancelled() {
        return Err(DownloadError::Canceled);
    }
    if !status.success() {
        let message = errors
            .into_message()
            .unwrap_or_else(|| format!("yt-dlp exited with {status}"));
        if finished_items == 0 {
            return Err(DownloadError::ToolFailed {
                code: status.code(),
                message,
            });
        }
        // --ignore-errors: the items that did finish are kept
        log::warn!("{} item(s) saved, yt-dlp exited with {}", finished_items, status);
        sink.append_line(&format!("Warning: some items failed: {message}"));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

fn forward_lines(
    output: impl Read + Send + 'static,
    stream: Stream,
    tx: Sender<(Stream, String)>,
) {
    thread::spawn(move || {
        let mut reader = BufReader::new(output);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("lost yt-dlp {:?} output: {}", stream, e);
                    break;
                }
            }
            let line = String::from_utf8_lossy(&buf)
                .trim_end_matches(['\r', '\n'])
                .to_string();
            if tx.send((stream, line)).is_err() {
                break;
            }
        }
    });
}

/// Remembers the last `ERROR:` line on stderr, or the last non-empty line
/// when there is none.
#[derive(Debug, Default)]
struct StderrTail {
    last_error: Option<String>,
    last_line: Option<String>,
}

impl StderrTail {
    fn record(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        log::debug!("yt-dlp stderr: {}", line);
        if let Some(message) = line.strip_prefix("ERROR:") {
            self.last_error = Some(message.trim().to_string());
        }
        self.last_line = Some(line.to_string());
    }

    fn into_message(self) -> Option<String> {
        self.last_error.or(self.last_line)
    }
}

/// The work a job thread performs, separated from the GUI so the state
/// machine can run against a fake.
pub trait JobRunner: Send + Sync {
    fn run(&self, job: &JobRequest, sink: &dyn LogSink, cancel: &CancellationToken) -> JobOutcome;
}

pub struct YtDlpRunner {
    settings: Arc<Settings>,
}

impl YtDlpRunner {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }
}

impl JobRunner for YtDlpRunner {
    fn run(&self, job: &JobRequest, sink: &dyn LogSink, cancel: &CancellationToken) -> JobOutcome {
        let launcher =
            bootstrap::ensure_ytdlp(&self.settings, sink).unwrap_or_else(Launcher::fallback);
        download_media(job, &launcher, &self.settings, sink, cancel)
    }
}
