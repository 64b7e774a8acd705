use std::fmt;
use std::path::{Path, PathBuf};

use crate::log_sink::LogBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    MP3,
    M4A,
    WAV,
    OGG,
    MP4,
    WEBM,
    MKV,
    MOV,
}

impl MediaFormat {
    pub fn kind(self) -> MediaKind {
        match self {
            Self::MP3 | Self::M4A | Self::WAV | Self::OGG => MediaKind::Audio,
            Self::MP4 | Self::WEBM | Self::MKV | Self::MOV => MediaKind::Video,
        }
    }

    pub fn is_audio(self) -> bool {
        self.kind() == MediaKind::Audio
    }

    /// Extension of the final file on disk.
    pub fn extension(self) -> &'static str {
        match self {
            Self::MP3 => "mp3",
            Self::M4A => "m4a",
            Self::WAV => "wav",
            Self::OGG => "ogg",
            Self::MP4 => "mp4",
            Self::WEBM => "webm",
            Self::MKV => "mkv",
            Self::MOV => "mov",
        }
    }

    /// Codec or container name as yt-dlp expects it on the command line.
    pub fn ytdlp_name(self) -> &'static str {
        match self {
            Self::OGG => "vorbis",
            other => other.extension(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::MP3 => "MP3",
            Self::M4A => "M4A",
            Self::WAV => "WAV",
            Self::OGG => "OGG",
            Self::MP4 => "MP4",
            Self::WEBM => "WEBM",
            Self::MKV => "MKV",
            Self::MOV => "MOV",
        }
    }
}

/// One entry of the format selector. Section headers are selectable but are
/// not a usable format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatChoice {
    Section(MediaKind),
    Format(MediaFormat),
}

pub const FORMAT_CHOICES: [FormatChoice; 10] = [
    FormatChoice::Section(MediaKind::Audio),
    FormatChoice::Format(MediaFormat::MP3),
    FormatChoice::Format(MediaFormat::M4A),
    FormatChoice::Format(MediaFormat::WAV),
    FormatChoice::Format(MediaFormat::OGG),
    FormatChoice::Section(MediaKind::Video),
    FormatChoice::Format(MediaFormat::MP4),
    FormatChoice::Format(MediaFormat::WEBM),
    FormatChoice::Format(MediaFormat::MKV),
    FormatChoice::Format(MediaFormat::MOV),
];

impl FormatChoice {
    pub fn concrete(self) -> Option<MediaFormat> {
        match self {
            Self::Format(format) => Some(format),
            Self::Section(_) => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Section(MediaKind::Audio) => "--- Audio Formats ---",
            Self::Section(MediaKind::Video) => "--- Video Formats ---",
            Self::Format(format) => format.label(),
        }
    }
}

impl Default for FormatChoice {
    fn default() -> Self {
        Self::Format(MediaFormat::MP3)
    }
}

impl fmt::Display for FormatChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything a worker needs for one download. Folders are captured at
/// submission so later folder changes only affect the next job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub url: String,
    pub format: FormatChoice,
    pub music_dir: PathBuf,
    pub video_dir: PathBuf,
}

impl JobRequest {
    pub fn destination(&self, format: MediaFormat) -> &Path {
        match format.kind() {
            MediaKind::Audio => &self.music_dir,
            MediaKind::Video => &self.video_dir,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { destination: PathBuf },
    Canceled { removed: Vec<PathBuf> },
    Failed(String),
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    EmptyUrl,
    PlaceholderFormat,
}

impl ValidationError {
    /// Localization key and English fallback for the dialog title.
    pub fn title(self) -> (&'static str, &'static str) {
        match self {
            Self::EmptyUrl => ("input-error-title", "Input Error"),
            Self::PlaceholderFormat => ("format-error-title", "Format Error"),
        }
    }

    pub fn message(self) -> (&'static str, &'static str) {
        match self {
            Self::EmptyUrl => (
                "error-no-url",
                "Please enter a valid YouTube or YouTube Music URL.",
            ),
            Self::PlaceholderFormat => ("error-format", "Please select a valid output format."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPhase {
    #[default]
    Idle,
    Running,
}

#[derive(Default)]
pub struct AppState {
    pub url: String,
    pub format: FormatChoice,
    pub music_dir: PathBuf,
    pub video_dir: PathBuf,
    pub phase: JobPhase,
    pub log: LogBuffer,
    pub last_outcome: Option<JobOutcome>,
}

impl AppState {
    pub fn new(music_dir: PathBuf, video_dir: PathBuf) -> Self {
        Self {
            music_dir,
            video_dir,
            ..Default::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == JobPhase::Running
    }

    /// Checks the form and snapshots it into a job.
    pub fn build_job(&self) -> Result<JobRequest, ValidationError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ValidationError::EmptyUrl);
        }
        if self.format.concrete().is_none() {
            return Err(ValidationError::PlaceholderFormat);
        }

        Ok(JobRequest {
            url: url.to_string(),
            format: self.format,
            music_dir: self.music_dir.clone(),
            video_dir: self.video_dir.clone(),
        })
    }
}
