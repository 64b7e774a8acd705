use std::env;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "tubegrab";

/// Start-up settings shared read-only with every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub music_dir: PathBuf,
    pub video_dir: PathBuf,
    /// Resource directory shipped next to a packaged executable.
    pub bundle_dir: Option<PathBuf>,
    /// Where an application-managed yt-dlp binary lives.
    pub tools_dir: PathBuf,
    pub ffmpeg_fallback: PathBuf,
    pub auto_update: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    Source,
    Packaged,
}

impl Settings {
    pub fn from_env() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| env::current_dir().unwrap_or_default());
        let bundle_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("bundle")))
            .filter(|dir| dir.is_dir());

        let mut settings = Self::with_home(&home, bundle_dir);
        settings.apply_overrides(|key| env::var(key).ok());
        settings
    }

    pub fn with_home(home: &Path, bundle_dir: Option<PathBuf>) -> Self {
        Self {
            music_dir: dirs::audio_dir().unwrap_or_else(|| home.join("Music")),
            video_dir: dirs::video_dir().unwrap_or_else(|| home.join("Videos")),
            bundle_dir,
            tools_dir: dirs::data_local_dir()
                .unwrap_or_else(|| home.join(".local").join("share"))
                .join(APP_NAME)
                .join("bin"),
            ffmpeg_fallback: default_ffmpeg_fallback(),
            auto_update: true,
        }
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = non_empty("TUBEGRAB_FFMPEG") {
            self.ffmpeg_fallback = PathBuf::from(path);
        }
        if let Some(path) = non_empty("TUBEGRAB_MUSIC_DIR") {
            self.music_dir = PathBuf::from(path);
        }
        if let Some(path) = non_empty("TUBEGRAB_VIDEO_DIR") {
            self.video_dir = PathBuf::from(path);
        }
        if let Some(flag) = non_empty("TUBEGRAB_AUTO_UPDATE") {
            self.auto_update = !matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }
    }

    pub fn distribution(&self) -> Distribution {
        if self.bundle_dir.is_some() {
            Distribution::Packaged
        } else {
            Distribution::Source
        }
    }
}

fn default_ffmpeg_fallback() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\ffmpeg\bin\ffmpeg.exe")
    } else if cfg!(target_os = "macos") {
        PathBuf::from("/opt/homebrew/bin/ffmpeg")
    } else {
        PathBuf::from("/usr/bin/ffmpeg")
    }
}
