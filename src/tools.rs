use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::io;
use std::process::{Child, Command, ExitStatus, Stdio};

use crate::config::Settings;

pub fn command(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    configure_for_background(&mut cmd);
    cmd
}

#[cfg(windows)]
fn configure_for_background(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;

    // no console window flashing up behind the GUI
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn configure_for_background(_cmd: &mut Command) {}

/// Puts the child at the head of its own process group so that
/// `kill_process_tree` also reaches the ffmpeg processes it starts.
#[cfg(unix)]
pub fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;

    cmd.process_group(0);
}

#[cfg(not(unix))]
pub fn own_process_group(_cmd: &mut Command) {}

#[cfg(unix)]
fn signal_tree(pid: u32) -> io::Result<ExitStatus> {
    command("kill")
        .args(["-KILL", "--", &format!("-{pid}")])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
}

#[cfg(windows)]
fn signal_tree(pid: u32) -> io::Result<ExitStatus> {
    command("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
}

#[cfg(not(any(unix, windows)))]
fn signal_tree(_pid: u32) -> io::Result<ExitStatus> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "no process tree kill"))
}

/// Stops the child and everything it spawned, then reaps it.
pub fn kill_process_tree(child: &mut Child) {
    match signal_tree(child.id()) {
        Ok(status) if status.success() => {}
        Ok(status) => log::debug!("process tree kill exited with {}", status),
        Err(e) => log::debug!("process tree kill unavailable: {}", e),
    }
    if let Err(e) = child.kill() {
        log::debug!("child already gone: {}", e);
    }
    if let Err(e) = child.wait() {
        log::warn!("could not reap stopped child: {}", e);
    }
}

pub fn executable_name(base: &str) -> String {
    if cfg!(windows) {
        format!("{base}.exe")
    } else {
        base.to_string()
    }
}

/// How to start yt-dlp: a standalone binary, or a Python interpreter
/// running the `yt_dlp` module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launcher {
    pub program: PathBuf,
    pub leading_args: Vec<OsString>,
}

impl Launcher {
    pub fn binary(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn python_module(python: impl Into<PathBuf>) -> Self {
        Self {
            program: python.into(),
            leading_args: vec!["-m".into(), "yt_dlp".into()],
        }
    }

    /// Bare program name, left for the OS to resolve.
    pub fn fallback() -> Self {
        Self::binary(executable_name("yt-dlp"))
    }

    pub fn command(&self) -> Command {
        let mut cmd = command(&self.program);
        cmd.args(&self.leading_args);
        cmd
    }

    pub fn display(&self) -> String {
        let mut text = self.program.display().to_string();
        for arg in &self.leading_args {
            text.push(' ');
            text.push_str(&arg.to_string_lossy());
        }
        text
    }

    /// Runs `--version` and returns the first line on success.
    pub fn version(&self) -> Option<String> {
        let output = self
            .command()
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let first = text.lines().next()?.trim();
        (!first.is_empty()).then(|| first.to_string())
    }
}

pub fn bundled_ytdlp_path(settings: &Settings) -> Option<PathBuf> {
    settings
        .bundle_dir
        .as_ref()
        .map(|dir| dir.join(executable_name("yt-dlp")))
}

pub fn managed_ytdlp_path(settings: &Settings) -> PathBuf {
    settings.tools_dir.join(executable_name("yt-dlp"))
}

pub fn find_python() -> Option<PathBuf> {
    ["python3", "python"]
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// Bundled binary, then PATH, then the managed binary, then
/// `python -m yt_dlp`.
pub fn locate_ytdlp(settings: &Settings) -> Option<Launcher> {
    if let Some(bundled) = bundled_ytdlp_path(settings).filter(|p| p.is_file()) {
        return Some(Launcher::binary(bundled));
    }
    if let Ok(on_path) = which::which("yt-dlp") {
        return Some(Launcher::binary(on_path));
    }
    let managed = managed_ytdlp_path(settings);
    if managed.is_file() {
        return Some(Launcher::binary(managed));
    }

    let module = Launcher::python_module(find_python()?);
    module.version().map(|version| {
        log::debug!("using yt_dlp module {} via {}", version, module.display());
        module
    })
}

pub fn locate_ffmpeg(settings: &Settings) -> PathBuf {
    let bundled = settings
        .bundle_dir
        .as_ref()
        .map(|dir| dir.join("ffmpeg").join(executable_name("ffmpeg")));
    resolve_ffmpeg(
        bundled.as_deref(),
        which::which("ffmpeg").ok(),
        &settings.ffmpeg_fallback,
    )
}

fn resolve_ffmpeg(bundled: Option<&Path>, on_path: Option<PathBuf>, fallback: &Path) -> PathBuf {
    if let Some(bundled) = bundled.filter(|p| p.is_file()) {
        return bundled.to_path_buf();
    }
    on_path.unwrap_or_else(|| fallback.to_path_buf())
}
