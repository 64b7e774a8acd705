//! Makes sure a usable yt-dlp is around before a job starts.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use bytes::Bytes;

use crate::config::{Distribution, Settings, APP_NAME};
use crate::log_sink::LogSink;
use crate::tools::{self, Launcher};

const RELEASE_BASE_URL: &str = "https://github.com/yt-dlp/yt-dlp/releases/latest/download";
const MIN_RELEASE_SIZE: usize = 512 * 1024;

const PACKAGED_MISSING: &str =
    "Warning: yt-dlp was not found in this build. Please install yt-dlp manually and make sure it is on your PATH.";

/// Returns the launcher to use, or `None` when yt-dlp could not be found or
/// installed. Never fails the job by itself.
pub fn ensure_ytdlp(settings: &Settings, sink: &dyn LogSink) -> Option<Launcher> {
    ensure_with(
        settings.distribution(),
        settings.auto_update,
        sink,
        || tools::locate_ytdlp(settings),
        |found| install_or_upgrade(settings, found),
    )
}

fn ensure_with(
    distribution: Distribution,
    auto_update: bool,
    sink: &dyn LogSink,
    locate: impl Fn() -> Option<Launcher>,
    install: impl FnOnce(Option<&Launcher>) -> anyhow::Result<String>,
) -> Option<Launcher> {
    let found = locate();

    if distribution == Distribution::Packaged {
        if found.is_none() {
            log::warn!("packaged build without yt-dlp; cannot self-install");
            sink.append_line(PACKAGED_MISSING);
        }
        return found;
    }

    if found.is_some() && !auto_update {
        return found;
    }
    if found.is_none() {
        sink.append_line("yt-dlp not found, installing...");
    }

    match install(found.as_ref()) {
        Ok(summary) => log::info!("{}", summary),
        Err(e) if found.is_some() => log::warn!("could not update yt-dlp: {:#}", e),
        Err(e) => {
            log::warn!("could not install yt-dlp: {:#}", e);
            sink.append_line(&format!("Warning: could not install yt-dlp: {e:#}"));
        }
    }

    locate().or(found)
}

fn install_or_upgrade(settings: &Settings, found: Option<&Launcher>) -> anyhow::Result<String> {
    let managed = tools::managed_ytdlp_path(settings);
    if let Some(launcher) = found.filter(|l| l.program == managed) {
        return self_update(launcher);
    }

    match pip_install() {
        Ok(summary) => Ok(summary),
        Err(e) if found.is_some() => Err(e),
        Err(pip_error) => download_release(&managed).with_context(|| {
            format!("pip install failed ({pip_error:#}) and the release download failed")
        }),
    }
}

fn self_update(launcher: &Launcher) -> anyhow::Result<String> {
    let output = launcher
        .command()
        .arg("-U")
        .output()
        .with_context(|| format!("failed to run {}", launcher.display()))?;

    if !output.status.success() {
        bail!(
            "yt-dlp -U exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(format!("yt-dlp updated successfully: {}", stdout.trim()))
}

fn pip_install() -> anyhow::Result<String> {
    let python = tools::find_python().context("no Python interpreter on PATH")?;
    let output = tools::command(&python)
        .args(["-m", "pip", "install", "-U", "yt-dlp"])
        .output()
        .with_context(|| format!("failed to run {} -m pip", python.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("no output");
        bail!("pip exited with {}: {}", output.status, reason.trim());
    }
    Ok(format!("yt-dlp installed via {} -m pip", python.display()))
}

fn release_asset() -> &'static str {
    if cfg!(windows) {
        "yt-dlp.exe"
    } else if cfg!(target_os = "macos") {
        "yt-dlp_macos"
    } else if cfg!(target_arch = "aarch64") {
        "yt-dlp_linux_aarch64"
    } else {
        "yt-dlp_linux"
    }
}

fn download_release(destination: &Path) -> anyhow::Result<String> {
    let url = format!("{}/{}", RELEASE_BASE_URL, release_asset());
    log::info!("downloading {} to {}", url, destination.display());

    let client = reqwest::blocking::Client::builder()
        .user_agent(APP_NAME)
        .build()
        .context("failed to build HTTP client")?;
    let body: Bytes = client
        .get(&url)
        .send()
        .and_then(|resp| resp.error_for_status())
        .with_context(|| format!("request to {url} failed"))?
        .bytes()
        .context("failed to read release body")?;

    if body.len() < MIN_RELEASE_SIZE {
        bail!("downloaded yt-dlp is unexpectedly small ({} bytes)", body.len());
    }

    write_executable(destination, &body)?;
    Ok(format!("yt-dlp release binary installed at {}", destination.display()))
}

fn write_executable(destination: &Path, body: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create {}", parent.display()))?;
    }

    let tmp_path = destination.with_extension("download");
    {
        let mut file = fs::File::create(&tmp_path)
            .with_context(|| format!("could not create {}", tmp_path.display()))?;
        file.write_all(body)?;
        file.flush()?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o755))?;
    }

    if destination.exists() {
        let _ = fs::remove_file(destination);
    }
    fs::rename(&tmp_path, destination)
        .with_context(|| format!("could not move yt-dlp into {}", destination.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_sink::LogBuffer;
    use std::cell::Cell;
    use std::sync::Mutex;

    fn launcher() -> Launcher {
        Launcher::binary("/usr/bin/yt-dlp")
    }

    #[test]
    fn packaged_without_ytdlp_warns_and_never_installs() {
        let log = Mutex::new(LogBuffer::default());
        let found = ensure_with(
            Distribution::Packaged,
            true,
            &log,
            || None,
            |_| panic!("packaged builds must not self-install"),
        );

        assert!(found.is_none());
        assert!(log.into_inner().unwrap().contains("install yt-dlp manually"));
    }

    #[test]
    fn packaged_with_ytdlp_is_silent() {
        let log = Mutex::new(LogBuffer::default());
        let found = ensure_with(Distribution::Packaged, true, &log, || Some(launcher()), |_| {
            panic!("no install expected")
        });
        assert_eq!(found, Some(launcher()));
        assert!(log.into_inner().unwrap().lines().is_empty());
    }

    #[test]
    fn source_build_upgrades_before_use() {
        let log = Mutex::new(LogBuffer::default());
        let installs = Cell::new(0);
        let found = ensure_with(Distribution::Source, true, &log, || Some(launcher()), |current| {
            assert_eq!(current, Some(&launcher()));
            installs.set(installs.get() + 1);
            Ok("upgraded".into())
        });

        assert_eq!(found, Some(launcher()));
        assert_eq!(installs.get(), 1);
        assert!(log.into_inner().unwrap().lines().is_empty());
    }

    #[test]
    fn source_build_skips_update_when_disabled() {
        let log = Mutex::new(LogBuffer::default());
        let found = ensure_with(Distribution::Source, false, &log, || Some(launcher()), |_| {
            panic!("auto update is off")
        });
        assert_eq!(found, Some(launcher()));
    }

    #[test]
    fn failed_update_keeps_existing_launcher_quietly() {
        let log = Mutex::new(LogBuffer::default());
        let found = ensure_with(Distribution::Source, true, &log, || Some(launcher()), |_| {
            bail!("index unreachable")
        });
        assert_eq!(found, Some(launcher()));
        assert!(log.into_inner().unwrap().lines().is_empty());
    }

    #[test]
    fn failed_install_is_a_warning_not_an_error() {
        let log = Mutex::new(LogBuffer::default());
        let found = ensure_with(Distribution::Source, true, &log, || None, |_| {
            bail!("pip exploded")
        });

        assert!(found.is_none());
        let log = log.into_inner().unwrap();
        assert_eq!(log.lines()[0], "yt-dlp not found, installing...");
        assert!(log.last().unwrap().starts_with("Warning: could not install yt-dlp"));
        assert!(log.contains("pip exploded"));
    }

    #[test]
    fn successful_install_is_located_again() {
        let log = Mutex::new(LogBuffer::default());
        let installed = Cell::new(false);
        let found = ensure_with(
            Distribution::Source,
            true,
            &log,
            || installed.get().then(launcher),
            |_| {
                installed.set(true);
                Ok("installed".into())
            },
        );
        assert_eq!(found, Some(launcher()));
    }

    #[test]
    fn release_binary_is_written_executable() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("bin").join(tools::executable_name("yt-dlp"));
        write_executable(&destination, b"#!/bin/sh\n").unwrap();
        write_executable(&destination, b"#!/bin/sh\necho new\n").unwrap();

        assert_eq!(fs::read(&destination).unwrap(), b"#!/bin/sh\necho new\n");
        assert!(!destination.with_extension("download").exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&destination).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }
}
