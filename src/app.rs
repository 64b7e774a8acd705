use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::download::JobRunner;
use crate::localizations::Localizations;
use crate::log_sink::{ChannelLog, WorkerEvent};
use crate::models::{AppState, JobOutcome, JobPhase};
use crate::theme::*;
use crate::ui::{self, dialogs::Dialogs, FolderRequest};

pub struct TubeGrabApp {
    pub state: AppState,
    localizer: Localizations,
    runner: Arc<dyn JobRunner>,
    dialogs: Box<dyn Dialogs>,
    events_tx: Sender<WorkerEvent>,
    events_rx: Receiver<WorkerEvent>,
    cancel: Option<CancellationToken>,
    worker: Option<JoinHandle<()>>,
}

impl TubeGrabApp {
    pub fn new(
        settings: &Settings,
        runner: Arc<dyn JobRunner>,
        dialogs: Box<dyn Dialogs>,
        localizer: Localizations,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();

        let mut state = AppState::new(settings.music_dir.clone(), settings.video_dir.clone());
        state.log.append_line("Ready.");
        state.log.append_line(format!(
            "Default Music Folder: {}",
            state.music_dir.display()
        ));
        state.log.append_line(format!(
            "Default Video Folder: {}",
            state.video_dir.display()
        ));

        Self {
            state,
            localizer,
            runner,
            dialogs,
            events_tx,
            events_rx,
            cancel: None,
            worker: None,
        }
    }

    /// Validates the form and, if it passes, hands the job to a worker
    /// thread. Returns whether a worker was started.
    pub fn start_download(&mut self, ctx: &egui::Context) -> bool {
        if self.state.is_running() {
            return false;
        }

        let job = match self.state.build_job() {
            Ok(job) => job,
            Err(invalid) => {
                let (title_key, title) = invalid.title();
                let (message_key, message) = invalid.message();
                self.dialogs.warn(
                    &self.localizer.text(title_key, title),
                    &self.localizer.text(message_key, message),
                );
                return false;
            }
        };

        self.state
            .log
            .append_line(format!("Preparing to download: {}", job.url));

        let cancel = CancellationToken::new();
        let sink = ChannelLog::new(self.events_tx.clone(), ctx.clone());
        let runner = Arc::clone(&self.runner);
        let worker_cancel = cancel.clone();
        log::info!("starting job for {} as {}", job.url, job.format);

        let spawned = thread::Builder::new()
            .name("download-worker".into())
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    runner.run(&job, &sink, &worker_cancel)
                }))
                .unwrap_or_else(|_| {
                    log::error!("download worker panicked");
                    JobOutcome::Failed("internal error in download worker".to_string())
                });
                sink.finish(outcome);
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                self.cancel = Some(cancel);
                self.state.phase = JobPhase::Running;
                self.state.last_outcome = None;
                ctx.request_repaint();
                true
            }
            Err(e) => {
                log::error!("could not spawn download worker: {}", e);
                self.state.log.append_line(format!("Error: {e}"));
                false
            }
        }
    }

    pub fn cancel_download(&mut self) {
        if !self.state.is_running() {
            return;
        }
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
            self.state.log.append_line("Attempting to cancel download...");
        }
    }

    pub fn change_folder(&mut self, request: FolderRequest) {
        let (title, current) = match request {
            FolderRequest::Music => (
                self.localizer
                    .text("pick-music-title", "Select Music Download Folder"),
                &self.state.music_dir,
            ),
            FolderRequest::Video => (
                self.localizer
                    .text("pick-video-title", "Select Video Download Folder"),
                &self.state.video_dir,
            ),
        };

        let Some(dir) = self.dialogs.pick_folder(&title, current) else {
            return;
        };

        match request {
            FolderRequest::Music => {
                self.state
                    .log
                    .append_line(format!("Music folder changed to: {}", dir.display()));
                self.state.music_dir = dir;
            }
            FolderRequest::Video => {
                self.state
                    .log
                    .append_line(format!("Video folder changed to: {}", dir.display()));
                self.state.video_dir = dir;
            }
        }
    }

    /// Applies everything the worker sent since the last frame.
    pub fn process_worker_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                WorkerEvent::Append(line) => self.state.log.append_line(line),
                WorkerEvent::ReplaceLast(line) => self.state.log.update_last_line(line),
                WorkerEvent::Finished(outcome) => self.finish_job(outcome),
            }
        }
    }

    fn finish_job(&mut self, outcome: JobOutcome) {
        log::info!("job finished: {:?}", outcome);
        self.state.phase = JobPhase::Idle;
        self.state.last_outcome = Some(outcome);
        self.cancel = None;
        if let Some(worker) = self.worker.take() {
            // Finished is the worker's last act
            let _ = worker.join();
        }
    }

    pub fn update_ui(&mut self, ctx: &egui::Context) {
        self.process_worker_events();

        let frame = egui::Frame::central_panel(&ctx.style()).fill(WINDOW_BG);
        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            ui.heading(
                self.localizer
                    .text("app-title", "YouTube / YouTube Music Downloader"),
            );
            ui.add_space(12.0);

            let url_response = ui::render_url_input(ui, &mut self.state, &self.localizer);
            if url_response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                self.start_download(ctx);
            }

            ui.add_space(8.0);
            ui::render_format_selector(ui, &mut self.state, &self.localizer);
            ui.add_space(8.0);

            if let Some(request) = ui::render_folder_buttons(ui, &self.state, &self.localizer) {
                self.change_folder(request);
            }
            ui.add_space(8.0);

            let (download, cancel) = ui::render_job_buttons(ui, &self.state, &self.localizer);
            if download {
                self.start_download(ctx);
            }
            if cancel {
                self.cancel_download();
            }

            ui.add_space(8.0);
            ui::render_status(ui, &self.state, &self.localizer);
            ui.add_space(4.0);
            ui::render_log(ui, &self.state.log, &self.localizer);
        });
    }
}

impl eframe::App for TubeGrabApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_ui(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_sink::LogSink;
    use crate::models::{FormatChoice, JobRequest, MediaFormat, MediaKind};
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};
    use unic_langid::langid;

    #[derive(Default)]
    struct DialogLog {
        warnings: Vec<(String, String)>,
        next_folder: Option<PathBuf>,
    }

    struct FakeDialogs(Rc<RefCell<DialogLog>>);

    impl Dialogs for FakeDialogs {
        fn warn(&self, title: &str, message: &str) {
            self.0
                .borrow_mut()
                .warnings
                .push((title.to_string(), message.to_string()));
        }

        fn pick_folder(&self, _title: &str, _start: &Path) -> Option<PathBuf> {
            self.0.borrow_mut().next_folder.take()
        }
    }

    #[derive(Clone, Copy)]
    enum Behavior {
        Complete,
        WaitForCancel,
        Panic,
    }

    struct FakeRunner {
        behavior: Behavior,
        jobs: Mutex<Vec<JobRequest>>,
    }

    impl FakeRunner {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                jobs: Mutex::new(Vec::new()),
            })
        }

        fn jobs(&self) -> Vec<JobRequest> {
            self.jobs.lock().unwrap().clone()
        }
    }

    impl JobRunner for FakeRunner {
        fn run(&self, job: &JobRequest, sink: &dyn LogSink, cancel: &CancellationToken) -> JobOutcome {
            self.jobs.lock().unwrap().push(job.clone());
            match self.behavior {
                Behavior::Complete => {
                    sink.update_last_line("Downloading: x - 50%");
                    sink.update_last_line("Downloading: x - 100%");
                    JobOutcome::Completed {
                        destination: job.music_dir.clone(),
                    }
                }
                Behavior::WaitForCancel => {
                    let deadline = Instant::now() + Duration::from_secs(10);
                    while !cancel.is_cancelled() && Instant::now() < deadline {
                        thread::sleep(Duration::from_millis(2));
                    }
                    sink.append_line("Download canceled.");
                    JobOutcome::Canceled { removed: Vec::new() }
                }
                Behavior::Panic => panic!("boom"),
            }
        }
    }

    struct Harness {
        app: TubeGrabApp,
        runner: Arc<FakeRunner>,
        dialogs: Rc<RefCell<DialogLog>>,
        ctx: egui::Context,
    }

    fn harness(behavior: Behavior) -> Harness {
        let mut settings = Settings::with_home(Path::new("/home/u"), None);
        settings.music_dir = PathBuf::from("/home/u/Music");
        settings.video_dir = PathBuf::from("/home/u/Videos");
        let runner = FakeRunner::new(behavior);
        let dialogs = Rc::new(RefCell::new(DialogLog::default()));
        let app = TubeGrabApp::new(
            &settings,
            runner.clone(),
            Box::new(FakeDialogs(dialogs.clone())),
            Localizations::with_languages(&[langid!("en-US")]),
        );
        Harness {
            app,
            runner,
            dialogs,
            ctx: egui::Context::default(),
        }
    }

    fn wait_until_idle(app: &mut TubeGrabApp) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while app.state.is_running() {
            assert!(Instant::now() < deadline, "worker never finished");
            app.process_worker_events();
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn starts_idle_with_default_folders_logged() {
        let h = harness(Behavior::Complete);
        assert_eq!(h.app.state.phase, JobPhase::Idle);
        assert_eq!(
            h.app.state.log.lines(),
            [
                "Ready.",
                "Default Music Folder: /home/u/Music",
                "Default Video Folder: /home/u/Videos"
            ]
        );
    }

    #[test]
    fn empty_url_shows_dialog_and_spawns_nothing() {
        let mut h = harness(Behavior::Complete);
        h.app.state.url = "   ".into();

        assert!(!h.app.start_download(&h.ctx));
        assert_eq!(h.app.state.phase, JobPhase::Idle);
        assert!(h.app.worker.is_none());
        assert_eq!(
            h.dialogs.borrow().warnings,
            [(
                "Input Error".to_string(),
                "Please enter a valid YouTube or YouTube Music URL.".to_string()
            )]
        );
        assert_eq!(h.app.state.log.lines().len(), 3);
        assert!(h.runner.jobs().is_empty());
    }

    #[test]
    fn placeholder_format_shows_format_error() {
        let mut h = harness(Behavior::Complete);
        h.app.state.url = "https://youtu.be/abc123".into();
        h.app.state.format = FormatChoice::Section(MediaKind::Audio);

        assert!(!h.app.start_download(&h.ctx));
        assert!(h.app.worker.is_none());
        assert_eq!(h.dialogs.borrow().warnings[0].0, "Format Error");
        assert!(h.runner.jobs().is_empty());
    }

    #[test]
    fn completed_job_returns_to_idle() {
        let mut h = harness(Behavior::Complete);
        h.app.state.url = "https://youtu.be/abc123".into();
        h.app.state.format = FormatChoice::Format(MediaFormat::MP3);

        assert!(h.app.start_download(&h.ctx));
        assert!(h.app.state.is_running());
        wait_until_idle(&mut h.app);

        assert_eq!(
            h.app.state.last_outcome,
            Some(JobOutcome::Completed {
                destination: PathBuf::from("/home/u/Music")
            })
        );
        assert!(h.app.worker.is_none());
        assert!(h.app.cancel.is_none());
        let lines = h.app.state.log.lines();
        assert_eq!(lines[3], "Preparing to download: https://youtu.be/abc123");
        assert_eq!(lines[4], "Downloading: x - 100%");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn cancel_reaches_worker_and_returns_to_idle() {
        let mut h = harness(Behavior::WaitForCancel);
        h.app.state.url = "https://youtu.be/abc123".into();

        assert!(h.app.start_download(&h.ctx));
        // second submission while running is ignored
        assert!(!h.app.start_download(&h.ctx));
        h.app.cancel_download();
        wait_until_idle(&mut h.app);

        assert_eq!(
            h.app.state.last_outcome,
            Some(JobOutcome::Canceled { removed: Vec::new() })
        );
        assert!(h.app.state.log.contains("Attempting to cancel download..."));
        assert!(h.app.state.log.contains("Download canceled."));
        assert_eq!(h.runner.jobs().len(), 1);
    }

    #[test]
    fn cancel_while_idle_is_a_no_op() {
        let mut h = harness(Behavior::Complete);
        h.app.cancel_download();
        assert_eq!(h.app.state.log.lines().len(), 3);
    }

    #[test]
    fn folder_change_applies_to_next_job_only() {
        let mut h = harness(Behavior::WaitForCancel);
        h.app.state.url = "https://youtu.be/abc123".into();
        assert!(h.app.start_download(&h.ctx));

        h.dialogs.borrow_mut().next_folder = Some(PathBuf::from("/data/music"));
        h.app.change_folder(FolderRequest::Music);
        assert_eq!(h.app.state.music_dir, PathBuf::from("/data/music"));
        assert!(h.app.state.log.contains("Music folder changed to: /data/music"));

        h.app.cancel_download();
        wait_until_idle(&mut h.app);
        assert!(h.app.start_download(&h.ctx));
        h.app.cancel_download();
        wait_until_idle(&mut h.app);

        let jobs = h.runner.jobs();
        assert_eq!(jobs[0].music_dir, PathBuf::from("/home/u/Music"));
        assert_eq!(jobs[1].music_dir, PathBuf::from("/data/music"));
    }

    #[test]
    fn dismissed_folder_picker_changes_nothing() {
        let mut h = harness(Behavior::Complete);
        h.app.change_folder(FolderRequest::Video);
        assert_eq!(h.app.state.video_dir, PathBuf::from("/home/u/Videos"));
        assert_eq!(h.app.state.log.lines().len(), 3);

        h.dialogs.borrow_mut().next_folder = Some(PathBuf::from("/data/video"));
        h.app.change_folder(FolderRequest::Video);
        assert_eq!(h.app.state.video_dir, PathBuf::from("/data/video"));
        assert_eq!(
            h.app.state.log.last(),
            Some("Video folder changed to: /data/video")
        );
    }

    #[test]
    fn worker_panic_still_returns_to_idle() {
        let mut h = harness(Behavior::Panic);
        h.app.state.url = "https://youtu.be/abc123".into();

        assert!(h.app.start_download(&h.ctx));
        wait_until_idle(&mut h.app);
        assert!(matches!(
            h.app.state.last_outcome,
            Some(JobOutcome::Failed(_))
        ));
    }
}
