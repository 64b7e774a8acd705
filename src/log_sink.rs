use std::sync::mpsc::Sender;
use std::sync::Mutex;

use crate::models::JobOutcome;

/// Destination for user-visible job log lines.
pub trait LogSink {
    fn append_line(&self, line: &str);

    /// Rewrites the running progress line in place.
    fn update_last_line(&self, line: &str);
}

/// Log shown in the window. Only lines written through `update_last_line`
/// are ever rewritten; regular notices stay put.
#[derive(Debug, Default, Clone)]
pub struct LogBuffer {
    lines: Vec<String>,
    last_is_progress: bool,
}

impl LogBuffer {
    pub fn append_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
        self.last_is_progress = false;
    }

    pub fn update_last_line(&mut self, line: impl Into<String>) {
        let line = line.into();
        match self.lines.last_mut() {
            Some(last) if self.last_is_progress => *last = line,
            _ => self.lines.push(line),
        }
        self.last_is_progress = true;
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    #[cfg(test)]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }
}

impl LogSink for Mutex<LogBuffer> {
    fn append_line(&self, line: &str) {
        if let Ok(mut buffer) = self.lock() {
            buffer.append_line(line);
        }
    }

    fn update_last_line(&self, line: &str) {
        if let Ok(mut buffer) = self.lock() {
            buffer.update_last_line(line);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Append(String),
    ReplaceLast(String),
    Finished(JobOutcome),
}

/// Worker-side sink. Lines travel to the GUI thread, which applies them to
/// its `LogBuffer`.
pub struct ChannelLog {
    tx: Sender<WorkerEvent>,
    ctx: egui::Context,
}

impl ChannelLog {
    pub fn new(tx: Sender<WorkerEvent>, ctx: egui::Context) -> Self {
        Self { tx, ctx }
    }

    pub fn finish(&self, outcome: JobOutcome) {
        self.send(WorkerEvent::Finished(outcome));
    }

    fn send(&self, event: WorkerEvent) {
        if let Err(e) = self.tx.send(event) {
            log::warn!("GUI is gone, dropping log event: {}", e);
            return;
        }
        self.ctx.request_repaint();
    }
}

impl LogSink for ChannelLog {
    fn append_line(&self, line: &str) {
        self.send(WorkerEvent::Append(line.to_string()));
    }

    fn update_last_line(&self, line: &str) {
        self.send(WorkerEvent::ReplaceLast(line.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn progress_line_is_rewritten_in_place() {
        let mut log = LogBuffer::default();
        log.append_line("Starting download in /music...");
        log.update_last_line("Downloading: a.webm - 10.0%");
        log.update_last_line("Downloading: a.webm - 55.0%");

        assert_eq!(
            log.lines(),
            ["Starting download in /music...", "Downloading: a.webm - 55.0%"]
        );
    }

    #[test]
    fn notices_are_never_overwritten() {
        let mut log = LogBuffer::default();
        log.update_last_line("Downloading: a.webm - 100%");
        log.append_line("Download finished, processing a.webm...");
        log.update_last_line("Downloading: b.webm - 1.0%");

        assert_eq!(log.lines().len(), 3);
        assert_eq!(log.lines()[1], "Download finished, processing a.webm...");
        assert_eq!(log.last(), Some("Downloading: b.webm - 1.0%"));
    }

    #[test]
    fn update_on_empty_log_appends() {
        let mut log = LogBuffer::default();
        log.update_last_line("Downloading: x");
        assert_eq!(log.lines(), ["Downloading: x"]);
    }

    #[test]
    fn channel_log_forwards_in_order() {
        let (tx, rx) = mpsc::channel();
        let sink = ChannelLog::new(tx, egui::Context::default());
        sink.append_line("one");
        sink.update_last_line("two");
        sink.finish(JobOutcome::Rejected);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            [
                WorkerEvent::Append("one".into()),
                WorkerEvent::ReplaceLast("two".into()),
                WorkerEvent::Finished(JobOutcome::Rejected),
            ]
        );
    }
}
