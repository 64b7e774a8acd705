use crate::localizations::Localizations;
use crate::log_sink::LogBuffer;
use crate::models::{AppState, FormatChoice, JobOutcome, FORMAT_CHOICES};
use crate::theme::*;

pub mod dialogs;

/// Which folder button was pressed this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderRequest {
    Music,
    Video,
}

pub fn render_url_input(
    ui: &mut egui::Ui,
    state: &mut AppState,
    localizer: &Localizations,
) -> egui::Response {
    ui.label(localizer.text("url-label", "Enter YouTube or YouTube Music URL:"));

    egui::Frame::group(ui.style())
        .fill(egui::Color32::WHITE)
        .stroke(egui::Stroke::new(1.0, egui::Color32::LIGHT_GRAY))
        .rounding(ROUNDING_FRAME)
        .show(ui, |ui| {
            ui.add_sized(
                [ui.available_width(), 28.0],
                egui::TextEdit::singleline(&mut state.url)
                    .hint_text(localizer.text("url-placeholder", ""))
                    .font(egui::FontId::proportional(15.0)),
            )
        })
        .inner
}

pub fn render_format_selector(ui: &mut egui::Ui, state: &mut AppState, localizer: &Localizations) {
    ui.horizontal(|ui| {
        ui.label(localizer.text("format-label", "Select Output Format:"));

        egui::ComboBox::from_id_source("format-selector")
            .selected_text(state.format.label())
            .width(200.0)
            .show_ui(ui, |ui| {
                for choice in FORMAT_CHOICES {
                    let text = match choice {
                        FormatChoice::Section(_) => egui::RichText::new(choice.label())
                            .color(SECONDARY_TEXT)
                            .italics(),
                        FormatChoice::Format(_) => egui::RichText::new(choice.label()),
                    };
                    ui.selectable_value(&mut state.format, choice, text);
                }
            });
    });
}

pub fn render_folder_buttons(
    ui: &mut egui::Ui,
    state: &AppState,
    localizer: &Localizations,
) -> Option<FolderRequest> {
    let mut request = None;

    ui.horizontal(|ui| {
        let music = ui
            .button(localizer.text("change-music-folder", "Change Music Folder"))
            .on_hover_text(state.music_dir.display().to_string());
        if music.clicked() {
            request = Some(FolderRequest::Music);
        }

        let video = ui
            .button(localizer.text("change-video-folder", "Change Video Folder"))
            .on_hover_text(state.video_dir.display().to_string());
        if video.clicked() {
            request = Some(FolderRequest::Video);
        }
    });

    request
}

/// Returns `(download_clicked, cancel_clicked)`.
pub fn render_job_buttons(
    ui: &mut egui::Ui,
    state: &AppState,
    localizer: &Localizations,
) -> (bool, bool) {
    let running = state.is_running();
    let mut clicks = (false, false);

    ui.horizontal(|ui| {
        let download = egui::Button::new(
            egui::RichText::new(localizer.text("download-button", "Download"))
                .size(BUTTON_FONT_SIZE)
                .color(BUTTON_MAIN_TEXT),
        )
        .min_size(MIN_SIZE_BUTTON)
        .fill(PRIMARY_BUTTON_BG)
        .rounding(ROUNDING_BUTTON)
        .stroke(egui::Stroke::new(1.0, BORDER_COLOR));
        clicks.0 = ui.add_enabled(!running, download).clicked();

        ui.add_space(10.0);

        let cancel = egui::Button::new(
            egui::RichText::new(localizer.text("cancel-button", "Cancel Download"))
                .size(BUTTON_FONT_SIZE)
                .color(BUTTON_MAIN_TEXT),
        )
        .min_size(MIN_SIZE_BUTTON)
        .fill(DANGER_BUTTON_BG)
        .rounding(ROUNDING_BUTTON)
        .stroke(egui::Stroke::new(1.0, BORDER_COLOR));
        clicks.1 = ui.add_enabled(running, cancel).clicked();
    });

    clicks
}

pub fn render_status(ui: &mut egui::Ui, state: &AppState, localizer: &Localizations) {
    let text = if state.is_running() {
        egui::RichText::new(localizer.text("status-running", "Downloading..."))
            .color(SECONDARY_TEXT)
    } else {
        match &state.last_outcome {
            Some(JobOutcome::Completed { destination }) => egui::RichText::new(format!(
                "{}: {}",
                localizer.text("status-complete", "Download complete"),
                destination.display()
            ))
            .color(TEXT_SUCCESS),
            Some(JobOutcome::Canceled { removed }) => egui::RichText::new(format!(
                "{} ({} partial files removed)",
                localizer.text("status-canceled", "Download canceled"),
                removed.len()
            ))
            .color(SECONDARY_TEXT),
            Some(JobOutcome::Failed(message)) => egui::RichText::new(format!(
                "{}: {}",
                localizer.text("status-failed", "Download failed"),
                message
            ))
            .color(TEXT_ERROR),
            Some(JobOutcome::Rejected) | None => {
                egui::RichText::new(localizer.text("status-ready", "Ready")).color(SECONDARY_TEXT)
            }
        }
    };

    ui.horizontal(|ui| {
        if state.is_running() {
            ui.spinner();
        }
        ui.label(text);
    });
}

pub fn render_log(ui: &mut egui::Ui, log: &LogBuffer, localizer: &Localizations) {
    ui.label(localizer.text("log-label", "Log:"));

    egui::Frame::group(ui.style())
        .fill(LOG_BG)
        .rounding(ROUNDING_FRAME)
        .show(ui, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for line in log.lines() {
                        ui.label(
                            egui::RichText::new(line)
                                .font(egui::FontId::monospace(LOG_FONT_SIZE)),
                        );
                    }
                });
        });
}
