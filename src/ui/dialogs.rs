use std::path::{Path, PathBuf};

use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};

/// Native dialogs used by the window.
pub trait Dialogs {
    /// Blocking warning box.
    fn warn(&self, title: &str, message: &str);

    fn pick_folder(&self, title: &str, start: &Path) -> Option<PathBuf>;
}

pub struct RfdDialogs;

impl Dialogs for RfdDialogs {
    fn warn(&self, title: &str, message: &str) {
        MessageDialog::new()
            .set_level(MessageLevel::Warning)
            .set_title(title)
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }

    fn pick_folder(&self, title: &str, start: &Path) -> Option<PathBuf> {
        let mut dialog = FileDialog::new().set_title(title);
        if start.is_dir() {
            dialog = dialog.set_directory(start);
        }
        dialog.pick_folder()
    }
}
