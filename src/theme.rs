use egui::Color32;

// Buttons
pub const PRIMARY_BUTTON_BG: Color32 = Color32::from_rgb(76, 154, 255);
pub const DANGER_BUTTON_BG: Color32 = Color32::from_rgb(214, 69, 65);
pub const BUTTON_MAIN_TEXT: Color32 = Color32::from_rgb(255, 255, 255);

// Surfaces
pub const WINDOW_BG: Color32 = Color32::from_rgb(242, 242, 242);
pub const LOG_BG: Color32 = Color32::from_rgb(250, 250, 250);
pub const BORDER_COLOR: Color32 = Color32::from_rgba_premultiplied(60, 60, 67, 15);

// Text
pub const SECONDARY_TEXT: Color32 = Color32::from_rgb(110, 110, 115);
pub const TEXT_ERROR: Color32 = Color32::from_rgb(200, 30, 30);
pub const TEXT_SUCCESS: Color32 = Color32::from_rgb(30, 140, 60);

// Sizing & Spacing
pub const ROUNDING_FRAME: f32 = 4.0;
pub const ROUNDING_BUTTON: f32 = 6.0;
pub const MIN_SIZE_BUTTON: egui::Vec2 = egui::Vec2::new(160.0, 36.0);
pub const BUTTON_FONT_SIZE: f32 = 14.0;
pub const LOG_FONT_SIZE: f32 = 12.0;
