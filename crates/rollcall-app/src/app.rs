//! The UI controller: menu / register / recognize screens around a
//! synchronous webcam loop.
//!
//! One thread owns everything — the camera, the model sessions, and the
//! egui event loop. Recognition and analysis calls block the repaint
//! they run in; there is no timeout and no background worker. The
//! camera is held only while a capture screen is active.

use crate::config::Config;
use crate::table::UserTable;
use rollcall_core::{
    AnalysisService, FaceEmbedder, FaceLocator, FaceRegion, Identity, RecognitionService,
};
use rollcall_hw::Camera;
use rollcall_store::{AgeEstimateStore, AttendanceLedger, IdentityStore};

const PREVIEW_SIZE: egui::Vec2 = egui::Vec2::new(640.0, 480.0);
const OVERLAY_COLOR: egui::Color32 = egui::Color32::YELLOW;

/// Which view the controller is showing. Closing either capture screen
/// returns to the menu.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Screen {
    Menu,
    Registering,
    Recognizing,
}

pub struct RollcallApp {
    config: Config,
    locator: FaceLocator,
    recognition: RecognitionService,
    analysis: AnalysisService,
    identities: IdentityStore,
    ages: AgeEstimateStore,
    ledger: AttendanceLedger,

    screen: Screen,
    camera: Option<Camera>,
    preview: Option<egui::TextureHandle>,
    name_input: String,
    roll_input: String,
    status: Option<String>,
    table: UserTable,
}

impl RollcallApp {
    /// Build every service up front, failing fast on missing models or
    /// an uncreatable ledger. The camera is opened lazily when a capture
    /// screen is entered.
    pub fn new(_cc: &eframe::CreationContext<'_>, config: Config) -> anyhow::Result<Self> {
        let locator = FaceLocator::load(&config.cascade_model_path())?;
        let embedder = FaceEmbedder::load(&config.embedding_model_path())?;
        let recognition =
            RecognitionService::new(embedder, config.images_dir.clone(), config.match_threshold);
        let analysis =
            AnalysisService::load(&config.genderage_model_path(), &config.emotion_model_path())?;
        let identities = IdentityStore::new(config.images_dir.clone(), config.rolls_dir.clone());
        let ages = AgeEstimateStore::new(config.ages_dir.clone());
        let ledger = AttendanceLedger::open(config.attendance_path.clone())?;

        let mut table = UserTable::default();
        table.mark_dirty();

        Ok(Self {
            config,
            locator,
            recognition,
            analysis,
            identities,
            ages,
            ledger,
            screen: Screen::Menu,
            camera: None,
            preview: None,
            name_input: String::new(),
            roll_input: String::new(),
            status: None,
            table,
        })
    }

    fn menu_ui(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.heading("Face Recognition Attendance");
        });
        if let Some(status) = &self.status {
            ui.label(status.clone());
        }
        ui.separator();

        ui.horizontal(|ui| {
            ui.label("Name:");
            ui.text_edit_singleline(&mut self.name_input);
            ui.label("Roll No:");
            ui.text_edit_singleline(&mut self.roll_input);

            // Empty input aborts registration silently: the button simply
            // stays disabled until both fields are filled.
            let ready =
                !self.name_input.trim().is_empty() && !self.roll_input.trim().is_empty();
            if ui
                .add_enabled(ready, egui::Button::new("Register"))
                .clicked()
            {
                self.enter_capture(Screen::Registering);
            }
            if ui.button("Login").clicked() {
                self.enter_capture(Screen::Recognizing);
            }
        });
        ui.separator();

        if self.table.is_dirty() {
            self.table.rebuild(
                ui.ctx(),
                &self.identities,
                &self.ledger,
                &self.ages,
                &mut self.analysis,
            );
        }
        self.table.ui(ui);
    }

    fn register_ui(&mut self, ui: &mut egui::Ui) {
        let name = self.name_input.trim().to_string();
        let roll_number = self.roll_input.trim().to_string();
        ui.heading(format!("Register {name}"));

        let Some(frame) = self.grab_frame() else {
            self.leave_capture(Some("Camera read failed — returning to menu".into()));
            return;
        };
        let regions = self.locator.detect(&frame);

        let mut overlays = Vec::new();
        let prompt = if let Some(first) = regions.first() {
            overlays.push((*first, Some("Press Space to capture".to_string())));
            "Face found — press Space (or Capture) to take the reference photo"
        } else {
            "Align your face with the camera"
        };
        self.show_preview(ui, &frame, &overlays);
        ui.label(prompt);

        let (capture_clicked, back_clicked) = ui
            .horizontal(|ui| (ui.button("Capture").clicked(), ui.button("Back").clicked()))
            .inner;
        let capture = capture_clicked || ui.input(|i| i.key_pressed(egui::Key::Space));
        let cancel = back_clicked || ui.input(|i| i.key_pressed(egui::Key::Escape));

        if capture {
            if let Some(first) = regions.first() {
                let crop = first.crop(&frame);
                match self.identities.register(&name, &roll_number, &crop) {
                    Ok(()) => {
                        self.table.mark_dirty();
                        self.name_input.clear();
                        self.roll_input.clear();
                        self.leave_capture(Some(format!("{name} registered successfully")));
                    }
                    Err(err) => {
                        tracing::error!(name = %name, error = %err, "registration failed");
                        self.leave_capture(Some(format!("Registration failed: {err}")));
                    }
                }
                return;
            }
        }
        if cancel {
            self.leave_capture(None);
        }
    }

    fn recognize_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Recognition");

        let Some(frame) = self.grab_frame() else {
            self.leave_capture(Some("Camera read failed — returning to menu".into()));
            return;
        };
        let regions = self.locator.detect(&frame);

        let mut overlays = Vec::new();
        let mut logged_any = false;

        for region in &regions {
            let crop = region.crop(&frame);
            let Identity::Known(name) = self.recognition.identify(&crop) else {
                continue;
            };

            let roll_number = self.identities.roll_number(&name);
            let logged = match self.ledger.log(&name, &roll_number) {
                Ok(logged) => logged,
                Err(err) => {
                    tracing::warn!(name = %name, error = %err, "attendance logging failed");
                    false
                }
            };
            if !logged {
                continue;
            }
            logged_any = true;

            let age = self.analysis.estimate_age(&crop);
            if let Some(age) = age {
                if let Err(err) = self.ages.record(&name, age) {
                    tracing::warn!(name = %name, error = %err, "age record update failed");
                }
            }
            let emotion = self.analysis.estimate_emotion(&crop);
            overlays.push((*region, Some(overlay_text(&name, age, emotion))));
        }

        if logged_any {
            self.table.mark_dirty();
        }

        self.show_preview(ui, &frame, &overlays);

        let back_clicked = ui.button("Back").clicked();
        if back_clicked || ui.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.leave_capture(None);
            return;
        }

        // Live view of the roster while recognition runs; freshly logged
        // rows show up as soon as they are written.
        ui.separator();
        if self.table.is_dirty() {
            self.table.rebuild(
                ui.ctx(),
                &self.identities,
                &self.ledger,
                &self.ages,
                &mut self.analysis,
            );
        }
        self.table.ui(ui);
    }

    /// Open the camera and switch to a capture screen. On failure the
    /// menu stays up with a status message.
    fn enter_capture(&mut self, screen: Screen) {
        match Camera::open(&self.config.camera_device) {
            Ok(camera) => {
                self.camera = Some(camera);
                self.status = None;
                self.screen = screen;
            }
            Err(err) => {
                tracing::warn!(device = %self.config.camera_device, error = %err, "camera open failed");
                self.status = Some(format!("Camera error: {err}"));
            }
        }
    }

    /// Return to the menu, releasing the camera.
    fn leave_capture(&mut self, status: Option<String>) {
        self.camera = None;
        self.preview = None;
        self.status = status;
        self.screen = Screen::Menu;
    }

    /// One frame from the camera, or `None` after a read failure (which
    /// ends the capture screen).
    fn grab_frame(&mut self) -> Option<image::RgbImage> {
        let camera = self.camera.as_ref()?;
        match camera.capture_frame() {
            Ok(frame) => Some(frame.image),
            Err(err) => {
                tracing::warn!(error = %err, "camera capture failed");
                None
            }
        }
    }

    /// Paint the camera frame with face boxes and labels on top.
    fn show_preview(
        &mut self,
        ui: &mut egui::Ui,
        frame: &image::RgbImage,
        overlays: &[(FaceRegion, Option<String>)],
    ) {
        let (width, height) = frame.dimensions();
        let color_image =
            egui::ColorImage::from_rgb([width as usize, height as usize], frame.as_raw());
        match &mut self.preview {
            Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                self.preview = Some(ui.ctx().load_texture(
                    "camera-preview",
                    color_image,
                    egui::TextureOptions::LINEAR,
                ))
            }
        }
        let Some(texture) = &self.preview else {
            return;
        };

        let response = ui.add(egui::Image::new(texture).fit_to_exact_size(PREVIEW_SIZE));
        let scale_x = response.rect.width() / width as f32;
        let scale_y = response.rect.height() / height as f32;
        let painter = ui.painter_at(response.rect);

        for (region, label) in overlays {
            let rect = egui::Rect::from_min_size(
                response.rect.min
                    + egui::vec2(region.x as f32 * scale_x, region.y as f32 * scale_y),
                egui::vec2(
                    region.width as f32 * scale_x,
                    region.height as f32 * scale_y,
                ),
            );
            painter.rect_stroke(rect, 0.0, egui::Stroke::new(2.0, OVERLAY_COLOR));
            if let Some(text) = label {
                painter.text(
                    rect.left_top() + egui::vec2(0.0, -4.0),
                    egui::Align2::LEFT_BOTTOM,
                    text,
                    egui::FontId::proportional(14.0),
                    OVERLAY_COLOR,
                );
            }
        }
    }
}

impl eframe::App for RollcallApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| match self.screen {
            Screen::Menu => self.menu_ui(ui),
            Screen::Registering => self.register_ui(ui),
            Screen::Recognizing => self.recognize_ui(ui),
        });

        // Capture screens are a frame loop: repaint continuously.
        if self.screen != Screen::Menu {
            ctx.request_repaint();
        }
    }
}

/// On-frame label: "name, age, emotion", dropping the parts that failed.
fn overlay_text(name: &str, age: Option<u32>, emotion: Option<&'static str>) -> String {
    let mut text = name.to_string();
    if let Some(age) = age {
        text.push_str(&format!(", {age}"));
    }
    if let Some(emotion) = emotion {
        text.push_str(&format!(", {emotion}"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_text_full() {
        assert_eq!(overlay_text("Alice", Some(27), Some("happiness")), "Alice, 27, happiness");
    }

    #[test]
    fn test_overlay_text_partial() {
        assert_eq!(overlay_text("Alice", None, Some("neutral")), "Alice, neutral");
        assert_eq!(overlay_text("Alice", Some(31), None), "Alice, 31");
    }

    #[test]
    fn test_overlay_text_name_only() {
        assert_eq!(overlay_text("Alice", None, None), "Alice");
    }
}
