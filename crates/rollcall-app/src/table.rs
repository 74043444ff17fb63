//! Registered-user table: name, photo, roll number, gender, attendance
//! today, and median age.
//!
//! Rebuilt only when marked dirty (registration or a freshly logged
//! attendance row). Gender comes from the analysis model and is cached
//! against the reference image's modification time, so it is estimated
//! once per photo rather than on every rebuild.

use rollcall_core::AnalysisService;
use rollcall_store::{AgeEstimateStore, AttendanceLedger, IdentityStore};
use std::collections::HashMap;
use std::path::Path;
use std::time::SystemTime;

const THUMBNAIL_SIZE: u32 = 60;
const HEADERS: [&str; 6] = [
    "Registered Users",
    "Image",
    "Roll No.",
    "Gender",
    "Attendance",
    "Predicted Age",
];

/// Attendance cell state for one user.
enum AttendanceCell {
    Present,
    Absent,
    /// The ledger file exists but could not be read.
    Unreadable,
}

struct UserRow {
    name: String,
    roll_number: String,
    gender: String,
    attendance: AttendanceCell,
    age_text: String,
    thumbnail: Option<egui::TextureHandle>,
}

#[derive(Default)]
pub struct UserTable {
    rows: Vec<UserRow>,
    dirty: bool,
    gender_cache: HashMap<String, (SystemTime, String)>,
}

impl UserTable {
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reload every row from the stores.
    pub fn rebuild(
        &mut self,
        ctx: &egui::Context,
        identities: &IdentityStore,
        ledger: &AttendanceLedger,
        ages: &AgeEstimateStore,
        analysis: &mut AnalysisService,
    ) {
        self.dirty = false;
        self.rows.clear();

        for name in identities.registered_names() {
            let roll_number = identities.roll_number(&name);
            let image_path = identities.image_path(&name);

            let (thumbnail, gender) = match image::open(&image_path) {
                Ok(img) => {
                    let rgb = img.to_rgb8();
                    let thumb = image::imageops::thumbnail(&rgb, THUMBNAIL_SIZE, THUMBNAIL_SIZE);
                    let texture = ctx.load_texture(
                        format!("thumb-{name}"),
                        egui::ColorImage::from_rgb(
                            [thumb.width() as usize, thumb.height() as usize],
                            thumb.as_raw(),
                        ),
                        egui::TextureOptions::LINEAR,
                    );
                    let gender = self.gender_for(&name, &image_path, &rgb, analysis);
                    (Some(texture), gender)
                }
                Err(err) => {
                    tracing::warn!(name = %name, error = %err, "reference image unreadable");
                    (None, "Unknown".to_string())
                }
            };

            let attendance = match ledger.is_present_today(&name, &roll_number) {
                Ok(true) => AttendanceCell::Present,
                Ok(false) => AttendanceCell::Absent,
                Err(err) => {
                    tracing::warn!(error = %err, "attendance ledger unreadable");
                    AttendanceCell::Unreadable
                }
            };

            let age_text = age_text(ages.median_age(&name));

            self.rows.push(UserRow {
                name,
                roll_number,
                gender,
                attendance,
                age_text,
                thumbnail,
            });
        }

        tracing::debug!(rows = self.rows.len(), "user table rebuilt");
    }

    /// Gender for one reference image, served from the mtime-keyed cache
    /// when the photo has not changed since it was last analyzed.
    fn gender_for(
        &mut self,
        name: &str,
        image_path: &Path,
        rgb: &image::RgbImage,
        analysis: &mut AnalysisService,
    ) -> String {
        let modified = std::fs::metadata(image_path).and_then(|m| m.modified()).ok();

        if let Some(modified) = modified {
            if let Some((cached_time, cached)) = self.gender_cache.get(name) {
                if *cached_time == modified {
                    return cached.clone();
                }
            }
        }

        let gender = analysis
            .estimate_gender(rgb)
            .map(|g| g.to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        if let Some(modified) = modified {
            self.gender_cache
                .insert(name.to_string(), (modified, gender.clone()));
        }
        gender
    }

    pub fn ui(&self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            egui::Grid::new("user-table")
                .striped(true)
                .min_col_width(110.0)
                .show(ui, |ui| {
                    for header in HEADERS {
                        ui.strong(header);
                    }
                    ui.end_row();

                    for row in &self.rows {
                        ui.label(&row.name);
                        match &row.thumbnail {
                            Some(texture) => {
                                ui.image((
                                    texture.id(),
                                    egui::vec2(THUMBNAIL_SIZE as f32, THUMBNAIL_SIZE as f32),
                                ));
                            }
                            None => {
                                ui.label("Image not found");
                            }
                        }
                        ui.label(&row.roll_number);
                        ui.label(&row.gender);
                        match row.attendance {
                            AttendanceCell::Present => {
                                ui.colored_label(egui::Color32::DARK_GREEN, "Present ✔")
                            }
                            AttendanceCell::Absent => {
                                ui.colored_label(egui::Color32::RED, "Absent ✖")
                            }
                            AttendanceCell::Unreadable => {
                                ui.colored_label(egui::Color32::RED, "Error")
                            }
                        };
                        ui.label(&row.age_text);
                        ui.end_row();
                    }
                });
        });
    }
}

/// Median-age cell text.
fn age_text(median: Option<u32>) -> String {
    match median {
        Some(age) => format!("{age} years"),
        None => "Not yet predicted".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_text_with_median() {
        assert_eq!(age_text(Some(27)), "27 years");
    }

    #[test]
    fn test_age_text_without_median() {
        assert_eq!(age_text(None), "Not yet predicted");
    }
}
