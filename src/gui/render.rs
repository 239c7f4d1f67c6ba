//! GUI rendering functions.
//!
//! Contains UI layout and component rendering logic.

use chrono::Local;
use eframe::egui::{self, Color32, RichText, TextureHandle, Vec2};

use super::state::{GuiState, Notice, TabletStatus, format_elapsed};
use crate::session::{ScoringMetrics, SessionState};
use crate::tablet::{Composer, RecognitionPhase};

/// Buttons pressed this frame.
#[derive(Debug, Default)]
pub struct ControlActions {
    pub start: bool,
    pub end: bool,
    pub clear: bool,
    pub next_sentence: bool,
    pub export: bool,
}

/// Render the typed text and the sentence to copy.
pub fn render_header(ui: &mut egui::Ui, composer: &Composer, state: &GuiState) {
    ui.horizontal(|ui| {
        ui.label("Target:");
        ui.label(
            RichText::new(state.targets.current())
                .size(20.0)
                .strong()
                .monospace(),
        );
    });

    ui.horizontal(|ui| {
        ui.label("Typed:");
        let typed = if composer.typed().is_empty() {
            RichText::new("(nothing yet)").color(Color32::GRAY)
        } else {
            RichText::new(composer.typed()).size(20.0).monospace()
        };
        ui.label(typed);
    });
}

/// Render the writing canvas.
///
/// Returns the drag response so the caller can feed pointer input to the tablet.
pub fn render_canvas(
    ui: &mut egui::Ui,
    texture: Option<&TextureHandle>,
    size: Vec2,
    failure_visible: bool,
) -> egui::Response {
    let (response, painter) = ui.allocate_painter(size, egui::Sense::drag());
    let rect = response.rect;

    if let Some(texture) = texture {
        painter.image(
            texture.id(),
            rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            Color32::WHITE,
        );
    } else {
        painter.rect_filled(rect, 0.0, Color32::WHITE);
    }

    let border = if failure_visible {
        egui::Stroke::new(3.0, Color32::from_rgb(200, 0, 0))
    } else {
        egui::Stroke::new(1.0, Color32::from_gray(160))
    };
    painter.rect_stroke(rect, 0.0, border);

    response
}

/// Render the session and canvas buttons.
pub fn render_controls(ui: &mut egui::Ui, composer: &Composer, state: &GuiState) -> ControlActions {
    let mut actions = ControlActions::default();
    let running = composer.session().is_running();

    ui.horizontal(|ui| {
        let start_label = if running { "↺ Restart" } else { "▶ Start" };
        if ui.button(RichText::new(start_label).size(16.0)).clicked() {
            actions.start = true;
        }

        ui.add_enabled_ui(running, |ui| {
            if ui.button(RichText::new("◼ End").size(16.0)).clicked() {
                actions.end = true;
            }
        });

        ui.add_space(12.0);

        let has_work = composer.surface().has_ink() || composer.phase() != RecognitionPhase::Idle;
        ui.add_enabled_ui(has_work, |ui| {
            if ui.button("Clear").clicked() {
                actions.clear = true;
            }
        });

        ui.add_enabled_ui(state.targets.len() > 1, |ui| {
            if ui.button("Next sentence").clicked() {
                actions.next_sentence = true;
            }
        });

        ui.add_enabled_ui(state.export_enabled(composer.session()), |ui| {
            if ui.button("Export").clicked() {
                actions.export = true;
            }
        });
    });

    actions
}

/// Render the tablet status line and any notice.
pub fn render_status(ui: &mut egui::Ui, status: &TabletStatus, notice: Option<&Notice>) {
    ui.horizontal(|ui| {
        ui.label("Status:");

        let color = match status {
            TabletStatus::Ready | TabletStatus::Drawing => Color32::GRAY,
            TabletStatus::Waiting | TabletStatus::Recognizing => Color32::from_rgb(0, 120, 200),
            TabletStatus::Recognized(_) => Color32::from_rgb(0, 150, 0),
            TabletStatus::Failed(_) => Color32::from_rgb(200, 0, 0),
        };

        if status.is_busy() {
            ui.spinner();
        }
        ui.label(RichText::new(status.status_text()).color(color));
    });

    if let Some(notice) = notice {
        let color = match notice {
            Notice::Exported(_) => Color32::from_rgb(0, 150, 0),
            Notice::Error(_) => Color32::from_rgb(200, 0, 0),
        };
        ui.label(RichText::new(notice.text()).color(color));
    }
}

/// Render the running session or the last session's metrics.
pub fn render_session(ui: &mut egui::Ui, composer: &Composer, state: &GuiState) {
    ui.add_space(8.0);
    ui.separator();
    ui.add_space(8.0);

    match composer.session().state() {
        SessionState::Running { started_at, .. } => {
            let elapsed = (Local::now() - *started_at).num_milliseconds() as f64 / 1000.0;
            ui.horizontal(|ui| {
                ui.label(RichText::new("Session running").strong());
                ui.label(format_elapsed(elapsed));
                ui.label(format!("{} letters", composer.session().letters()));
            });
        }
        SessionState::Idle | SessionState::Ended(_) => {
            if let Some(metrics) = composer.session().metrics() {
                render_metrics(ui, metrics);
                if !state.export_enabled(composer.session()) {
                    ui.label(RichText::new("Exported").color(Color32::GRAY));
                }
            } else {
                ui.label(RichText::new("Press Start, then write the target one letter at a time.").color(Color32::GRAY));
            }
        }
    }
}

fn render_metrics(ui: &mut egui::Ui, metrics: &ScoringMetrics) {
    ui.label(RichText::new("Last session").strong());

    egui::Grid::new("session_metrics")
        .num_columns(2)
        .spacing([24.0, 4.0])
        .show(ui, |ui| {
            ui.label("Duration:");
            ui.label(format!("{:.1} s", metrics.duration_seconds));
            ui.end_row();

            ui.label("Letters recognized:");
            ui.label(metrics.letters.to_string());
            ui.end_row();

            ui.label("Words per minute:");
            ui.label(format!("{:.2}", metrics.words_per_minute));
            ui.end_row();

            ui.label("Minimum string distance:");
            ui.label(metrics.minimum_string_distance.to_string());
            ui.end_row();

            ui.label("Typed:");
            ui.label(RichText::new(&metrics.typed).monospace());
            ui.end_row();

            ui.label("Target:");
            ui.label(RichText::new(&metrics.target).monospace());
            ui.end_row();
        });
}
