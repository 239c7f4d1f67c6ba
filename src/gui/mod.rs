//! GUI module for the application.
//!
//! Provides the writing tablet window using egui/eframe.

pub mod render;
pub mod state;

use std::time::{Duration, Instant};

use chrono::Local;
use eframe::egui::{self, TextureHandle, Vec2};

use crate::capture::{DrawingSurface, Point};
use crate::ocr::TesseractEngine;
use crate::tablet::pipeline::{LowConfidenceReason, RecognitionPipeline, RecognitionResult};
use crate::tablet::queue::RecognitionReply;
use crate::tablet::{Composer, RecognitionWorker, TabletConfig, TickEvent};

use state::{GuiState, Notice, TabletStatus};

/// How often to wake up while a timer or recognition is outstanding.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Main GUI application struct.
pub struct TabletApp {
    composer: Composer,
    /// None if the worker thread could not be spawned.
    worker: Option<RecognitionWorker>,
    state: GuiState,
    canvas: Option<TextureHandle>,
    canvas_revision: Option<u64>,
}

impl TabletApp {
    pub fn new(config: &TabletConfig) -> Self {
        let pipeline = RecognitionPipeline::new(Box::new(TesseractEngine::new()), config);
        let worker = match RecognitionWorker::spawn(pipeline) {
            Ok(worker) => Some(worker),
            Err(e) => {
                crate::log(&format!("GUI: Recognition disabled: {:#}", e));
                None
            }
        };

        Self {
            composer: Composer::new(config),
            worker,
            state: GuiState::new(&config.target_sentences),
            canvas: None,
            canvas_revision: None,
        }
    }

    /// Re-uploads the canvas texture when the surface changed.
    fn sync_canvas(&mut self, ctx: &egui::Context) {
        let surface = self.composer.surface();
        if self.canvas_revision == Some(surface.revision()) && self.canvas.is_some() {
            return;
        }

        let image = surface_image(surface);
        match &mut self.canvas {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.canvas =
                    Some(ctx.load_texture("tablet_canvas", image, egui::TextureOptions::LINEAR));
            }
        }
        self.canvas_revision = Some(surface.revision());
    }

    /// Applies worker replies and advances the tablet's timers.
    fn poll_recognition(&mut self) {
        if let Some(worker) = &self.worker {
            while let Some(reply) = worker.try_recv() {
                match self.composer.apply_reply(reply) {
                    Ok(result) => crate::log(&format!("GUI: {}", result)),
                    Err(e) => crate::log(&format!("GUI: Ignoring reply: {}", e)),
                }
            }
        }

        match self.composer.tick(Instant::now()) {
            Some(TickEvent::Dispatch(request)) => {
                let ticket = request.ticket;
                let submitted = match &self.worker {
                    Some(worker) => worker.submit(request),
                    None => Err(anyhow::anyhow!("Recognition worker is not running")),
                };
                if let Err(e) = submitted {
                    crate::log(&format!("GUI: Failed to submit recognition: {}", e));
                    let reply = RecognitionReply {
                        ticket,
                        result: RecognitionResult::LowConfidence(
                            LowConfidenceReason::EngineFailure(e.to_string()),
                        ),
                    };
                    if let Err(e) = self.composer.apply_reply(reply) {
                        crate::log(&format!("GUI: {}", e));
                    }
                }
            }
            Some(TickEvent::TimedOut { ticket }) => {
                crate::log(&format!("GUI: Recognition {} abandoned after timeout", ticket));
            }
            None => {}
        }
    }

    /// Feeds canvas drags to the tablet.
    fn handle_canvas(&mut self, response: &egui::Response) {
        let origin = response.rect.min;
        let to_point = |pos: egui::Pos2| Point::new(pos.x - origin.x, pos.y - origin.y);

        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                if let Err(e) = self.composer.pointer_down(to_point(pos)) {
                    crate::log(&format!("GUI: {}", e));
                }
            }
        }

        if self.composer.is_drawing() && !response.contains_pointer() && !response.drag_stopped() {
            self.composer.pointer_leave(Instant::now());
            return;
        }

        if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.composer.pointer_move(to_point(pos));
            }
        }

        if response.drag_stopped() && self.composer.is_drawing() {
            if let Err(e) = self.composer.pointer_up(Instant::now()) {
                crate::log(&format!("GUI: {}", e));
            }
        }
    }

    /// Letters typed on the keyboard go straight into the text.
    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        let typed: Vec<String> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Text(text) => Some(text.clone()),
                    _ => None,
                })
                .collect()
        });

        for c in typed.iter().flat_map(|text| text.chars()) {
            self.composer.type_char(c);
        }
    }

    fn handle_start(&mut self) {
        self.composer.start_session(Local::now());
        self.state.reset_export();
    }

    fn handle_end(&mut self) {
        match self
            .composer
            .end_session(Local::now(), self.state.targets.current())
        {
            Ok(_) => self.state.reset_export(),
            Err(e) => {
                crate::log(&format!("GUI: {}", e));
                self.state.notice = Some(Notice::Error(e.to_string()));
            }
        }
    }

    fn handle_export(&mut self) {
        if !self.state.export_enabled(self.composer.session()) {
            return;
        }
        let Some(metrics) = self.composer.session().metrics() else {
            return;
        };
        self.state.notice = Some(match crate::session::save_session(metrics) {
            Ok(path) => {
                self.state.mark_exported();
                Notice::Exported(path)
            }
            Err(e) => {
                crate::log(&format!("GUI: Export failed: {:#}", e));
                Notice::Error(format!("{:#}", e))
            }
        });
    }
}

/// Converts the surface pixels to an egui image.
fn surface_image(surface: &DrawingSurface) -> egui::ColorImage {
    let size = [surface.width() as usize, surface.height() as usize];
    egui::ColorImage::from_gray(size, surface.pixels().as_raw())
}

impl eframe::App for TabletApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_recognition();
        self.handle_keyboard(ctx);

        let status = TabletStatus::from_composer(&self.composer);
        if status.is_busy() || self.composer.session().is_running() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(8.0);
            render::render_header(ui, &self.composer, &self.state);
            ui.add_space(8.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let actions = render::render_controls(ui, &self.composer, &self.state);
            if actions.start {
                self.handle_start();
            }
            if actions.end {
                self.handle_end();
            }
            if actions.clear {
                self.composer.clear();
            }
            if actions.next_sentence {
                let target = self.state.targets.advance().to_string();
                crate::log(&format!("GUI: Target sentence is now {:?}", target));
            }
            if actions.export {
                self.handle_export();
            }

            ui.add_space(8.0);

            self.sync_canvas(ctx);
            let surface = self.composer.surface();
            let size = Vec2::new(surface.width() as f32, surface.height() as f32);
            let response = render::render_canvas(
                ui,
                self.canvas.as_ref(),
                size,
                self.composer.failure_visible(),
            );
            self.handle_canvas(&response);

            ui.add_space(8.0);
            render::render_status(
                ui,
                &TabletStatus::from_composer(&self.composer),
                self.state.notice.as_ref(),
            );
            render::render_session(ui, &self.composer, &self.state);
        });
    }
}

/// Run the GUI application.
/// This function blocks until the window is closed.
pub fn run_gui(config: &TabletConfig) -> eframe::Result<()> {
    crate::log("GUI: Creating native options...");

    let width = config.canvas_width as f32 + 40.0;
    let height = config.canvas_height as f32 + 320.0;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(Vec2::new(width.max(560.0), height))
            .with_min_inner_size(Vec2::new(420.0, 480.0))
            .with_title("Handwriting Trainer"),
        ..Default::default()
    };

    let app = TabletApp::new(config);

    eframe::run_native(
        "Handwriting Trainer",
        options,
        Box::new(|_cc| {
            crate::log("GUI: Creating TabletApp instance...");
            Ok(Box::new(app))
        }),
    )
}
