//! Main window: egui/eframe application.
//!
//! # Architecture
//!
//! [`DocNarratorApp`] is the top-level [`eframe::App`].  It owns the
//! document state and three channel receivers, all drained with `try_recv`
//! at the start of every frame:
//!
//! * `picked_rx`   : the path chosen in the native file dialog (or `None`).
//! * `load_rx`     : [`LoadedDocument`]s produced on the tokio blocking pool.
//! * `narration_rx`: [`NarrationEvent`]s posted by the narration thread.
//!
//! # Layout
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                [ Upload File ]                │
//! │ Extracted Text:                               │
//! │ ┌───────────────────────────────────────────┐ │
//! │ │ (scrollable, read-only)                   │ │
//! │ └───────────────────────────────────────────┘ │
//! │ Summarized Text:                              │
//! │ ┌───────────────────────────────────────────┐ │
//! │ │ (scrollable, spoken sentence highlighted) │ │
//! │ └───────────────────────────────────────────┘ │
//! │      [ Speak ]  [ Stop ]  [ Re-Summarize ]    │
//! │ status line                                   │
//! └───────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use eframe::egui;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::config::{AppConfig, OcrConfig};
use crate::extract::{extract, DocumentKind};
use crate::narration::{
    apply_event, EngineFactory, NarrationController, NarrationEvent, TagStyle, TextSurface,
};
use crate::summarize::{summarize, SummaryMode};

/// Window title.
pub const APP_TITLE: &str = "AI Text Summarizer with Speech";

/// File dialog filters, in the order they are offered.
pub const FILE_FILTERS: &[(&str, &[&str])] = &[
    ("All Supported Files", DocumentKind::ALL_EXTENSIONS),
    ("Image Files", DocumentKind::IMAGE_EXTENSIONS),
    ("PDF Files", DocumentKind::PDF_EXTENSIONS),
    ("Word Files", DocumentKind::DOCUMENT_EXTENSIONS),
    ("Text Files", DocumentKind::TEXT_EXTENSIONS),
];

// ---------------------------------------------------------------------------
// Document loading
// ---------------------------------------------------------------------------

/// Outcome of loading one file: what goes in each pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub path: PathBuf,
    /// Text for the extracted pane; `"Error: …"` when extraction failed.
    pub extracted: String,
    /// Source for summaries.  `None` when extraction failed, in which case
    /// nothing is summarized.
    pub source: Option<String>,
    /// Primary summary of `source`, empty when extraction failed.
    pub summary: String,
}

/// Extract `path` and summarize the result.  Runs on a blocking thread.
pub fn load_document(path: &Path, ocr: &OcrConfig) -> LoadedDocument {
    let kind = DocumentKind::from_path(path);
    log::info!("loading {} as {:?}", path.display(), kind);

    match extract(path, kind, ocr) {
        Ok(extracted) => {
            let text = extracted.into_text();
            let summary = summarize(&text, SummaryMode::Primary);
            LoadedDocument {
                path: path.to_path_buf(),
                extracted: text.clone(),
                source: Some(text),
                summary,
            }
        }
        Err(e) => {
            log::error!("extraction failed for {}: {e}", path.display());
            LoadedDocument {
                path: path.to_path_buf(),
                extracted: format!("Error: {e}"),
                source: None,
                summary: String::new(),
            }
        }
    }
}

/// Native file dialog with the supported-format filters.
fn file_dialog() -> rfd::AsyncFileDialog {
    FILE_FILTERS
        .iter()
        .fold(rfd::AsyncFileDialog::new().set_title("Upload File"), |dialog, &(name, exts)| {
            dialog.add_filter(name, exts)
        })
}

// ---------------------------------------------------------------------------
// DocNarratorApp
// ---------------------------------------------------------------------------

/// eframe application: the summarizer window.
pub struct DocNarratorApp {
    // ── Document ─────────────────────────────────────────────────────────
    current_file: Option<PathBuf>,
    extracted: String,
    /// Text the summaries are made from; `None` until a file loads cleanly.
    source: Option<String>,
    summary: TextSurface,

    // ── Narration ────────────────────────────────────────────────────────
    narrator: NarrationController,
    narration_rx: mpsc::UnboundedReceiver<NarrationEvent>,
    highlight: TagStyle,

    // ── Background work ──────────────────────────────────────────────────
    runtime: Handle,
    picked_tx: mpsc::UnboundedSender<Option<PathBuf>>,
    picked_rx: mpsc::UnboundedReceiver<Option<PathBuf>>,
    load_tx: mpsc::UnboundedSender<LoadedDocument>,
    load_rx: mpsc::UnboundedReceiver<LoadedDocument>,
    dialog_open: bool,
    loading: bool,

    // ── Configuration ────────────────────────────────────────────────────
    config: AppConfig,
}

impl DocNarratorApp {
    /// Create the app.
    ///
    /// * `runtime`: handle used for the file dialog and extraction.
    /// * `engines`: speech engine factory handed to the narration controller.
    /// * `config` : loaded application configuration.
    pub fn new(runtime: Handle, engines: EngineFactory, config: AppConfig) -> Self {
        let (narration_tx, narration_rx) = mpsc::unbounded_channel();
        let (picked_tx, picked_rx) = mpsc::unbounded_channel();
        let (load_tx, load_rx) = mpsc::unbounded_channel();

        Self {
            current_file: None,
            extracted: String::new(),
            source: None,
            summary: TextSurface::new(),
            narrator: NarrationController::new(engines, config.speech.rate_wpm, narration_tx),
            narration_rx,
            highlight: TagStyle::background(config.ui.highlight_color),
            runtime,
            picked_tx,
            picked_rx,
            load_tx,
            load_rx,
            dialog_open: false,
            loading: false,
            config,
        }
    }

    // ── Actions ──────────────────────────────────────────────────────────

    /// Open the file dialog on the runtime; the choice arrives on `picked_rx`.
    fn open_file_dialog(&mut self, ctx: &egui::Context) {
        if self.dialog_open {
            return;
        }
        self.dialog_open = true;

        let tx = self.picked_tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let picked = file_dialog()
                .pick_file()
                .await
                .map(|handle| handle.path().to_path_buf());
            let _ = tx.send(picked);
            ctx.request_repaint();
        });
    }

    /// Clear both panes and load `path` in the background.
    fn load(&mut self, path: PathBuf, ctx: &egui::Context) {
        self.extracted.clear();
        self.source = None;
        self.summary.set_text("");
        self.current_file = Some(path.clone());
        self.loading = true;

        let tx = self.load_tx.clone();
        let ocr = self.config.ocr.clone();
        let ctx = ctx.clone();
        self.runtime.spawn_blocking(move || {
            let _ = tx.send(load_document(&path, &ocr));
            ctx.request_repaint();
        });
    }

    fn speak(&mut self) {
        if self.summary.text().is_empty() {
            log::debug!("speak: nothing to narrate");
            return;
        }
        let text = self.summary.text().to_string();
        self.narrator.start(&text);
    }

    fn resummarize(&mut self) {
        if let Some(source) = &self.source {
            let summary = summarize(source, SummaryMode::Alternate);
            self.summary.set_text(&summary);
        }
    }

    // ── Channel polling ──────────────────────────────────────────────────

    fn poll_picked(&mut self, ctx: &egui::Context) {
        while let Ok(picked) = self.picked_rx.try_recv() {
            self.dialog_open = false;
            if let Some(path) = picked {
                self.load(path, ctx);
            }
        }
    }

    fn poll_loaded(&mut self) {
        while let Ok(doc) = self.load_rx.try_recv() {
            // A newer pick supersedes an older load still in flight.
            if self.current_file.as_deref() != Some(doc.path.as_path()) {
                continue;
            }
            self.loading = false;
            self.extracted = doc.extracted;
            self.source = doc.source;
            self.summary.set_text(&doc.summary);
        }
    }

    fn poll_narration(&mut self) {
        while let Ok(event) = self.narration_rx.try_recv() {
            match &event {
                NarrationEvent::Sentence { session, .. } if !self.narrator.accepts(*session) => {
                    continue;
                }
                NarrationEvent::Finished { session, stopped } => {
                    log::debug!("narration session {session} ended (stopped: {stopped})");
                }
                _ => {}
            }
            apply_event(&mut self.summary, &event, self.highlight);
        }
    }

    fn take_dropped_file(&self, ctx: &egui::Context) -> Option<PathBuf> {
        ctx.input(|i| i.raw.dropped_files.iter().find_map(|f| f.path.clone()))
    }

    // ── Panels ───────────────────────────────────────────────────────────

    fn status_text(&self) -> String {
        let file = self
            .current_file
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "No file loaded".into());
        let activity = if self.loading {
            "Extracting…"
        } else {
            self.narrator.state().label()
        };
        format!("{file}  ·  {activity}")
    }

    fn draw_extracted(&self, ui: &mut egui::Ui, height: f32) {
        ui.label(egui::RichText::new("Extracted Text:").size(15.0));
        egui::ScrollArea::vertical()
            .id_salt("extracted")
            .max_height(height)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let mut view = self.extracted.as_str();
                ui.add(
                    egui::TextEdit::multiline(&mut view)
                        .desired_width(f32::INFINITY)
                        .desired_rows(12),
                );
            });
    }

    fn draw_summary(&mut self, ui: &mut egui::Ui, height: f32) {
        ui.label(egui::RichText::new("Summarized Text:").size(15.0));
        let font = egui::TextStyle::Body.resolve(ui.style());
        let color = ui.visuals().text_color();

        egui::ScrollArea::vertical()
            .id_salt("summary")
            .max_height(height)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let job = self.summary.layout_job(font, color, ui.available_width());
                let response = ui.add(egui::Label::new(job).wrap());

                if let Some(offset) = self.summary.take_scroll_target() {
                    // Rows are not tracked, so the target line is placed
                    // proportionally to its byte offset.
                    let len = self.summary.text().len().max(1);
                    let rect = response.rect;
                    let y = rect.top() + rect.height() * (offset as f32 / len as f32);
                    let target = egui::Rect::from_min_size(
                        egui::pos2(rect.left(), y),
                        egui::vec2(rect.width(), ui.text_style_height(&egui::TextStyle::Body)),
                    );
                    ui.scroll_to_rect(target, Some(egui::Align::Center));
                }
            });
    }

    fn draw_buttons(&mut self, ui: &mut egui::Ui) {
        let size = egui::vec2(120.0, 28.0);
        ui.horizontal(|ui| {
            let speak = egui::Button::new(egui::RichText::new("Speak").color(egui::Color32::WHITE))
                .fill(egui::Color32::from_rgb(34, 139, 34))
                .min_size(size);
            if ui.add_enabled(!self.narrator.is_active(), speak).clicked() {
                self.speak();
            }

            let stop = egui::Button::new(egui::RichText::new("Stop").color(egui::Color32::WHITE))
                .fill(egui::Color32::from_rgb(200, 40, 40))
                .min_size(size);
            if ui.add(stop).clicked() {
                self.narrator.stop();
            }

            let resummarize =
                egui::Button::new(egui::RichText::new("Re-Summarize").color(egui::Color32::BLACK))
                    .fill(egui::Color32::from_rgb(255, 165, 0))
                    .min_size(size);
            if ui.add_enabled(self.source.is_some(), resummarize).clicked() {
                self.resummarize();
            }
        });
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for DocNarratorApp {
    /// Called every frame by eframe.  Polls channels, then renders.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Poll non-blocking channels ------------------------------------
        self.poll_picked(ctx);
        self.poll_loaded();
        self.poll_narration();

        if let Some(path) = self.take_dropped_file(ctx) {
            self.load(path, ctx);
        }

        // Narration events arrive from another thread; keep polling while a
        // session may still post.
        if self.narrator.is_active() || self.loading {
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(
                egui::RichText::new(self.status_text())
                    .color(egui::Color32::from_rgb(140, 140, 140))
                    .size(12.0),
            );
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                let upload = egui::Button::new(
                    egui::RichText::new("Upload File").color(egui::Color32::BLACK),
                )
                .fill(egui::Color32::from_rgb(173, 216, 230))
                .min_size(egui::vec2(180.0, 28.0));
                if ui.add_enabled(!self.dialog_open, upload).clicked() {
                    self.open_file_dialog(ctx);
                }
            });
            ui.add_space(8.0);

            // Extracted pane takes ~60 % of the free height, the summary the rest.
            let free = (ui.available_height() - 120.0).max(120.0);
            self.draw_extracted(ui, free * 0.6);
            ui.add_space(6.0);
            self.draw_summary(ui, free * 0.4);
            ui.add_space(10.0);

            ui.vertical_centered(|ui| {
                ui.scope(|ui| {
                    ui.set_max_width(420.0);
                    self.draw_buttons(ui);
                });
            });
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("window closing; stopping narration");
        self.narrator.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn filters_cover_every_supported_extension() {
        assert_eq!(FILE_FILTERS[0].0, "All Supported Files");
        let named: Vec<&str> = FILE_FILTERS[1..]
            .iter()
            .flat_map(|(_, exts)| exts.iter().copied())
            .collect();
        assert_eq!(named, DocumentKind::ALL_EXTENSIONS);
    }

    #[test]
    fn text_file_is_extracted_and_summarized() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("story.txt");
        std::fs::write(
            &path,
            "  One happened. Two followed. Three came. Four went. Five stayed. Six left.\n",
        )
        .expect("write");

        let doc = load_document(&path, &OcrConfig::default());
        assert_eq!(
            doc.extracted,
            "One happened. Two followed. Three came. Four went. Five stayed. Six left."
        );
        assert_eq!(doc.source.as_deref(), Some(doc.extracted.as_str()));
        assert_eq!(doc.summary, "One happened. Two followed.");
        assert_eq!(doc.path, path);
    }

    #[test]
    fn unsupported_file_shows_message_and_summarizes_it() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a,b\n1,2\n").expect("write");

        let doc = load_document(&path, &OcrConfig::default());
        assert_eq!(doc.extracted, "Unsupported file format!");
        assert_eq!(doc.summary, "Unsupported file format!");
    }

    #[test]
    fn failed_extraction_shows_error_and_skips_summary() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("missing.txt");

        let doc = load_document(&path, &OcrConfig::default());
        assert!(doc.extracted.starts_with("Error: "), "{}", doc.extracted);
        assert_eq!(doc.source, None);
        assert!(doc.summary.is_empty());
    }

    #[test]
    fn loading_twice_is_identical() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("same.txt");
        std::fs::write(&path, "Alpha. Beta. Gamma.").expect("write");

        let ocr = OcrConfig::default();
        assert_eq!(load_document(&path, &ocr), load_document(&path, &ocr));
    }
}
