//! Narration: speaking the summary aloud with the current sentence
//! highlighted.
//!
//! # Architecture
//!
//! ```text
//! UI thread                                  narration-N thread
//! ─────────                                  ──────────────────
//! NarrationController::start(summary) ─────▶ NarrationTask::run
//!                                              │  SpeechEngine::say
//!                                              │  SpeechEngine::run_and_wait
//!        ◀──── NarrationEvent (mpsc) ──────────┘
//! apply_event(&mut TextSurface, event)
//!   └─ remove / apply "highlight" tag, scroll_to
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use doc_narrator::narration::{platform_engine, NarrationController};
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let mut narrator = NarrationController::new(Arc::new(platform_engine), 150, tx);
//!
//! narrator.start("The cat sat. The dog barked.");
//! while let Ok(event) = rx.try_recv() {
//!     println!("{event:?}");
//! }
//! narrator.stop();
//! ```

pub mod controller;
pub mod display;
pub mod engine;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::{NarrationController, NarrationEvent};
pub use display::{apply_event, DisplaySurface, HighlightSpan, TagStyle, TextSurface, HIGHLIGHT_TAG};
pub use engine::{platform_engine, utterance_duration, EngineFactory, SilentSpeech, SpeechEngine, SpeechError};
pub use state::{NarrationSession, NarrationState, SharedNarrationState};

#[cfg(feature = "speech")]
pub use engine::TtsSpeech;
