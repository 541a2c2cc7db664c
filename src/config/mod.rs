//! Persistent settings.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for speech, OCR and
//! the window, `AppPaths` for the cross-platform settings location, and TOML
//! persistence via `AppConfig::load` / `AppConfig::save` (or `read` / `write`
//! for an explicit path).

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, OcrConfig, SpeechConfig, UiConfig};
