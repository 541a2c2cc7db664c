//! User settings: speaking rate, OCR language and window look.
//!
//! Sections are plain `serde` structs with `#[serde(default)]`, so a
//! hand-edited `settings.toml` may leave out anything it does not change.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for the text-to-speech engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Speaking rate in words per minute, applied to every fresh engine.
    pub rate_wpm: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self { rate_wpm: 150 }
    }
}

// ---------------------------------------------------------------------------
// OcrConfig
// ---------------------------------------------------------------------------

/// Settings for optical character recognition of image files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language code (e.g. `"eng"`, `"deu"`, `"eng+fra"`).
    pub language: String,
    /// Directory holding `*.traineddata` files.  `None` lets Tesseract use
    /// its compiled-in default (`TESSDATA_PREFIX`).
    pub datapath: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".into(),
            datapath: None,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Window and rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Initial inner window size `(width, height)` in logical pixels.
    pub window_size: (f32, f32),
    /// RGB background colour of the spoken-sentence highlight.
    pub highlight_color: [u8; 3],
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_size: (900.0, 650.0),
            highlight_color: [255, 255, 0],
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Everything doc-narrator remembers between runs, one TOML table per
/// section.  Missing tables and keys take their default values.
///
/// ```rust,no_run
/// use doc_narrator::config::AppConfig;
///
/// let config = AppConfig::load()?;
/// println!("speaking at {} wpm", config.speech.rate_wpm);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub speech: SpeechConfig,
    pub ocr: OcrConfig,
    pub ui: UiConfig,
}

impl AppConfig {
    /// Read the user's `settings.toml`; see [`AppConfig::read`].
    pub fn load() -> Result<Self> {
        Self::read(&AppPaths::new().settings_file)
    }

    /// Parse the settings file at `path`.  A file that is not there yet
    /// reads as the defaults; any other I/O or parse failure is an error
    /// naming the file.
    pub fn read(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Write to the user's `settings.toml`; see [`AppConfig::write`].
    pub fn save(&self) -> Result<()> {
        self.write(&AppPaths::new().settings_file)
    }

    /// Serialise to `path`, creating its directory first.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))
    }

    /// No settings file has been written yet.
    pub fn is_first_run() -> bool {
        !AppPaths::new().settings_file.exists()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
