//! Style presets, aspect ratios and the chat model allow-list.
//!
//! All lookups are total: an unknown key resolves to the default entry
//! (`photorealistic`, `1:1`, `gemini-2.5-flash`), never to an error.

use serde::Serialize;

pub const DEFAULT_STYLE: &str = "photorealistic";
pub const DEFAULT_ASPECT_RATIO: &str = "1:1";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StylePreset {
    pub key: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AspectRatio {
    pub key: &'static str,
    pub description: &'static str,
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

const STYLES: &[StylePreset] = &[
    StylePreset { key: "photorealistic", description: "photorealistic" },
    StylePreset { key: "cartoon", description: "cartoon style" },
    StylePreset { key: "abstract", description: "abstract art" },
    StylePreset { key: "impressionistic", description: "impressionist painting" },
    StylePreset { key: "cyberpunk", description: "cyberpunk art style" },
    StylePreset { key: "anime", description: "anime style" },
    StylePreset { key: "oil_painting", description: "oil painting" },
    StylePreset { key: "watercolor", description: "watercolor painting" },
    StylePreset { key: "sketch", description: "pencil sketch" },
    StylePreset { key: "digital_art", description: "digital art" },
];

const RATIOS: &[AspectRatio] = &[
    AspectRatio { key: "1:1", description: "square format", width: 1024, height: 1024 },
    AspectRatio { key: "4:3", description: "standard landscape format", width: 1024, height: 768 },
    AspectRatio { key: "3:4", description: "standard portrait format", width: 768, height: 1024 },
    AspectRatio { key: "16:9", description: "landscape widescreen format", width: 1024, height: 576 },
    AspectRatio { key: "9:16", description: "portrait vertical format", width: 576, height: 1024 },
];

const CHAT_MODELS: &[&str] = &[
    "gemini-2.0-flash-exp",
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.5-pro",
    "gemini-1.5-flash",
    "gemini-1.5-flash-8b",
];

/// Read-only lookup tables, built once at startup and shared by handlers.
#[derive(Debug, Clone)]
pub struct Catalog {
    styles: &'static [StylePreset],
    ratios: &'static [AspectRatio],
    chat_models: &'static [&'static str],
    default_chat_model: String,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(DEFAULT_CHAT_MODEL)
    }
}

impl Catalog {
    pub fn new(default_chat_model: impl Into<String>) -> Self {
        Self {
            styles: STYLES,
            ratios: RATIOS,
            chat_models: CHAT_MODELS,
            default_chat_model: default_chat_model.into(),
        }
    }

    pub fn style(&self, key: Option<&str>) -> StylePreset {
        key.and_then(|k| self.styles.iter().find(|s| s.key == k))
            .or_else(|| self.styles.iter().find(|s| s.key == DEFAULT_STYLE))
            .copied()
            .unwrap_or(self.styles[0])
    }

    pub fn aspect_ratio(&self, key: Option<&str>) -> AspectRatio {
        lookup_ratio(self.ratios, key)
    }

    /// Resolve a requested chat model, falling back to the default when the
    /// name is missing or not on the allow-list.
    pub fn chat_model(&self, requested: Option<&str>) -> String {
        match requested {
            Some(name) if self.chat_models.contains(&name) => name.to_string(),
            Some(name) => {
                tracing::debug!(
                    requested = %name,
                    fallback = %self.default_chat_model,
                    "Unknown chat model, using default"
                );
                self.default_chat_model.clone()
            }
            None => self.default_chat_model.clone(),
        }
    }

    pub fn styles(&self) -> &[StylePreset] {
        self.styles
    }

    pub fn ratios(&self) -> &[AspectRatio] {
        self.ratios
    }

    pub fn chat_models(&self) -> &[&'static str] {
        self.chat_models
    }
}

/// Ratio lookup usable without a `Catalog` (the post-processor only needs
/// dimensions).
pub fn aspect_ratio(key: &str) -> AspectRatio {
    lookup_ratio(RATIOS, Some(key))
}

fn lookup_ratio(ratios: &[AspectRatio], key: Option<&str>) -> AspectRatio {
    key.and_then(|k| ratios.iter().find(|r| r.key == k))
        .or_else(|| ratios.iter().find(|r| r.key == DEFAULT_ASPECT_RATIO))
        .copied()
        .unwrap_or(ratios[0])
}
