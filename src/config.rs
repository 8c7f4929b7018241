use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use egui::Vec2;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::layer::{FontFamily, LayerDefaults};
use crate::transform::TransformLimits;

/// Names a JSON config file to load on top of the defaults
pub const CONFIG_PATH_ENV: &str = "MEME_STUDIO_CONFIG";
/// Overrides the backend base URL
pub const API_URL_ENV: &str = "MEME_API_URL";

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/memes";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub page_size: u32,
    pub request_timeout_secs: u64,
    pub editor: EditorConfig,
    pub fonts: FontConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_owned(),
            page_size: 9,
            request_timeout_secs: 60,
            editor: EditorConfig::default(),
            fonts: FontConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub min_font_size: f32,
    pub max_font_size: f32,
    pub min_box_width: f32,
    pub min_box_height: f32,
    /// Delay between the publish success toast and switching to the gallery
    pub navigate_delay_ms: u64,
    pub layer_defaults: LayerDefaults,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas_width: 600,
            canvas_height: 600,
            min_font_size: 10.0,
            max_font_size: 150.0,
            min_box_width: 20.0,
            min_box_height: 16.0,
            navigate_delay_ms: 1500,
            layer_defaults: LayerDefaults::default(),
        }
    }
}

impl EditorConfig {
    pub fn canvas_size(&self) -> Vec2 {
        Vec2::new(self.canvas_width as f32, self.canvas_height as f32)
    }

    pub fn font_range(&self) -> (f32, f32) {
        (self.min_font_size, self.max_font_size)
    }

    pub fn transform_limits(&self) -> TransformLimits {
        TransformLimits {
            min_font_size: self.min_font_size,
            max_font_size: self.max_font_size,
            min_box: Vec2::new(self.min_box_width, self.min_box_height),
        }
    }
}

/// Optional font files per family; families without one use the bundled faces
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub files: BTreeMap<FontFamily, PathBuf>,
}

impl AppConfig {
    /// Defaults, then the file named by `MEME_STUDIO_CONFIG`, then `MEME_API_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api_base_url = url.trim().to_owned();
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading config from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let editor = &self.editor;
        if editor.canvas_width == 0 || editor.canvas_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "canvas size must be positive, got {}x{}",
                editor.canvas_width, editor.canvas_height
            )));
        }
        if !(editor.min_font_size > 0.0 && editor.min_font_size <= editor.max_font_size) {
            return Err(ConfigError::Invalid(format!(
                "font size range [{}, {}] is invalid",
                editor.min_font_size, editor.max_font_size
            )));
        }
        if editor.min_box_width < 0.0 || editor.min_box_height < 0.0 {
            return Err(ConfigError::Invalid("minimum box size must not be negative".to_owned()));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page size must be positive".to_owned()));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api base url is empty".to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.editor.canvas_size(), Vec2::new(600.0, 600.0));
        assert_eq!(config.page_size, 9);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AppConfig::from_json(r#"{ "page_size": 12, "editor": { "min_font_size": 16 } }"#)
            .expect("valid config");
        assert_eq!(config.page_size, 12);
        assert_eq!(config.editor.min_font_size, 16.0);
        assert_eq!(config.editor.max_font_size, 150.0);
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_font_files_by_family() {
        let config = AppConfig::from_json(r#"{ "fonts": { "files": { "Impact": "/fonts/impact.ttf" } } }"#)
            .expect("valid config");
        assert_eq!(
            config.fonts.files.get(&FontFamily::Impact),
            Some(&PathBuf::from("/fonts/impact.ttf"))
        );
    }

    #[test]
    fn test_inverted_font_range_rejected() {
        let result = AppConfig::from_json(r#"{ "editor": { "min_font_size": 200 } }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_canvas_rejected() {
        let result = AppConfig::from_json(r#"{ "editor": { "canvas_width": 0 } }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(AppConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
