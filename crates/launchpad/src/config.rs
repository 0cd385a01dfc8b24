//! Static layout and detach configuration.
//!
//! Configuration is read once at launch and never mutated afterwards. Every
//! field has a default, so an empty TOML document is a valid configuration:
//!
//! ```
//! use launchpad::config::ShellConfig;
//!
//! let config = ShellConfig::from_toml_str(r#"
//! [layout]
//! header_height = 60
//!
//! [detach]
//! min_width = 320
//! "#).unwrap();
//! assert_eq!(config.layout.header_height, 60);
//! assert_eq!(config.layout.window_width, 800);
//! ```

use std::path::Path;

use launchpad_core::{Point, ShellError, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::surface::ContentSource;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for ShellError {
    fn from(err: ConfigError) -> Self {
        ShellError::Config(err.to_string())
    }
}

/// Chrome dimensions of a detached host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetachedChrome {
    pub control_bar_height: i32,
    pub padding: i32,
    pub border_radius: i32,
}

impl Default for DetachedChrome {
    fn default() -> Self {
        Self {
            control_bar_height: 50,
            padding: 8,
            border_radius: 12,
        }
    }
}

/// Pure input to the layout calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub window_width: i32,
    pub header_height: i32,
    pub content_max_height: i32,
    /// Outer padding of every host, leaving room for border and shadow.
    pub app_padding: i32,
    /// Extra inset of settings and plugin panels on the main host.
    pub settings_padding: i32,
    pub border_radius: i32,
    pub detached: DetachedChrome,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            window_width: 800,
            header_height: 50,
            content_max_height: 420,
            app_padding: 8,
            settings_padding: 8,
            border_radius: 12,
            detached: DetachedChrome::default(),
        }
    }
}

/// Placement rules for newly detached hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetachConfig {
    pub default_width: i32,
    pub default_height: i32,
    /// Offset of a new detached host from the cursor.
    pub offset_x: i32,
    pub offset_y: i32,
    pub min_width: i32,
    pub min_height: i32,
}

impl DetachConfig {
    pub fn default_size(&self) -> Size {
        Size::new(self.default_width, self.default_height)
    }

    pub fn min_size(&self) -> Size {
        Size::new(self.min_width, self.min_height)
    }

    pub fn offset(&self) -> Point {
        Point::new(self.offset_x, self.offset_y)
    }
}

impl Default for DetachConfig {
    fn default() -> Self {
        Self {
            default_width: 800,
            default_height: 600,
            offset_x: 50,
            offset_y: 50,
            min_width: 400,
            min_height: 300,
        }
    }
}

/// Pages loaded into the shell's built-in surfaces.
///
/// Each entry is a path or URL, see [`ContentSource::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub search_page: String,
    pub settings_page: String,
    pub control_bar_page: String,
}

impl ContentConfig {
    pub fn search(&self) -> ContentSource {
        ContentSource::parse(&self.search_page)
    }

    pub fn settings(&self) -> ContentSource {
        ContentSource::parse(&self.settings_page)
    }

    pub fn control_bar(&self) -> ContentSource {
        ContentSource::parse(&self.control_bar_page)
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            search_page: "index.html".into(),
            settings_page: "settings.html".into(),
            control_bar_page: "detached-window.html".into(),
        }
    }
}

/// Complete static configuration of the shell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub layout: LayoutConfig,
    pub detach: DetachConfig,
    pub content: ContentConfig,
}

impl ShellConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: ShellConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Check that every dimension is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;
        let non_negative = [
            ("layout.window_width", layout.window_width),
            ("layout.header_height", layout.header_height),
            ("layout.content_max_height", layout.content_max_height),
            ("layout.app_padding", layout.app_padding),
            ("layout.settings_padding", layout.settings_padding),
            ("layout.border_radius", layout.border_radius),
            ("layout.detached.control_bar_height", layout.detached.control_bar_height),
            ("layout.detached.padding", layout.detached.padding),
            ("layout.detached.border_radius", layout.detached.border_radius),
            ("detach.default_width", self.detach.default_width),
            ("detach.default_height", self.detach.default_height),
            ("detach.min_width", self.detach.min_width),
            ("detach.min_height", self.detach.min_height),
        ];
        for (field, value) in non_negative {
            if value < 0 {
                return Err(ConfigError::invalid(field, format!("must not be negative (got {value})")));
            }
        }

        let pages = [
            ("content.search_page", &self.content.search_page),
            ("content.settings_page", &self.content.settings_page),
            ("content.control_bar_page", &self.content.control_bar_page),
        ];
        for (field, page) in pages {
            if page.trim().is_empty() {
                return Err(ConfigError::invalid(field, "must not be empty"));
            }
        }

        if self.detach.min_width > self.detach.default_width
            || self.detach.min_height > self.detach.default_height
        {
            return Err(ConfigError::invalid(
                "detach.min_width/min_height",
                "must not exceed the default window size",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = ShellConfig::from_toml_str("").unwrap();
        assert_eq!(config, ShellConfig::default());
        assert_eq!(config.layout.detached.control_bar_height, 50);
        assert_eq!(config.detach.min_size(), Size::new(400, 300));
    }

    #[test]
    fn test_partial_override() {
        let config = ShellConfig::from_toml_str(
            r#"
            [layout.detached]
            padding = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.layout.detached.padding, 4);
        assert_eq!(config.layout.detached.control_bar_height, 50);
    }

    #[test]
    fn test_content_pages() {
        let config = ShellConfig::from_toml_str(
            r#"
            [content]
            settings_page = "https://example.com/settings"
            "#,
        )
        .unwrap();
        assert_eq!(config.content.search(), ContentSource::local("index.html"));
        assert_eq!(config.content.settings().to_string(), "https://example.com/settings");
        assert!(ShellConfig::from_toml_str("[content]\nsearch_page = \"\"\n").is_err());
    }

    #[test]
    fn test_rejects_negative_dimension() {
        let err = ShellConfig::from_toml_str("[layout]\napp_padding = -1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "layout.app_padding", .. }));
    }

    #[test]
    fn test_rejects_min_larger_than_default() {
        let err = ShellConfig::from_toml_str("[detach]\nmin_width = 900\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_parse_error_converts_to_shell_error() {
        let err = ShellConfig::from_toml_str("[layout\n").unwrap_err();
        let shell: ShellError = err.into();
        assert!(matches!(shell, ShellError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shell.toml");
        std::fs::write(&path, "[layout]\nwindow_width = 640\n").unwrap();
        let config = ShellConfig::load(&path).unwrap();
        assert_eq!(config.layout.window_width, 640);
    }
}
