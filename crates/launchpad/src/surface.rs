//! Content surfaces and their descriptors.

use std::fmt;
use std::path::PathBuf;

use launchpad_core::{Bounds, HostId, SurfaceId};
use serde::{Deserialize, Serialize};
use url::Url;

/// Id of the primary search surface on the main host.
pub const MAIN_VIEW_ID: &str = "main-view";
/// Id of the settings surface.
pub const SETTINGS_VIEW_ID: &str = "settings-view";
/// Prefix of plugin content surface ids.
pub const PLUGIN_CONTENT_PREFIX: &str = "plugin-content-";
/// Prefix of detached-host control bar ids.
pub const CONTROL_BAR_PREFIX: &str = "control-bar-";

/// What a surface renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceKind {
    PrimarySearch,
    Settings,
    PluginContent,
    ControlBar,
}

impl SurfaceKind {
    /// Check if surfaces of this kind may be moved into a detached host.
    pub fn is_migratable(self) -> bool {
        matches!(self, Self::Settings | Self::PluginContent)
    }

    /// Check if this kind is shown below the main host's search header.
    pub fn is_secondary(self) -> bool {
        matches!(self, Self::Settings | Self::PluginContent)
    }
}

/// Lifecycle of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceState {
    Creating,
    Active,
    Hidden,
    Migrating,
    Destroyed,
}

/// Where a surface's content comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentLocator {
    /// A resource bundled with the application or a plugin.
    Local(PathBuf),
    /// A remote page.
    Remote(Url),
}

/// Opaque content descriptor.
///
/// The windowing core never looks inside the content; it only hands the
/// descriptor to the compositor when the native view is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSource {
    pub locator: ContentLocator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_script: Option<PathBuf>,
}

impl ContentSource {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            locator: ContentLocator::Local(path.into()),
            bridge_script: None,
        }
    }

    pub fn remote(url: Url) -> Self {
        Self {
            locator: ContentLocator::Remote(url),
            bridge_script: None,
        }
    }

    /// Attach a bridge script that the host injects before the content loads.
    pub fn with_bridge_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.bridge_script = Some(script.into());
        self
    }

    /// Parse a locator string.
    ///
    /// Absolute URLs become [`ContentLocator::Remote`], except `file:` URLs,
    /// which map to their local path. Anything else is treated as a path.
    pub fn parse(locator: &str) -> Self {
        match Url::parse(locator) {
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => Self::local(path),
                Err(()) => Self::remote(url),
            },
            Ok(url) => Self::remote(url),
            Err(_) => Self::local(locator),
        }
    }
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.locator {
            ContentLocator::Local(path) => write!(f, "{}", path.display()),
            ContentLocator::Remote(url) => write!(f, "{url}"),
        }
    }
}

/// A registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub id: SurfaceId,
    /// Owning host, or `None` while the surface is between hosts.
    pub host_id: Option<HostId>,
    pub kind: SurfaceKind,
    pub content_source: ContentSource,
    /// Relative to the owning host's content area.
    pub bounds: Bounds,
    pub z_order: u32,
    pub state: SurfaceState,
}

impl Surface {
    pub fn new(id: SurfaceId, host_id: HostId, kind: SurfaceKind, content_source: ContentSource) -> Self {
        Self {
            id,
            host_id: Some(host_id),
            kind,
            content_source,
            bounds: Bounds::default(),
            z_order: 0,
            state: SurfaceState::Creating,
        }
    }

    pub fn is_migrating(&self) -> bool {
        self.state == SurfaceState::Migrating
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migratable_kinds() {
        assert!(SurfaceKind::PluginContent.is_migratable());
        assert!(SurfaceKind::Settings.is_migratable());
        assert!(!SurfaceKind::PrimarySearch.is_migratable());
        assert!(!SurfaceKind::ControlBar.is_migratable());
    }

    #[test]
    fn test_parse_remote() {
        let source = ContentSource::parse("https://example.com/plugin/index.html");
        assert!(matches!(source.locator, ContentLocator::Remote(ref url) if url.host_str() == Some("example.com")));
    }

    #[test]
    fn test_parse_relative_path_is_local() {
        let source = ContentSource::parse("plugins/notes/index.html");
        assert_eq!(source.locator, ContentLocator::Local(PathBuf::from("plugins/notes/index.html")));
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_file_url_is_local() {
        let source = ContentSource::parse("file:///opt/plugins/notes/index.html");
        assert_eq!(source.locator, ContentLocator::Local(PathBuf::from("/opt/plugins/notes/index.html")));
    }

    #[test]
    fn test_content_source_json_shape() {
        let source = ContentSource::local("settings.html").with_bridge_script("preload.js");
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["locator"]["local"], "settings.html");
        assert_eq!(json["bridgeScript"], "preload.js");
    }
}
