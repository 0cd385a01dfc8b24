//! Pure layout calculations.
//!
//! Every function maps a host's outer bounds (and a mode) to the bounds of a
//! surface inside it. Results are relative to the host's local content area
//! and never have a negative width or height.

use launchpad_core::Bounds;
use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;

/// What the main host is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    /// Only the search header is visible.
    #[default]
    Search,
    /// The settings panel is open below the header.
    Settings,
    /// Plugin content is open below the header.
    Window,
}

/// Stateless layout calculator over a fixed [`LayoutConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Bounds of the primary content surface for `mode`.
    ///
    /// In search mode the surface is the header strip; otherwise it fills
    /// the host minus the outer padding.
    pub fn content_bounds(&self, host: Bounds, mode: LayoutMode) -> Bounds {
        let host = host.clamped();
        match mode {
            LayoutMode::Search => Bounds::from_size(host.width, self.config.header_height).clamped(),
            LayoutMode::Settings | LayoutMode::Window => host.local().inset(self.config.app_padding),
        }
    }

    /// Bounds of a settings or plugin panel shown below the main host's header.
    pub fn panel_bounds(&self, host: Bounds) -> Bounds {
        let total = self.config.settings_padding + self.config.app_padding;
        Bounds::new(
            total,
            self.config.header_height + total,
            host.width - total * 2,
            host.height - self.config.header_height - total * 2,
        )
        .clamped()
    }

    /// The control bar of a detached host covers the whole window and draws
    /// its own chrome.
    pub fn detached_control_bar_bounds(&self, host: Bounds) -> Bounds {
        host.clamped().local()
    }

    /// Bounds of the migrated surface inside a detached host.
    ///
    /// Maximized and fullscreen hosts drop the outer padding so the content
    /// reaches the screen edges.
    pub fn detached_content_bounds(&self, host: Bounds, maximized_or_fullscreen: bool) -> Bounds {
        let outer_padding = if maximized_or_fullscreen {
            0
        } else {
            self.config.app_padding
        };
        let total = outer_padding + self.config.detached.padding;
        let bar = self.config.detached.control_bar_height;
        Bounds::new(
            total,
            bar + total,
            (host.width - total * 2).max(0),
            (host.height - bar - total * 2).max(0),
        )
    }

    /// Outer height of the main host for a given content height.
    ///
    /// Settings mode always uses the maximum content height.
    pub fn host_height(&self, content_height: i32, mode: LayoutMode) -> i32 {
        let chrome = self.config.header_height + self.config.app_padding * 2;
        match mode {
            LayoutMode::Settings => self.config.content_max_height + chrome,
            LayoutMode::Search | LayoutMode::Window => content_height.max(0) + chrome,
        }
    }

    /// Outer size needed by a detached host to show content of this size.
    pub fn detached_host_size(&self, content_width: i32, content_height: i32) -> (i32, i32) {
        let total = self.config.app_padding + self.config.detached.padding;
        (
            content_width.max(0) + total * 2,
            content_height.max(0) + self.config.detached.control_bar_height + total * 2,
        )
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}
