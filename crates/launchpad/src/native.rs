//! The seam between the windowing core and the native toolkit.
//!
//! A [`Compositor`] owns the real top-level windows and content views. The
//! core refers to windows through cloneable handles and to views through
//! uniquely owned handles: moving a view between hosts moves its handle,
//! it never duplicates it.

use std::fmt;

use launchpad_core::{Bounds, NativeResult, Point};
use serde::{Deserialize, Serialize};
use winit::window::WindowId;

use crate::surface::{ContentSource, SurfaceKind};

/// The role of a host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKind {
    /// The launcher's search window. Exactly one exists.
    Main,
    /// A freestanding window holding one migrated surface.
    Detached,
    /// A secondary window tied to a plugin item.
    Following,
}

impl HostKind {
    /// Check if the native window draws its own chrome.
    pub fn is_frameless(self) -> bool {
        matches!(self, Self::Main | Self::Detached)
    }

    pub fn is_resizable(self) -> bool {
        !matches!(self, Self::Main)
    }

    pub fn stays_on_top(self) -> bool {
        matches!(self, Self::Main)
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => f.write_str("main"),
            Self::Detached => f.write_str("detached"),
            Self::Following => f.write_str("following"),
        }
    }
}

/// How a host occupies the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    #[default]
    Normal,
    Maximized,
    Fullscreen,
}

impl DisplayMode {
    /// Check if the host covers its display, so outer padding is dropped.
    pub fn fills_screen(self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// Everything needed to create a native host window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    title: String,
    kind: HostKind,
    bounds: Bounds,
    min_size: Option<(i32, i32)>,
    visible: bool,
}

impl WindowSpec {
    pub fn new(title: impl Into<String>, kind: HostKind, bounds: Bounds) -> Self {
        Self {
            title: title.into(),
            kind,
            bounds,
            min_size: None,
            visible: false,
        }
    }

    pub fn with_min_size(mut self, width: i32, height: i32) -> Self {
        self.min_size = Some((width, height));
        self
    }

    /// Show the window as soon as it is created.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> HostKind {
        self.kind
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn min_size(&self) -> Option<(i32, i32)> {
        self.min_size
    }

    pub fn visible(&self) -> bool {
        self.visible
    }
}

/// Native window toolkit operations used by the windowing core.
///
/// Creation and attachment are asynchronous because native toolkits do not
/// guarantee they complete within the calling tick. Everything else is a
/// synchronous request to the toolkit.
#[allow(async_fn_in_trait)]
pub trait Compositor {
    /// Shared handle to a native top-level window.
    type Window: Clone + fmt::Debug;
    /// Uniquely owned handle to a native content view.
    type View: fmt::Debug;

    async fn create_window(&self, spec: &WindowSpec) -> NativeResult<Self::Window>;
    fn destroy_window(&self, window: &Self::Window);
    fn set_window_bounds(&self, window: &Self::Window, bounds: Bounds);
    fn set_window_visible(&self, window: &Self::Window, visible: bool);
    fn focus_window(&self, window: &Self::Window);
    fn minimize_window(&self, window: &Self::Window);
    fn set_display_mode(&self, window: &Self::Window, mode: DisplayMode);
    /// The winit id of a window, for toolkits that drive winit.
    ///
    /// Hosts whose window has an id are bound in the host manager's
    /// [`EventRouter`](crate::EventRouter) for as long as they live.
    fn winit_id(&self, _window: &Self::Window) -> Option<WindowId> {
        None
    }

    async fn create_view(&self, kind: SurfaceKind, source: &ContentSource) -> NativeResult<Self::View>;
    /// Release a view. The handle is consumed.
    fn destroy_view(&self, view: Self::View);
    /// Insert a view into a window's view tree, on top of existing views.
    async fn attach_view(&self, window: &Self::Window, view: &Self::View) -> NativeResult<()>;
    /// Remove a view from whatever window holds it, keeping its content alive.
    fn detach_view(&self, window: &Self::Window, view: &Self::View);
    fn set_view_bounds(&self, view: &Self::View, bounds: Bounds);
    fn set_view_visible(&self, view: &Self::View, visible: bool);

    fn cursor_position(&self) -> Point;
    /// Work area of the display nearest `point`, excluding taskbars and docks.
    fn work_area(&self, point: Point) -> Bounds;
}
