//! Launchpad - the windowing core of a desktop launcher.
//!
//! Manages content surfaces (the search bar, the settings panel, plugin
//! pages) hosted in top-level host windows, and moves a live surface out of
//! its host into a freestanding window and back without reloading it.
//!
//! # Example
//!
//! ```no_run
//! use launchpad::{ContentSource, HeadlessCompositor, Shell, ShellConfig};
//!
//! # async fn run() -> launchpad::ShellResult<()> {
//! let shell = Shell::launch(HeadlessCompositor::new(), ShellConfig::default()).await?;
//! let notes = shell.open_plugin(ContentSource::local("plugins/notes/index.html")).await?;
//! let window = shell.detach().detach(&notes).await?;
//! shell.on_close_requested(window).await?; // reattaches to the main host
//! # Ok(())
//! # }
//! ```

pub use launchpad_core::*;

pub mod config;
pub mod control;
pub mod detach;
pub mod event_router;
pub mod events;
pub mod headless;
pub mod host;
pub mod layout;
pub mod native;
pub mod paint_tree;
pub mod registry;
pub mod shell;
pub mod surface;
pub mod view;

pub use config::{ConfigError, ContentConfig, DetachConfig, LayoutConfig, ShellConfig};
pub use control::{ControlChannel, ControlCommand, ControlResponse};
pub use detach::{ControlBarAction, DetachCoordinator, MigrationState, MigrationStatistics};
pub use event_router::{EventRouter, NativeWindowEvent};
pub use events::{EventBus, RestoreReason, ShellEvent};
pub use headless::HeadlessCompositor;
pub use host::{CloseDisposition, HostWindow, HostWindowManager};
pub use layout::{LayoutEngine, LayoutMode};
pub use native::{Compositor, DisplayMode, HostKind, WindowSpec};
pub use registry::SurfaceRegistry;
pub use shell::{FollowingAction, Shell};
pub use surface::{ContentLocator, ContentSource, Surface, SurfaceKind, SurfaceState};
pub use view::ViewManager;

static_assertions::assert_impl_all!(LayoutEngine: Copy, Send, Sync);
static_assertions::assert_impl_all!(SurfaceRegistry: Send, Sync);
static_assertions::assert_impl_all!(ShellEvent: Send, Sync, Clone);
static_assertions::assert_impl_all!(HeadlessCompositor: Send, Sync);
