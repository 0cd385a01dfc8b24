//! Native window event routing.
//!
//! Translates winit window events into [`NativeWindowEvent`]s addressed by
//! host id. The host manager binds a window when its host is created, if
//! the compositor reports a winit id, and unbinds it when the host is gone.
//!
//! ```ignore
//! fn window_event(&mut self, _: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
//!     runtime.block_on(shell.dispatch_window_event(window_id, &event))?;
//! }
//! ```

use std::collections::HashMap;

use launchpad_core::logging::targets;
use launchpad_core::{HostId, Point, Size};
use parking_lot::RwLock;
use winit::event::WindowEvent;
use winit::window::WindowId;

/// A native notification the windowing core reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeWindowEvent {
    Moved { host: HostId, position: Point },
    Resized { host: HostId, size: Size },
    CloseRequested { host: HostId },
    Focused { host: HostId, focused: bool },
}

impl NativeWindowEvent {
    pub fn host(&self) -> HostId {
        match self {
            Self::Moved { host, .. }
            | Self::Resized { host, .. }
            | Self::CloseRequested { host }
            | Self::Focused { host, .. } => *host,
        }
    }
}

/// Binding table from winit windows to hosts.
#[derive(Default)]
pub struct EventRouter {
    bindings: RwLock<HashMap<WindowId, HostId>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, window: WindowId, host: HostId) {
        tracing::trace!(target: targets::ROUTER, ?window, %host, "window bound");
        self.bindings.write().insert(window, host);
    }

    /// Remove every binding of `host`.
    pub fn unbind_host(&self, host: HostId) {
        self.bindings.write().retain(|_, bound| *bound != host);
    }

    pub fn host_for(&self, window: WindowId) -> Option<HostId> {
        self.bindings.read().get(&window).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }

    /// Translate a winit event for a bound window.
    ///
    /// Returns `None` for unbound windows and for events the windowing core
    /// does not handle.
    pub fn translate(&self, window: WindowId, event: &WindowEvent) -> Option<NativeWindowEvent> {
        let Some(host) = self.host_for(window) else {
            tracing::trace!(target: targets::ROUTER, ?window, "event for unbound window");
            return None;
        };
        match event {
            WindowEvent::Moved(position) => Some(NativeWindowEvent::Moved {
                host,
                position: Point::new(position.x, position.y),
            }),
            WindowEvent::Resized(size) => Some(NativeWindowEvent::Resized {
                host,
                size: Size::new(
                    i32::try_from(size.width).unwrap_or(i32::MAX),
                    i32::try_from(size.height).unwrap_or(i32::MAX),
                ),
            }),
            WindowEvent::CloseRequested => Some(NativeWindowEvent::CloseRequested { host }),
            WindowEvent::Focused(focused) => Some(NativeWindowEvent::Focused {
                host,
                focused: *focused,
            }),
            _ => None,
        }
    }
}
