//! Lifecycle events emitted to the UI layer.
//!
//! Events are a closed enum; each serializes as
//! `{ "channel": "<event-name>", "payload": { ... } }` with camelCase
//! payload fields and millisecond timestamps.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use launchpad_core::logging::targets;
use launchpad_core::{ConnectionGuard, ConnectionId, HostId, Signal, SurfaceId};
use serde::{Deserialize, Serialize};

/// Why a surface asked the main host to return to its search view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestoreReason {
    SettingsClosed,
    PluginClosed,
    UserRequested,
    System,
}

/// A lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "channel",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ShellEvent {
    /// A surface moved into a new detached host.
    ViewDetached {
        detached_surface_id: SurfaceId,
        source_host_id: HostId,
        detached_host_id: HostId,
        /// Surfaces still owned by the source host.
        remaining_surface_ids: Vec<SurfaceId>,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },
    ViewRestoreRequested {
        surface_id: SurfaceId,
        host_id: HostId,
        reason: RestoreReason,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },
    /// A detached surface moved back into a regular host.
    ViewReattached {
        surface_id: SurfaceId,
        source_host_id: HostId,
        detached_host_id: HostId,
        target_host_id: HostId,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },
    /// A detached host is gone.
    DetachedWindowClosed {
        surface_id: SurfaceId,
        detached_host_id: HostId,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },
    WindowMainHide {
        host_id: HostId,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },
    WindowMainShow {
        host_id: HostId,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },
    /// A detach was rolled back.
    DetachFailed {
        surface_id: SurfaceId,
        host_id: HostId,
        error: String,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },
}

impl ShellEvent {
    /// The channel name the UI layer listens on.
    pub fn channel(&self) -> &'static str {
        match self {
            Self::ViewDetached { .. } => "view-detached",
            Self::ViewRestoreRequested { .. } => "view-restore-requested",
            Self::ViewReattached { .. } => "view-reattached",
            Self::DetachedWindowClosed { .. } => "detached-window-closed",
            Self::WindowMainHide { .. } => "window-main-hide",
            Self::WindowMainShow { .. } => "window-main-show",
            Self::DetachFailed { .. } => "detach-failed",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ViewDetached { timestamp, .. }
            | Self::ViewRestoreRequested { timestamp, .. }
            | Self::ViewReattached { timestamp, .. }
            | Self::DetachedWindowClosed { timestamp, .. }
            | Self::WindowMainHide { timestamp, .. }
            | Self::WindowMainShow { timestamp, .. }
            | Self::DetachFailed { timestamp, .. } => *timestamp,
        }
    }

    /// The surface the event is about, if any.
    pub fn surface_id(&self) -> Option<&SurfaceId> {
        match self {
            Self::ViewDetached {
                detached_surface_id, ..
            } => Some(detached_surface_id),
            Self::ViewRestoreRequested { surface_id, .. }
            | Self::ViewReattached { surface_id, .. }
            | Self::DetachedWindowClosed { surface_id, .. }
            | Self::DetachFailed { surface_id, .. } => Some(surface_id),
            Self::WindowMainHide { .. } | Self::WindowMainShow { .. } => None,
        }
    }
}

/// Fan-out of [`ShellEvent`]s to every live listener.
#[derive(Default)]
pub struct EventBus {
    signal: Arc<Signal<ShellEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every listener.
    pub fn emit(&self, event: ShellEvent) {
        tracing::debug!(target: targets::CONTROL, channel = event.channel(), "emitting event");
        self.signal.emit(event);
    }

    pub fn subscribe<F>(&self, listener: F) -> ConnectionId
    where
        F: Fn(&ShellEvent) + Send + Sync + 'static,
    {
        self.signal.connect(listener)
    }

    /// Subscribe until the returned guard drops.
    pub fn subscribe_scoped<F>(&self, listener: F) -> ConnectionGuard<ShellEvent>
    where
        F: Fn(&ShellEvent) + Send + Sync + 'static,
    {
        self.signal.connect_scoped(listener)
    }

    pub fn unsubscribe(&self, id: ConnectionId) -> bool {
        self.signal.disconnect(id)
    }

    pub fn listener_count(&self) -> usize {
        self.signal.connection_count()
    }
}
