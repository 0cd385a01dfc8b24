//! Detach/reattach coordination.
//!
//! The `DetachCoordinator` moves a surface out of its host into a new
//! freestanding host ("detach") and back ("reattach"). Per surface:
//!
//! ```text
//! Attached(h) -> Detaching -> Detached(d) -> Reattaching -> Attached(t)
//!      ^____________|  rollback  ^_______________|
//! ```
//!
//! A migration holds the surface's in-flight entry from its first check to
//! its commit or rollback, across every awaited native call. A second
//! migration of the same surface is refused with
//! [`ShellError::OperationInProgress`] until the first one finishes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use launchpad_core::logging::{operation_span, span_names, targets};
use launchpad_core::{Bounds, HostId, ShellError, ShellResult, SurfaceId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::config::DetachConfig;
use crate::events::{EventBus, ShellEvent};
use crate::host::HostWindowManager;
use crate::layout::LayoutMode;
use crate::native::{Compositor, DisplayMode, HostKind, WindowSpec};
use crate::surface::{ContentSource, Surface, SurfaceKind};
use crate::view::ViewManager;

/// Direction of a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationDirection {
    Detach,
    Reattach,
}

/// Outcome of a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationStatus {
    Pending,
    Committed,
    RolledBack,
}

/// Bookkeeping for one running migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub surface_id: SurfaceId,
    pub source_host_id: HostId,
    pub target_host_id: Option<HostId>,
    pub direction: MigrationDirection,
    pub started_at: DateTime<Utc>,
    pub status: MigrationStatus,
}

/// Where a surface is in the detach state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Attached(HostId),
    Detaching,
    Detached(HostId),
    Reattaching,
}

/// A live detached host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedEntry {
    pub surface_id: SurfaceId,
    pub control_bar_id: SurfaceId,
    pub source_host_id: HostId,
    pub detached_at: DateTime<Utc>,
}

/// Counters over the coordinator's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationStatistics {
    pub committed: u64,
    pub rolled_back: u64,
    pub currently_detached: usize,
}

/// Buttons of a detached host's control bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlBarAction {
    Minimize,
    ToggleMaximize,
    Close,
    Reattach,
}

/// Holds a surface's in-flight entry; dropping it releases the surface.
struct MigrationGuard<'a, C: Compositor> {
    coordinator: &'a DetachCoordinator<C>,
    surface_id: SurfaceId,
}

impl<C: Compositor> MigrationGuard<'_, C> {
    fn set_target(&self, target: HostId) {
        if let Some(record) = self.coordinator.in_flight.lock().get_mut(&self.surface_id) {
            record.target_host_id = Some(target);
        }
    }

    fn finish(self, status: MigrationStatus) {
        let record = self
            .coordinator
            .in_flight
            .lock()
            .get_mut(&self.surface_id)
            .map(|record| {
                record.status = status;
                record.clone()
            });
        let mut stats = self.coordinator.stats.lock();
        match status {
            MigrationStatus::Committed => stats.committed += 1,
            MigrationStatus::RolledBack => stats.rolled_back += 1,
            MigrationStatus::Pending => {}
        }
        drop(stats);
        if let Some(record) = record {
            let elapsed_ms = (Utc::now() - record.started_at).num_milliseconds();
            tracing::debug!(
                target: targets::DETACH,
                surface = %record.surface_id,
                direction = ?record.direction,
                ?status,
                elapsed_ms,
                "migration finished"
            );
        }
    }
}

impl<C: Compositor> Drop for MigrationGuard<'_, C> {
    fn drop(&mut self) {
        self.coordinator.in_flight.lock().remove(&self.surface_id);
    }
}

/// Orchestrator of surface migrations between hosts.
pub struct DetachCoordinator<C: Compositor> {
    compositor: Arc<C>,
    hosts: Arc<HostWindowManager<C>>,
    views: Arc<ViewManager<C>>,
    events: Arc<EventBus>,
    config: DetachConfig,
    /// Content of the control bar drawn around detached surfaces.
    control_bar_source: ContentSource,
    in_flight: Mutex<HashMap<SurfaceId, MigrationRecord>>,
    detached: Mutex<HashMap<HostId, DetachedEntry>>,
    stats: Mutex<MigrationStatistics>,
}

impl<C: Compositor> DetachCoordinator<C> {
    pub fn new(
        compositor: Arc<C>,
        hosts: Arc<HostWindowManager<C>>,
        views: Arc<ViewManager<C>>,
        events: Arc<EventBus>,
        config: DetachConfig,
        control_bar_source: ContentSource,
    ) -> Self {
        Self {
            compositor,
            hosts,
            views,
            events,
            config,
            control_bar_source,
            in_flight: Mutex::new(HashMap::new()),
            detached: Mutex::new(HashMap::new()),
            stats: Mutex::new(MigrationStatistics::default()),
        }
    }

    fn begin(
        &self,
        surface_id: &SurfaceId,
        source: HostId,
        direction: MigrationDirection,
    ) -> ShellResult<MigrationGuard<'_, C>> {
        let mut in_flight = self.in_flight.lock();
        if in_flight.contains_key(surface_id) {
            tracing::debug!(target: targets::DETACH, surface = %surface_id, ?direction, "migration already in flight");
            return Err(ShellError::OperationInProgress(surface_id.clone()));
        }
        in_flight.insert(
            surface_id.clone(),
            MigrationRecord {
                surface_id: surface_id.clone(),
                source_host_id: source,
                target_host_id: None,
                direction,
                started_at: Utc::now(),
                status: MigrationStatus::Pending,
            },
        );
        Ok(MigrationGuard {
            coordinator: self,
            surface_id: surface_id.clone(),
        })
    }

    // =========================================================================
    // Detach
    // =========================================================================

    /// Move a surface into a new detached host. Returns the new host.
    ///
    /// If the surface already lives in a detached host, that host is focused
    /// and returned. On failure everything created for the detach is torn
    /// down and the surface stays in its original host.
    pub async fn detach(&self, surface_id: &SurfaceId) -> ShellResult<HostId> {
        self.run_detach(surface_id)
            .instrument(operation_span(span_names::DETACH, surface_id.as_str()))
            .await
    }

    async fn run_detach(&self, surface_id: &SurfaceId) -> ShellResult<HostId> {
        let surface = self.views.registry().require(surface_id)?;
        let source = surface
            .host_id
            .ok_or_else(|| ShellError::OperationInProgress(surface_id.clone()))?;
        let guard = self.begin(surface_id, source, MigrationDirection::Detach)?;

        if !surface.kind.is_migratable() {
            return Err(ShellError::NotMigratable(surface_id.clone()));
        }
        if self.detached.lock().contains_key(&source) {
            tracing::debug!(target: targets::DETACH, surface = %surface_id, host = %source, "already detached");
            self.hosts.focus(source)?;
            return Ok(source);
        }

        match self.detach_into_new_host(&surface, source, &guard).await {
            Ok((host, control_bar)) => {
                let detached_at = Utc::now();
                self.detached.lock().insert(
                    host,
                    DetachedEntry {
                        surface_id: surface_id.clone(),
                        control_bar_id: control_bar,
                        source_host_id: source,
                        detached_at,
                    },
                );
                guard.finish(MigrationStatus::Committed);
                self.settle_after_departure(source, surface_id);
                self.settle_detached_host(host, surface_id);

                let remaining = self.hosts.owned_surfaces(source).unwrap_or_default();
                tracing::info!(
                    target: targets::DETACH,
                    surface = %surface_id,
                    from = %source,
                    to = %host,
                    "surface detached"
                );
                self.events.emit(ShellEvent::ViewDetached {
                    detached_surface_id: surface_id.clone(),
                    source_host_id: source,
                    detached_host_id: host,
                    remaining_surface_ids: remaining,
                    timestamp: detached_at,
                });
                Ok(host)
            }
            Err(err) => {
                guard.finish(MigrationStatus::RolledBack);
                tracing::error!(
                    target: targets::DETACH,
                    surface = %surface_id,
                    host = %source,
                    error = %err,
                    "detach failed, surface left in place"
                );
                self.events.emit(ShellEvent::DetachFailed {
                    surface_id: surface_id.clone(),
                    host_id: source,
                    error: err.to_string(),
                    timestamp: Utc::now(),
                });
                Err(err)
            }
        }
    }

    async fn detach_into_new_host(
        &self,
        surface: &Surface,
        source: HostId,
        guard: &MigrationGuard<'_, C>,
    ) -> ShellResult<(HostId, SurfaceId)> {
        let bounds = self.placement(surface);
        let spec = WindowSpec::new(surface.content_source.to_string(), HostKind::Detached, bounds)
            .with_min_size(self.config.min_width, self.config.min_height);
        let host = self.hosts.create_host_from_spec(spec).await?.id;
        guard.set_target(host);

        match self.populate_detached_host(host, surface, source).await {
            Ok(control_bar) => Ok((host, control_bar)),
            Err(err) => {
                tracing::warn!(target: targets::DETACH, host = %host, error = %err, "discarding partial detached host");
                if let Err(teardown) = self.hosts.destroy_host(host, &self.views) {
                    tracing::error!(target: targets::DETACH, host = %host, error = %teardown, "failed to discard host");
                }
                Err(err)
            }
        }
    }

    async fn populate_detached_host(
        &self,
        host: HostId,
        surface: &Surface,
        source: HostId,
    ) -> ShellResult<SurfaceId> {
        let control_bar = self
            .views
            .create_surface(host, SurfaceKind::ControlBar, self.control_bar_source.clone())
            .await?;
        self.views.relocate_surface(&surface.id, source, host).await?;
        Ok(control_bar.id)
    }

    /// Outer bounds of a new detached host for `surface`.
    ///
    /// The host opens at the cursor plus the configured offset, large enough
    /// for the surface's current size plus chrome, never smaller than the
    /// configured minimum, and clamped to the work area under the cursor.
    pub fn placement(&self, surface: &Surface) -> Bounds {
        let layout = self.views.layout();
        let (width, height) = if surface.bounds.width > 0 && surface.bounds.height > 0 {
            layout.detached_host_size(surface.bounds.width, surface.bounds.height)
        } else {
            (self.config.default_width, self.config.default_height)
        };
        let cursor = self.compositor.cursor_position();
        let origin = cursor.offset(self.config.offset_x, self.config.offset_y);
        Bounds::new(
            origin.x,
            origin.y,
            width.max(self.config.min_width),
            height.max(self.config.min_height),
        )
        .clamp_within(&self.compositor.work_area(cursor))
    }

    /// Bring a host back to a consistent layout after a surface left it.
    fn settle_after_departure(&self, host: HostId, surface: &SurfaceId) {
        let Ok(snapshot) = self.hosts.require(host) else {
            return;
        };
        if snapshot.kind == HostKind::Main && snapshot.active_surface.as_ref() == Some(surface) {
            self.hosts.clear_active_surface(host, surface);
            let layout = self.views.layout();
            let height = layout.host_height(0, LayoutMode::Search);
            let bounds = snapshot.bounds.with_size(snapshot.bounds.width, height);
            if let Err(err) = self.hosts.set_bounds(host, bounds) {
                tracing::warn!(target: targets::DETACH, host = %host, error = %err, "failed to shrink main host");
            }
        }
        if let Err(err) = self.views.relayout_host(host, |id| self.is_in_flight(id)) {
            tracing::warn!(target: targets::DETACH, host = %host, error = %err, "relayout after departure failed");
        }
    }

    /// Show a freshly populated detached host with its surface visible,
    /// even if the surface was hidden in its source host.
    fn settle_detached_host(&self, host: HostId, surface: &SurfaceId) {
        let shown = self
            .views
            .show_surface(surface)
            .and_then(|()| self.hosts.set_active_surface(host, Some(surface.clone())))
            .and_then(|()| self.views.relayout_host(host, |_| false))
            .and_then(|()| self.hosts.set_visible(host, true))
            .and_then(|()| self.hosts.focus(host));
        if let Err(err) = shown {
            tracing::warn!(target: targets::DETACH, host = %host, error = %err, "failed to show detached host");
        }
    }

    // =========================================================================
    // Reattach
    // =========================================================================

    /// Move a detached surface back into `preferred_target`, or the main host
    /// if no live non-detached target is given. Returns the target host.
    ///
    /// On success the now-empty detached host is destroyed. If the target
    /// refuses the surface, it stays in its detached host.
    pub async fn reattach(&self, surface_id: &SurfaceId, preferred_target: Option<HostId>) -> ShellResult<HostId> {
        self.run_reattach(surface_id, preferred_target)
            .instrument(operation_span(span_names::REATTACH, surface_id.as_str()))
            .await
    }

    async fn run_reattach(&self, surface_id: &SurfaceId, preferred_target: Option<HostId>) -> ShellResult<HostId> {
        let surface = self.views.registry().require(surface_id)?;
        let detached_host = surface
            .host_id
            .ok_or_else(|| ShellError::OperationInProgress(surface_id.clone()))?;
        let guard = self.begin(surface_id, detached_host, MigrationDirection::Reattach)?;

        let entry = self
            .detached
            .lock()
            .get(&detached_host)
            .filter(|entry| &entry.surface_id == surface_id)
            .cloned();
        let Some(entry) = entry else {
            return Err(ShellError::NotDetached(surface_id.clone()));
        };

        let target = self.resolve_target(preferred_target)?;
        guard.set_target(target);

        if let Err(err) = self.views.relocate_surface(surface_id, detached_host, target).await {
            guard.finish(MigrationStatus::RolledBack);
            tracing::warn!(
                target: targets::DETACH,
                surface = %surface_id,
                host = %detached_host,
                error = %err,
                "reattach failed, surface stays detached"
            );
            return Err(err);
        }

        self.detached.lock().remove(&detached_host);
        guard.finish(MigrationStatus::Committed);
        self.settle_after_arrival(target, surface_id);

        tracing::info!(
            target: targets::DETACH,
            surface = %surface_id,
            from = %detached_host,
            to = %target,
            "surface reattached"
        );
        self.events.emit(ShellEvent::ViewReattached {
            surface_id: surface_id.clone(),
            source_host_id: entry.source_host_id,
            detached_host_id: detached_host,
            target_host_id: target,
            timestamp: Utc::now(),
        });

        self.discard_detached_host(detached_host, surface_id);
        Ok(target)
    }

    fn resolve_target(&self, preferred: Option<HostId>) -> ShellResult<HostId> {
        if let Some(host) = preferred {
            let usable = self.hosts.is_alive(host)
                && self.hosts.kind_of(host).is_ok_and(|kind| kind != HostKind::Detached);
            if usable {
                return Ok(host);
            }
            tracing::debug!(target: targets::DETACH, host = %host, "preferred target unusable, using main host");
        }
        self.hosts.require_main()
    }

    fn settle_after_arrival(&self, host: HostId, surface: &SurfaceId) {
        let Ok(snapshot) = self.hosts.require(host) else {
            return;
        };
        if snapshot.kind == HostKind::Main {
            let layout = self.views.layout();
            let height = layout.host_height(layout.config().content_max_height, LayoutMode::Settings);
            let bounds = snapshot.bounds.with_size(snapshot.bounds.width, height);
            let settled = self
                .hosts
                .set_bounds(host, bounds)
                .and_then(|()| self.views.activate_surface(surface));
            if let Err(err) = settled {
                tracing::warn!(target: targets::DETACH, host = %host, error = %err, "failed to settle main host");
            }
        } else if let Err(err) = self.views.relayout_host(host, |id| self.is_in_flight(id)) {
            tracing::warn!(target: targets::DETACH, host = %host, error = %err, "relayout after arrival failed");
        }
    }

    /// Destroy an empty detached host and announce it.
    fn discard_detached_host(&self, host: HostId, surface: &SurfaceId) {
        if let Err(err) = self.hosts.destroy_host(host, &self.views) {
            tracing::error!(target: targets::DETACH, host = %host, error = %err, "failed to destroy detached host");
            return;
        }
        self.events.emit(ShellEvent::DetachedWindowClosed {
            surface_id: surface.clone(),
            detached_host_id: host,
            timestamp: Utc::now(),
        });
    }

    // =========================================================================
    // Detached host actions
    // =========================================================================

    /// Honor an OS close request on a detached host by reattaching its
    /// surface to the main host first.
    ///
    /// If the reattach fails the host stays open and the error is returned.
    pub async fn close_detached_host(&self, host: HostId) -> ShellResult<HostId> {
        let entry = self.detached_entry(host)?;
        tracing::info!(target: targets::DETACH, host = %host, surface = %entry.surface_id, "detached host closing, reattaching");
        self.reattach(&entry.surface_id, None).await
    }

    /// Close a detached surface for good, together with its host.
    pub fn close_detached_surface(&self, surface_id: &SurfaceId) -> ShellResult<()> {
        let Some(host) = self.detached_host_of(surface_id) else {
            return Err(ShellError::NotDetached(surface_id.clone()));
        };
        let guard = self.begin(surface_id, host, MigrationDirection::Reattach)?;
        self.views.close_surface(surface_id)?;
        self.detached.lock().remove(&host);
        drop(guard);
        self.discard_detached_host(host, surface_id);
        Ok(())
    }

    /// Run a control bar button of a detached host.
    pub async fn control_bar_action(&self, host: HostId, action: ControlBarAction) -> ShellResult<()> {
        let entry = self.detached_entry(host)?;
        match action {
            ControlBarAction::Minimize => self.hosts.minimize(host),
            ControlBarAction::ToggleMaximize => {
                let current = self.hosts.require(host)?.display_mode;
                let mode = if current.fills_screen() {
                    DisplayMode::Normal
                } else {
                    DisplayMode::Maximized
                };
                self.hosts.set_display_mode(host, mode)?;
                self.views.relayout_host(host, |id| self.is_in_flight(id))
            }
            ControlBarAction::Close => self.close_detached_host(host).await.map(|_| ()),
            ControlBarAction::Reattach => self.reattach(&entry.surface_id, None).await.map(|_| ()),
        }
    }

    /// Drop bookkeeping for a detached host destroyed outside a migration.
    pub fn forget_host(&self, host: HostId) -> Option<DetachedEntry> {
        self.detached.lock().remove(&host)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn is_in_flight(&self, surface_id: &SurfaceId) -> bool {
        self.in_flight.lock().contains_key(surface_id)
    }

    /// The running migration of a surface.
    pub fn migration(&self, surface_id: &SurfaceId) -> Option<MigrationRecord> {
        self.in_flight.lock().get(surface_id).cloned()
    }

    pub fn migration_state(&self, surface_id: &SurfaceId) -> Option<MigrationState> {
        if let Some(record) = self.in_flight.lock().get(surface_id) {
            return Some(match record.direction {
                MigrationDirection::Detach => MigrationState::Detaching,
                MigrationDirection::Reattach => MigrationState::Reattaching,
            });
        }
        if let Some(host) = self.detached_host_of(surface_id) {
            return Some(MigrationState::Detached(host));
        }
        self.views
            .registry()
            .get(surface_id)
            .and_then(|surface| surface.host_id)
            .map(MigrationState::Attached)
    }

    /// The detached host holding `surface_id`.
    pub fn detached_host_of(&self, surface_id: &SurfaceId) -> Option<HostId> {
        self.detached
            .lock()
            .iter()
            .find(|(_, entry)| &entry.surface_id == surface_id)
            .map(|(host, _)| *host)
    }

    pub fn detached_entry(&self, host: HostId) -> ShellResult<DetachedEntry> {
        self.detached
            .lock()
            .get(&host)
            .cloned()
            .ok_or(ShellError::HostNotFound(host))
    }

    /// Every live detached host with its entry.
    pub fn detached_hosts(&self) -> Vec<(HostId, DetachedEntry)> {
        self.detached
            .lock()
            .iter()
            .map(|(host, entry)| (*host, entry.clone()))
            .collect()
    }

    pub fn statistics(&self) -> MigrationStatistics {
        MigrationStatistics {
            currently_detached: self.detached.lock().len(),
            ..*self.stats.lock()
        }
    }
}
