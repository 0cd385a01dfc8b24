//! Host window management.
//!
//! The `HostWindowManager` creates and destroys top-level host windows and
//! tracks, per host, its bounds, display mode, kind and the paint tree of
//! native views it owns. Native move/resize/close notifications enter the
//! windowing core here.

use launchpad_core::logging::{span_names, targets};
use launchpad_core::{Bounds, HostId, OperationSpan, Point, ShellError, ShellResult, Signal, SurfaceId};
use parking_lot::RwLock;
use slotmap::SlotMap;
use std::sync::Arc;

use crate::event_router::EventRouter;
use crate::native::{Compositor, DisplayMode, HostKind, WindowSpec};
use crate::paint_tree::PaintTree;
use crate::view::ViewManager;

/// Lifecycle of a host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostState {
    Active,
    /// Owned surfaces are being torn down.
    Closing,
    Destroyed,
}

/// A snapshot of one host window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostWindow {
    pub id: HostId,
    pub kind: HostKind,
    /// Outer bounds in screen coordinates.
    pub bounds: Bounds,
    pub display_mode: DisplayMode,
    pub state: HostState,
    pub visible: bool,
    pub title: String,
    /// Surface that spawned this host (following hosts only).
    pub owner: Option<SurfaceId>,
    /// Secondary surface currently shown.
    pub active_surface: Option<SurfaceId>,
    /// Surfaces in paint order.
    pub owned_surface_ids: Vec<SurfaceId>,
}

impl HostWindow {
    pub fn owns(&self, surface: &SurfaceId) -> bool {
        self.owned_surface_ids.contains(surface)
    }
}

/// What should happen after the OS asked to close a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseDisposition {
    /// Move this surface back to a live host, then destroy the detached host.
    Reattach(SurfaceId),
    /// Hide the window; the main host lives for the process lifetime.
    Hide,
    /// Tear the host down with everything it owns.
    Destroy,
}

struct HostEntry<C: Compositor> {
    kind: HostKind,
    bounds: Bounds,
    display_mode: DisplayMode,
    state: HostState,
    visible: bool,
    title: String,
    owner: Option<SurfaceId>,
    active_surface: Option<SurfaceId>,
    /// Position to restore when the host is shown again.
    restore_position: Option<Point>,
    window: C::Window,
    paint_tree: PaintTree<C::View>,
}

impl<C: Compositor> HostEntry<C> {
    fn snapshot(&self, id: HostId) -> HostWindow {
        HostWindow {
            id,
            kind: self.kind,
            bounds: self.bounds,
            display_mode: self.display_mode,
            state: self.state,
            visible: self.visible,
            title: self.title.clone(),
            owner: self.owner.clone(),
            active_surface: self.active_surface.clone(),
            owned_surface_ids: self.paint_tree.ids(),
        }
    }
}

/// Manager for every host window of the process.
///
/// Exactly one [`HostKind::Main`] host exists once the shell has launched.
pub struct HostWindowManager<C: Compositor> {
    compositor: Arc<C>,
    hosts: RwLock<SlotMap<HostId, HostEntry<C>>>,
    router: Arc<EventRouter>,
    host_created: Signal<HostId>,
    host_destroyed: Signal<HostId>,
    host_focused: Signal<HostId>,
    bounds_changed: Signal<(HostId, Bounds)>,
}

impl<C: Compositor> HostWindowManager<C> {
    pub fn new(compositor: Arc<C>) -> Self {
        Self {
            compositor,
            hosts: RwLock::new(SlotMap::with_key()),
            router: Arc::new(EventRouter::new()),
            host_created: Signal::new(),
            host_destroyed: Signal::new(),
            host_focused: Signal::new(),
            bounds_changed: Signal::new(),
        }
    }

    /// Create a native host window and register it.
    ///
    /// # Errors
    ///
    /// - [`ShellError::InvariantViolation`] if `kind` is main and a main host exists
    /// - [`ShellError::CreationFailed`] if the native window cannot be created
    pub async fn create_host(
        &self,
        kind: HostKind,
        bounds: Bounds,
        title: impl Into<String>,
    ) -> ShellResult<HostWindow> {
        self.create_host_from_spec(WindowSpec::new(title, kind, bounds.clamped())).await
    }

    /// Like [`create_host`](Self::create_host) with a full window spec.
    pub async fn create_host_from_spec(&self, spec: WindowSpec) -> ShellResult<HostWindow> {
        let kind = spec.kind();
        if kind == HostKind::Main && self.main_host().is_some() {
            return Err(ShellError::invariant("a main host already exists"));
        }

        let window = self.compositor.create_window(&spec).await?;
        let winit_id = self.compositor.winit_id(&window);

        let snapshot = {
            let mut hosts = self.hosts.write();
            if kind == HostKind::Main && hosts.values().any(|entry| entry.kind == HostKind::Main) {
                drop(hosts);
                self.compositor.destroy_window(&window);
                return Err(ShellError::invariant("a main host already exists"));
            }
            let mut created = None;
            hosts.insert_with_key(|id| {
                let entry = HostEntry {
                    kind,
                    bounds: spec.bounds(),
                    display_mode: DisplayMode::Normal,
                    state: HostState::Active,
                    visible: spec.visible(),
                    title: spec.title().to_string(),
                    owner: None,
                    active_surface: None,
                    restore_position: None,
                    window,
                    paint_tree: PaintTree::new(),
                };
                created = Some(entry.snapshot(id));
                entry
            });
            created
        };
        let Some(snapshot) = snapshot else {
            return Err(ShellError::invariant("host entry was not created"));
        };
        if let Some(window) = winit_id {
            self.router.bind(window, snapshot.id);
        }

        tracing::info!(
            target: targets::HOST,
            host = %snapshot.id,
            kind = %kind,
            bounds = ?snapshot.bounds,
            "host created"
        );
        self.host_created.emit(snapshot.id);
        Ok(snapshot)
    }

    /// Destroy a host and every surface it owns.
    ///
    /// Owned surfaces are closed before the native window is torn down, so
    /// no surface ever references a dead host. Content that should survive
    /// must be migrated away before calling this. The main host cannot be
    /// destroyed while the shell is running.
    pub fn destroy_host(&self, id: HostId, views: &ViewManager<C>) -> ShellResult<()> {
        if self.kind_of(id)? == HostKind::Main {
            return Err(ShellError::invariant("the main host cannot be destroyed"));
        }
        self.destroy_host_unchecked(id, views)
    }

    /// Destroy any host, including main. Used during shutdown.
    ///
    /// Fails with [`ShellError::OperationInProgress`] while a surface is on
    /// its way out of the host; the relocation may still need to put it back.
    pub(crate) fn destroy_host_unchecked(&self, id: HostId, views: &ViewManager<C>) -> ShellResult<()> {
        let _span = OperationSpan::new(span_names::DESTROY_HOST, &id.to_string());
        if let Some(surface) = views.registry().in_transit_from(id).into_iter().next() {
            tracing::debug!(
                target: targets::HOST,
                host = %id,
                surface = %surface,
                "host is the origin of a relocation, not destroying"
            );
            return Err(ShellError::OperationInProgress(surface));
        }
        let owned = {
            let mut hosts = self.hosts.write();
            let entry = hosts.get_mut(id).ok_or(ShellError::HostNotFound(id))?;
            entry.state = HostState::Closing;
            entry.paint_tree.ids()
        };

        // Top of the paint tree first.
        for surface in owned.iter().rev() {
            if let Err(err) = views.close_surface(surface) {
                tracing::warn!(
                    target: targets::HOST,
                    host = %id,
                    surface = %surface,
                    error = %err,
                    "failed to close surface during host teardown"
                );
            }
        }

        let mut entry = {
            let mut hosts = self.hosts.write();
            hosts.remove(id).ok_or(ShellError::HostNotFound(id))?
        };
        // Anything left could not be closed through the registry; release
        // the native views directly so nothing leaks.
        for (surface, view) in entry.paint_tree.drain() {
            tracing::error!(target: targets::HOST, host = %id, surface = %surface, "releasing leftover view");
            self.compositor.detach_view(&entry.window, &view);
            self.compositor.destroy_view(view);
        }
        self.compositor.destroy_window(&entry.window);
        self.router.unbind_host(id);

        tracing::info!(target: targets::HOST, host = %id, kind = %entry.kind, "host destroyed");
        self.host_destroyed.emit(id);
        Ok(())
    }

    /// Record bounds reported by the OS and re-lay-out owned surfaces.
    ///
    /// Surfaces for which `fenced` returns true are in the middle of a
    /// migration and are skipped; the migration applies their bounds when it
    /// completes.
    pub fn on_native_bounds_changed(
        &self,
        id: HostId,
        bounds: Bounds,
        views: &ViewManager<C>,
        fenced: impl Fn(&SurfaceId) -> bool,
    ) -> ShellResult<()> {
        {
            let mut hosts = self.hosts.write();
            let entry = hosts.get_mut(id).ok_or(ShellError::HostNotFound(id))?;
            if entry.state != HostState::Active {
                tracing::debug!(target: targets::HOST, host = %id, "ignoring bounds change of closing host");
                return Ok(());
            }
            entry.bounds = bounds.clamped();
        }
        tracing::trace!(target: targets::HOST, host = %id, ?bounds, "native bounds changed");
        self.bounds_changed.emit((id, bounds));
        views.relayout_host(id, fenced)
    }

    /// Decide how to honor a close request from the OS.
    pub fn on_native_close_requested(&self, id: HostId, views: &ViewManager<C>) -> ShellResult<CloseDisposition> {
        let host = self.require(id)?;
        let disposition = match host.kind {
            HostKind::Main => CloseDisposition::Hide,
            HostKind::Following => CloseDisposition::Destroy,
            HostKind::Detached => host
                .owned_surface_ids
                .iter()
                .find(|surface| {
                    views
                        .registry()
                        .get(surface)
                        .is_some_and(|entry| entry.kind.is_migratable())
                })
                .cloned()
                .map_or(CloseDisposition::Destroy, CloseDisposition::Reattach),
        };
        tracing::debug!(target: targets::HOST, host = %id, ?disposition, "close requested");
        Ok(disposition)
    }

    // =========================================================================
    // Host state
    // =========================================================================

    /// Move and resize a host.
    pub fn set_bounds(&self, id: HostId, bounds: Bounds) -> ShellResult<()> {
        let bounds = bounds.clamped();
        let window = self.with_entry_mut(id, |entry| {
            entry.bounds = bounds;
            entry.window.clone()
        })?;
        self.compositor.set_window_bounds(&window, bounds);
        self.bounds_changed.emit((id, bounds));
        Ok(())
    }

    pub fn set_display_mode(&self, id: HostId, mode: DisplayMode) -> ShellResult<()> {
        let window = self.with_entry_mut(id, |entry| {
            entry.display_mode = mode;
            entry.window.clone()
        })?;
        self.compositor.set_display_mode(&window, mode);
        Ok(())
    }

    /// Show or hide a host.
    ///
    /// Hiding remembers the current position; showing restores it.
    pub fn set_visible(&self, id: HostId, visible: bool) -> ShellResult<()> {
        let (window, restored) = self.with_entry_mut(id, |entry| {
            let mut restored = None;
            if visible {
                if let Some(position) = entry.restore_position.take() {
                    entry.bounds = entry.bounds.with_position(position.x, position.y);
                    restored = Some(entry.bounds);
                }
            } else {
                entry.restore_position = Some(entry.bounds.origin());
            }
            entry.visible = visible;
            (entry.window.clone(), restored)
        })?;
        if let Some(bounds) = restored {
            self.compositor.set_window_bounds(&window, bounds);
        }
        self.compositor.set_window_visible(&window, visible);
        tracing::debug!(target: targets::HOST, host = %id, visible, "host visibility changed");
        Ok(())
    }

    pub fn focus(&self, id: HostId) -> ShellResult<()> {
        let window = self.window(id)?;
        self.compositor.focus_window(&window);
        self.notify_focus(id);
        Ok(())
    }

    pub fn minimize(&self, id: HostId) -> ShellResult<()> {
        let window = self.window(id)?;
        self.compositor.minimize_window(&window);
        Ok(())
    }

    pub fn set_owner(&self, id: HostId, owner: Option<SurfaceId>) -> ShellResult<()> {
        self.with_entry_mut(id, |entry| entry.owner = owner)
    }

    pub fn set_active_surface(&self, id: HostId, surface: Option<SurfaceId>) -> ShellResult<()> {
        self.with_entry_mut(id, |entry| entry.active_surface = surface)
    }

    /// Clear the active surface of `id` if it is `surface`.
    pub(crate) fn clear_active_surface(&self, id: HostId, surface: &SurfaceId) {
        let _ = self.with_entry_mut(id, |entry| {
            if entry.active_surface.as_ref() == Some(surface) {
                entry.active_surface = None;
            }
        });
    }

    /// Emit the focus signal for a host that gained focus natively.
    pub fn notify_focus(&self, id: HostId) {
        if self.contains(id) {
            self.host_focused.emit(id);
        }
    }

    // =========================================================================
    // Paint tree
    // =========================================================================

    /// Attach a view natively and put it on top of the host's paint tree.
    ///
    /// On failure the view is handed back so the caller can release it.
    pub(crate) async fn insert_view(
        &self,
        id: HostId,
        surface: SurfaceId,
        view: C::View,
    ) -> Result<(), (ShellError, C::View)> {
        let window = match self.window(id) {
            Ok(window) => window,
            Err(err) => return Err((err, view)),
        };
        if let Err(err) = self.compositor.attach_view(&window, &view).await {
            return Err((err.into(), view));
        }

        let pushed = {
            let mut hosts = self.hosts.write();
            match hosts.get_mut(id) {
                Some(entry) if entry.state == HostState::Active => entry
                    .paint_tree
                    .push(surface.clone(), view)
                    .map_err(|view| (ShellError::DuplicateId(surface), view)),
                _ => Err((ShellError::HostNotFound(id), view)),
            }
        };
        if let Err((_, view)) = &pushed {
            self.compositor.detach_view(&window, view);
        }
        pushed
    }

    /// Detach a view natively and take it out of the host's paint tree.
    pub(crate) fn take_view(&self, id: HostId, surface: &SurfaceId) -> Option<C::View> {
        let (window, view) = {
            let mut hosts = self.hosts.write();
            let entry = hosts.get_mut(id)?;
            let view = entry.paint_tree.take(surface)?;
            (entry.window.clone(), view)
        };
        self.compositor.detach_view(&window, &view);
        Some(view)
    }

    /// Put a view back into a paint tree without a native attach.
    ///
    /// Only used when a native reattach already failed; keeps the registry
    /// and paint tree in agreement.
    pub(crate) fn restore_view(&self, id: HostId, surface: SurfaceId, view: C::View) -> Result<(), C::View> {
        let mut hosts = self.hosts.write();
        match hosts.get_mut(id) {
            Some(entry) => entry.paint_tree.push(surface, view),
            None => Err(view),
        }
    }

    /// Run `f` with the native view of `surface` in host `id`.
    pub fn with_view<R>(&self, id: HostId, surface: &SurfaceId, f: impl FnOnce(&C::View) -> R) -> Option<R> {
        let hosts = self.hosts.read();
        hosts.get(id)?.paint_tree.get(surface).map(f)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get(&self, id: HostId) -> Option<HostWindow> {
        self.hosts.read().get(id).map(|entry| entry.snapshot(id))
    }

    pub fn require(&self, id: HostId) -> ShellResult<HostWindow> {
        self.get(id).ok_or(ShellError::HostNotFound(id))
    }

    pub fn contains(&self, id: HostId) -> bool {
        self.hosts.read().contains_key(id)
    }

    /// Check that the host exists and is not being torn down.
    pub fn is_alive(&self, id: HostId) -> bool {
        self.hosts
            .read()
            .get(id)
            .is_some_and(|entry| entry.state == HostState::Active)
    }

    pub fn kind_of(&self, id: HostId) -> ShellResult<HostKind> {
        self.hosts
            .read()
            .get(id)
            .map(|entry| entry.kind)
            .ok_or(ShellError::HostNotFound(id))
    }

    pub fn bounds_of(&self, id: HostId) -> ShellResult<Bounds> {
        self.hosts
            .read()
            .get(id)
            .map(|entry| entry.bounds)
            .ok_or(ShellError::HostNotFound(id))
    }

    /// Surfaces owned by `id`, in paint order.
    pub fn owned_surfaces(&self, id: HostId) -> ShellResult<Vec<SurfaceId>> {
        self.hosts
            .read()
            .get(id)
            .map(|entry| entry.paint_tree.ids())
            .ok_or(ShellError::HostNotFound(id))
    }

    pub fn main_host(&self) -> Option<HostId> {
        self.hosts
            .read()
            .iter()
            .find(|(_, entry)| entry.kind == HostKind::Main)
            .map(|(id, _)| id)
    }

    pub fn require_main(&self) -> ShellResult<HostId> {
        self.main_host()
            .ok_or_else(|| ShellError::invariant("no main host exists"))
    }

    pub fn hosts_of_kind(&self, kind: HostKind) -> Vec<HostId> {
        self.hosts
            .read()
            .iter()
            .filter(|(_, entry)| entry.kind == kind)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn host_ids(&self) -> Vec<HostId> {
        self.hosts.read().keys().collect()
    }

    /// A snapshot of every host.
    pub fn snapshot(&self) -> Vec<HostWindow> {
        self.hosts.read().iter().map(|(id, entry)| entry.snapshot(id)).collect()
    }

    pub fn count(&self) -> usize {
        self.hosts.read().len()
    }

    /// Router from winit windows to the hosts they belong to.
    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    pub(crate) fn window(&self, id: HostId) -> ShellResult<C::Window> {
        self.hosts
            .read()
            .get(id)
            .map(|entry| entry.window.clone())
            .ok_or(ShellError::HostNotFound(id))
    }

    fn with_entry_mut<R>(&self, id: HostId, f: impl FnOnce(&mut HostEntry<C>) -> R) -> ShellResult<R> {
        let mut hosts = self.hosts.write();
        hosts.get_mut(id).map(f).ok_or(ShellError::HostNotFound(id))
    }

    // =========================================================================
    // Signals
    // =========================================================================

    /// Signal emitted after a host is created.
    pub fn host_created(&self) -> &Signal<HostId> {
        &self.host_created
    }

    /// Signal emitted after a host and its native window are gone.
    pub fn host_destroyed(&self) -> &Signal<HostId> {
        &self.host_destroyed
    }

    pub fn host_focused(&self) -> &Signal<HostId> {
        &self.host_focused
    }

    /// Signal emitted when a host's bounds change, natively or by request.
    pub fn bounds_changed(&self) -> &Signal<(HostId, Bounds)> {
        &self.bounds_changed
    }
}
