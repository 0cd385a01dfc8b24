//! Content surface management.
//!
//! The `ViewManager` creates, closes, lays out and relocates surfaces. It is
//! the only place that turns layout results into registry bounds and native
//! view bounds.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use launchpad_core::logging::{operation_span, span_names, targets};
use launchpad_core::{Bounds, HostId, ShellError, ShellResult, Signal, SurfaceId};
use tracing::Instrument;

use crate::host::{HostWindow, HostWindowManager};
use crate::layout::{LayoutEngine, LayoutMode};
use crate::native::{Compositor, HostKind};
use crate::registry::SurfaceRegistry;
use crate::surface::{
    ContentSource, Surface, SurfaceKind, SurfaceState, CONTROL_BAR_PREFIX, MAIN_VIEW_ID,
    PLUGIN_CONTENT_PREFIX, SETTINGS_VIEW_ID,
};

/// Manager for content surfaces.
pub struct ViewManager<C: Compositor> {
    compositor: Arc<C>,
    hosts: Arc<HostWindowManager<C>>,
    registry: Arc<SurfaceRegistry>,
    layout: LayoutEngine,
    next_plugin: AtomicU64,
    next_control_bar: AtomicU64,
    next_z: AtomicU32,
    surface_created: Signal<SurfaceId>,
    surface_closed: Signal<SurfaceId>,
}

impl<C: Compositor> ViewManager<C> {
    pub fn new(
        compositor: Arc<C>,
        hosts: Arc<HostWindowManager<C>>,
        registry: Arc<SurfaceRegistry>,
        layout: LayoutEngine,
    ) -> Self {
        Self {
            compositor,
            hosts,
            registry,
            layout,
            next_plugin: AtomicU64::new(1),
            next_control_bar: AtomicU64::new(1),
            next_z: AtomicU32::new(1),
            surface_created: Signal::new(),
            surface_closed: Signal::new(),
        }
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &LayoutEngine {
        &self.layout
    }

    /// Id for a new surface of `kind`.
    ///
    /// The search and settings surfaces have fixed ids; plugin content and
    /// control bars are numbered.
    pub fn next_surface_id(&self, kind: SurfaceKind) -> SurfaceId {
        match kind {
            SurfaceKind::PrimarySearch => SurfaceId::from(MAIN_VIEW_ID),
            SurfaceKind::Settings => SurfaceId::from(SETTINGS_VIEW_ID),
            SurfaceKind::PluginContent => {
                let n = self.next_plugin.fetch_add(1, Ordering::Relaxed);
                SurfaceId::new(format!("{PLUGIN_CONTENT_PREFIX}{n}"))
            }
            SurfaceKind::ControlBar => {
                let n = self.next_control_bar.fetch_add(1, Ordering::Relaxed);
                SurfaceId::new(format!("{CONTROL_BAR_PREFIX}{n}"))
            }
        }
    }

    /// Create a surface in `host_id` with a generated id.
    pub async fn create_surface(
        &self,
        host_id: HostId,
        kind: SurfaceKind,
        content_source: ContentSource,
    ) -> ShellResult<Surface> {
        let id = self.next_surface_id(kind);
        self.create_surface_with_id(host_id, id, kind, content_source).await
    }

    /// Create a surface, attach its native view on top of the host's paint
    /// tree and lay it out.
    ///
    /// # Errors
    ///
    /// - [`ShellError::HostNotFound`] if the host is unknown
    /// - [`ShellError::DuplicateId`] if the id is live
    /// - [`ShellError::InvariantViolation`] if the host cannot hold this kind
    /// - [`ShellError::CreationFailed`] if the native view cannot be created
    ///   or attached; nothing is left registered
    pub async fn create_surface_with_id(
        &self,
        host_id: HostId,
        id: SurfaceId,
        kind: SurfaceKind,
        content_source: ContentSource,
    ) -> ShellResult<Surface> {
        let host = self.hosts.require(host_id)?;
        self.check_host_accepts(&host, kind)?;

        // Registering first reserves the id across the awaits below.
        let mut surface = Surface::new(id.clone(), host_id, kind, content_source.clone());
        surface.z_order = self.next_z.fetch_add(1, Ordering::Relaxed);
        self.registry.register(surface)?;

        let view = match self.compositor.create_view(kind, &content_source).await {
            Ok(view) => view,
            Err(err) => {
                tracing::warn!(target: targets::VIEW, surface = %id, error = %err, "native view creation failed");
                let _ = self.registry.unregister(&id);
                return Err(err.into());
            }
        };

        if let Err((err, view)) = self.hosts.insert_view(host_id, id.clone(), view).await {
            tracing::warn!(target: targets::VIEW, surface = %id, host = %host_id, error = %err, "attach failed");
            self.compositor.destroy_view(view);
            let _ = self.registry.unregister(&id);
            return Err(err);
        }

        let settled = self
            .registry
            .set_state(&id, SurfaceState::Active)
            .and_then(|()| self.relayout_surface(host_id, &id));
        if let Err(err) = settled {
            tracing::warn!(target: targets::VIEW, surface = %id, host = %host_id, error = %err, "initial layout failed");
            if let Some(view) = self.hosts.take_view(host_id, &id) {
                self.compositor.destroy_view(view);
            }
            let _ = self.registry.unregister(&id);
            return Err(err);
        }

        tracing::info!(target: targets::VIEW, surface = %id, host = %host_id, ?kind, "surface created");
        self.surface_created.emit(id.clone());
        self.registry.require(&id)
    }

    fn check_host_accepts(&self, host: &HostWindow, kind: SurfaceKind) -> ShellResult<()> {
        if host.kind != HostKind::Detached {
            return Ok(());
        }
        let owned_kinds: Vec<SurfaceKind> = host
            .owned_surface_ids
            .iter()
            .filter_map(|id| self.registry.get(id))
            .map(|surface| surface.kind)
            .collect();
        let rejected = match kind {
            SurfaceKind::PrimarySearch => true,
            SurfaceKind::ControlBar => owned_kinds.contains(&SurfaceKind::ControlBar),
            SurfaceKind::Settings | SurfaceKind::PluginContent => {
                owned_kinds.iter().any(|owned| owned.is_migratable())
            }
        };
        if rejected {
            return Err(ShellError::invariant(format!(
                "detached host {} cannot hold another {kind:?} surface",
                host.id
            )));
        }
        Ok(())
    }

    /// Close a surface: detach it from its host, release the native view and
    /// unregister it.
    ///
    /// Closing an already closed surface succeeds and does nothing.
    pub fn close_surface(&self, id: &SurfaceId) -> ShellResult<()> {
        let Some(surface) = self.registry.get(id) else {
            return self.registry.unregister(id).map(|_| ());
        };
        if surface.is_migrating() {
            return Err(ShellError::OperationInProgress(id.clone()));
        }

        if let Some(host_id) = surface.host_id {
            match self.hosts.take_view(host_id, id) {
                Some(view) => self.compositor.destroy_view(view),
                None => tracing::warn!(
                    target: targets::VIEW,
                    surface = %id,
                    host = %host_id,
                    "surface missing from its host's paint tree"
                ),
            }
            self.hosts.clear_active_surface(host_id, id);
        }
        self.registry.unregister(id)?;

        tracing::info!(target: targets::VIEW, surface = %id, host = ?surface.host_id, "surface closed");
        self.surface_closed.emit(id.clone());
        Ok(())
    }

    /// Move a surface's native view from one host to another.
    ///
    /// The same view is detached and re-attached; its content is never
    /// reloaded. If the target refuses the view it goes back to `from` and
    /// the registry entry is restored.
    pub async fn relocate_surface(&self, id: &SurfaceId, from: HostId, to: HostId) -> ShellResult<()> {
        self.relocate(id, from, to)
            .instrument(operation_span(span_names::RELOCATE, id.as_str()))
            .await
    }

    async fn relocate(&self, id: &SurfaceId, from: HostId, to: HostId) -> ShellResult<()> {
        let surface = self.registry.require(id)?;
        if surface.is_migrating() {
            return Err(ShellError::OperationInProgress(id.clone()));
        }
        if surface.host_id != Some(from) {
            return Err(ShellError::invariant(format!(
                "surface {id} is owned by {:?}, not {from}",
                surface.host_id
            )));
        }
        if !self.hosts.is_alive(to) {
            return Err(ShellError::HostNotFound(to));
        }

        self.registry.begin_transit(id)?;
        let Some(view) = self.hosts.take_view(from, id) else {
            self.registry.abort_transit(id)?;
            return Err(ShellError::invariant(format!(
                "surface {id} is registered to {from} but absent from its paint tree"
            )));
        };

        match self.hosts.insert_view(to, id.clone(), view).await {
            Ok(()) => {
                self.registry.complete_transit(id, to)?;
                self.registry
                    .set_z_order(id, self.next_z.fetch_add(1, Ordering::Relaxed))?;
                self.relayout_surface(to, id)?;
                tracing::info!(target: targets::VIEW, surface = %id, %from, %to, "surface relocated");
                Ok(())
            }
            Err((err, view)) => {
                tracing::warn!(
                    target: targets::VIEW,
                    surface = %id,
                    %from,
                    %to,
                    error = %err,
                    "relocation refused, returning surface to its host"
                );
                if self.return_view(id, from, view).await {
                    self.registry.abort_transit(id)?;
                    let _ = self.relayout_surface(from, id);
                } else {
                    self.registry.unregister(id)?;
                    tracing::error!(target: targets::VIEW, surface = %id, %from, "surface lost its host, closed");
                    self.surface_closed.emit(id.clone());
                }
                Err(err)
            }
        }
    }

    /// Put a view back into `host` after a refused relocation.
    ///
    /// Returns false if the host is gone; the view is destroyed then.
    async fn return_view(&self, id: &SurfaceId, host: HostId, view: C::View) -> bool {
        let Err((err, view)) = self.hosts.insert_view(host, id.clone(), view).await else {
            return true;
        };
        tracing::error!(
            target: targets::VIEW,
            surface = %id,
            %host,
            error = %err,
            "could not re-attach surface to its original host"
        );
        match self.hosts.restore_view(host, id.clone(), view) {
            Ok(()) => true,
            Err(view) => {
                self.compositor.destroy_view(view);
                false
            }
        }
    }

    /// Set a surface's bounds, clamped to its host's local area.
    pub fn apply_bounds(&self, id: &SurfaceId, bounds: Bounds) -> ShellResult<()> {
        let surface = self.registry.require(id)?;
        let Some(host_id) = surface.host_id else {
            return Err(ShellError::OperationInProgress(id.clone()));
        };
        let host_bounds = self.hosts.bounds_of(host_id)?;
        let bounds = bounds.clamp_within(&host_bounds.local());
        self.registry.set_bounds(id, bounds)?;
        self.hosts
            .with_view(host_id, id, |view| self.compositor.set_view_bounds(view, bounds));
        Ok(())
    }

    /// Layout mode of a host, derived from its active surface.
    pub fn layout_mode(&self, host: &HostWindow) -> LayoutMode {
        if host.kind != HostKind::Main {
            return LayoutMode::Window;
        }
        match host
            .active_surface
            .as_ref()
            .and_then(|id| self.registry.get(id))
            .map(|surface| surface.kind)
        {
            Some(SurfaceKind::Settings) => LayoutMode::Settings,
            Some(SurfaceKind::PluginContent) => LayoutMode::Window,
            _ => LayoutMode::Search,
        }
    }

    /// Bounds a surface of `kind` should have inside `host`.
    pub fn layout_bounds(&self, host: &HostWindow, kind: SurfaceKind) -> Bounds {
        match (host.kind, kind) {
            (HostKind::Detached, SurfaceKind::ControlBar) => self.layout.detached_control_bar_bounds(host.bounds),
            (HostKind::Detached, _) => self
                .layout
                .detached_content_bounds(host.bounds, host.display_mode.fills_screen()),
            (HostKind::Main, SurfaceKind::Settings | SurfaceKind::PluginContent) => {
                self.layout.panel_bounds(host.bounds)
            }
            (HostKind::Main, _) => self.layout.content_bounds(host.bounds, self.layout_mode(host)),
            (HostKind::Following, _) => self.layout.content_bounds(host.bounds, LayoutMode::Window),
        }
    }

    fn relayout_surface(&self, host_id: HostId, id: &SurfaceId) -> ShellResult<()> {
        let host = self.hosts.require(host_id)?;
        let surface = self.registry.require(id)?;
        self.apply_bounds(id, self.layout_bounds(&host, surface.kind))
    }

    /// Recompute and apply bounds for every surface of a host.
    ///
    /// Surfaces that are migrating, or for which `fenced` returns true, keep
    /// their bounds.
    pub fn relayout_host(&self, host_id: HostId, fenced: impl Fn(&SurfaceId) -> bool) -> ShellResult<()> {
        let host = self.hosts.require(host_id)?;
        let mut applied = 0usize;
        for id in &host.owned_surface_ids {
            if fenced(id) {
                tracing::trace!(target: targets::VIEW, surface = %id, "skipping fenced surface");
                continue;
            }
            let Some(surface) = self.registry.get(id) else {
                continue;
            };
            if surface.is_migrating() {
                continue;
            }
            self.apply_bounds(id, self.layout_bounds(&host, surface.kind))?;
            applied += 1;
        }
        tracing::debug!(target: targets::VIEW, host = %host_id, applied, "host relaid out");
        Ok(())
    }

    /// Show a secondary surface as its host's active surface.
    ///
    /// Other secondary surfaces on the same host are hidden.
    pub fn activate_surface(&self, id: &SurfaceId) -> ShellResult<()> {
        let surface = self.registry.require(id)?;
        let Some(host_id) = surface.host_id else {
            return Err(ShellError::OperationInProgress(id.clone()));
        };
        let host = self.hosts.require(host_id)?;
        for other in host.owned_surface_ids.iter().filter(|other| *other != id) {
            let is_secondary = self
                .registry
                .get(other)
                .is_some_and(|entry| entry.kind.is_secondary() && !entry.is_migrating());
            if is_secondary {
                self.hide_surface(other)?;
            }
        }
        self.show_surface(id)?;
        self.hosts.set_active_surface(host_id, Some(id.clone()))?;
        self.relayout_host(host_id, |_| false)?;
        tracing::debug!(target: targets::VIEW, surface = %id, host = %host_id, "surface activated");
        Ok(())
    }

    pub fn hide_surface(&self, id: &SurfaceId) -> ShellResult<()> {
        self.set_surface_visible(id, false)
    }

    pub fn show_surface(&self, id: &SurfaceId) -> ShellResult<()> {
        self.set_surface_visible(id, true)
    }

    fn set_surface_visible(&self, id: &SurfaceId, visible: bool) -> ShellResult<()> {
        let surface = self.registry.require(id)?;
        let Some(host_id) = surface.host_id else {
            return Err(ShellError::OperationInProgress(id.clone()));
        };
        let state = if visible {
            SurfaceState::Active
        } else {
            SurfaceState::Hidden
        };
        self.registry.set_state(id, state)?;
        self.hosts
            .with_view(host_id, id, |view| self.compositor.set_view_visible(view, visible));
        if !visible {
            self.hosts.clear_active_surface(host_id, id);
        }
        Ok(())
    }

    /// Surfaces owned by a host, in paint order.
    pub fn surfaces_of(&self, host_id: HostId) -> ShellResult<Vec<Surface>> {
        Ok(self
            .hosts
            .owned_surfaces(host_id)?
            .iter()
            .filter_map(|id| self.registry.get(id))
            .collect())
    }

    /// Signal emitted after a surface is created and laid out.
    pub fn surface_created(&self) -> &Signal<SurfaceId> {
        &self.surface_created
    }

    /// Signal emitted after a surface is closed.
    pub fn surface_closed(&self) -> &Signal<SurfaceId> {
        &self.surface_closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessCompositor;

    struct Fixture {
        compositor: Arc<HeadlessCompositor>,
        hosts: Arc<HostWindowManager<HeadlessCompositor>>,
        views: ViewManager<HeadlessCompositor>,
    }

    fn fixture() -> Fixture {
        let compositor = Arc::new(HeadlessCompositor::new());
        let hosts = Arc::new(HostWindowManager::new(compositor.clone()));
        let views = ViewManager::new(
            compositor.clone(),
            hosts.clone(),
            Arc::new(SurfaceRegistry::new()),
            LayoutEngine::default(),
        );
        Fixture {
            compositor,
            hosts,
            views,
        }
    }

    fn source() -> ContentSource {
        ContentSource::local("plugin/index.html")
    }

    #[tokio::test]
    async fn test_create_surface_on_unknown_host() {
        let f = fixture();
        let host = f.hosts.create_host(HostKind::Main, Bounds::from_size(800, 66), "m").await.unwrap();
        f.hosts.destroy_host_unchecked(host.id, &f.views).unwrap();
        let err = f
            .views
            .create_surface(host.id, SurfaceKind::PluginContent, source())
            .await
            .unwrap_err();
        assert_eq!(err, ShellError::HostNotFound(host.id));
    }

    #[tokio::test]
    async fn test_create_surface_registers_and_attaches() {
        let f = fixture();
        let host = f
            .hosts
            .create_host(HostKind::Main, Bounds::new(560, 200, 800, 486), "m")
            .await
            .unwrap();
        let search = f
            .views
            .create_surface(host.id, SurfaceKind::PrimarySearch, ContentSource::local("index.html"))
            .await
            .unwrap();
        assert_eq!(search.id.as_str(), MAIN_VIEW_ID);
        assert_eq!(search.state, SurfaceState::Active);
        assert_eq!(search.bounds, Bounds::new(0, 0, 800, 50));

        let plugin = f
            .views
            .create_surface(host.id, SurfaceKind::PluginContent, source())
            .await
            .unwrap();
        assert_eq!(plugin.id.as_str(), "plugin-content-1");
        assert_eq!(plugin.bounds, Bounds::new(16, 66, 768, 404));
        assert_eq!(
            f.hosts.get(host.id).unwrap().owned_surface_ids,
            vec![search.id.clone(), plugin.id.clone()]
        );
    }

    #[tokio::test]
    async fn test_failed_view_creation_leaves_nothing() {
        let f = fixture();
        let host = f.hosts.create_host(HostKind::Main, Bounds::from_size(800, 66), "m").await.unwrap();
        f.compositor.fail_next_view_creations(1);
        let err = f
            .views
            .create_surface(host.id, SurfaceKind::Settings, source())
            .await
            .unwrap_err();
        assert!(matches!(err, ShellError::CreationFailed(_)));
        assert!(f.views.registry().is_empty());

        f.compositor.fail_next_attaches(1);
        assert!(f.views.create_surface(host.id, SurfaceKind::Settings, source()).await.is_err());
        assert!(f.views.registry().is_empty());
        assert_eq!(f.compositor.live_view_count(), 0);
    }

    #[tokio::test]
    async fn test_surface_closed_during_creation_is_released() {
        let f = fixture();
        let host = f.hosts.create_host(HostKind::Main, Bounds::from_size(800, 486), "m").await.unwrap();
        let id = SurfaceId::from(SETTINGS_VIEW_ID);

        let (created, closed) = tokio::join!(
            f.views
                .create_surface_with_id(host.id, id.clone(), SurfaceKind::Settings, source()),
            async {
                tokio::task::yield_now().await;
                f.views.close_surface(&id)
            }
        );

        closed.unwrap();
        assert_eq!(created.unwrap_err(), ShellError::SurfaceNotFound(id.clone()));
        assert!(!f.views.registry().contains(&id));
        assert!(!f.hosts.get(host.id).unwrap().owns(&id));
        assert_eq!(f.compositor.live_view_count(), 0);
    }

    #[tokio::test]
    async fn test_close_surface_is_idempotent() {
        let f = fixture();
        let host = f.hosts.create_host(HostKind::Main, Bounds::from_size(800, 486), "m").await.unwrap();
        let settings = f
            .views
            .create_surface(host.id, SurfaceKind::Settings, source())
            .await
            .unwrap();
        f.views.close_surface(&settings.id).unwrap();
        f.views.close_surface(&settings.id).unwrap();
        assert!(f.views.close_surface(&SurfaceId::from("never")).unwrap_err().is_not_found());
        assert!(f.hosts.get(host.id).unwrap().owned_surface_ids.is_empty());
        assert_eq!(f.compositor.live_view_count(), 0);
    }

    #[tokio::test]
    async fn test_relocate_moves_same_view() {
        let f = fixture();
        let h1 = f.hosts.create_host(HostKind::Main, Bounds::from_size(800, 486), "m").await.unwrap();
        let h2 = f
            .hosts
            .create_host(HostKind::Following, Bounds::from_size(640, 480), "f")
            .await
            .unwrap();
        let plugin = f
            .views
            .create_surface(h1.id, SurfaceKind::PluginContent, source())
            .await
            .unwrap();
        let raw = f.hosts.with_view(h1.id, &plugin.id, |view| view.raw()).unwrap();

        f.views.relocate_surface(&plugin.id, h1.id, h2.id).await.unwrap();

        assert_eq!(f.hosts.with_view(h2.id, &plugin.id, |view| view.raw()), Some(raw));
        assert!(!f.hosts.get(h1.id).unwrap().owns(&plugin.id));
        let entry = f.views.registry().get(&plugin.id).unwrap();
        assert_eq!(entry.host_id, Some(h2.id));
        assert_eq!(entry.bounds, Bounds::new(8, 8, 624, 464));
        assert_eq!(f.compositor.created_view_count(), 1);
    }

    #[tokio::test]
    async fn test_relocate_rolls_back_when_target_refuses() {
        let f = fixture();
        let h1 = f.hosts.create_host(HostKind::Main, Bounds::from_size(800, 486), "m").await.unwrap();
        let h2 = f
            .hosts
            .create_host(HostKind::Following, Bounds::from_size(640, 480), "f")
            .await
            .unwrap();
        let plugin = f
            .views
            .create_surface(h1.id, SurfaceKind::PluginContent, source())
            .await
            .unwrap();

        f.compositor.fail_next_attaches(1);
        let err = f.views.relocate_surface(&plugin.id, h1.id, h2.id).await.unwrap_err();
        assert!(matches!(err, ShellError::CreationFailed(_)));

        let entry = f.views.registry().get(&plugin.id).unwrap();
        assert_eq!(entry.host_id, Some(h1.id));
        assert_eq!(entry.state, SurfaceState::Active);
        assert!(f.hosts.get(h1.id).unwrap().owns(&plugin.id));
        assert!(!f.hosts.get(h2.id).unwrap().owns(&plugin.id));
    }

    #[tokio::test]
    async fn test_relocate_from_wrong_host() {
        let f = fixture();
        let h1 = f.hosts.create_host(HostKind::Main, Bounds::from_size(800, 486), "m").await.unwrap();
        let h2 = f
            .hosts
            .create_host(HostKind::Following, Bounds::from_size(640, 480), "f")
            .await
            .unwrap();
        let plugin = f
            .views
            .create_surface(h1.id, SurfaceKind::PluginContent, source())
            .await
            .unwrap();
        assert!(matches!(
            f.views.relocate_surface(&plugin.id, h2.id, h1.id).await,
            Err(ShellError::InvariantViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_detached_host_rejects_search_surface() {
        let f = fixture();
        let host = f
            .hosts
            .create_host(HostKind::Detached, Bounds::from_size(800, 600), "d")
            .await
            .unwrap();
        assert!(matches!(
            f.views.create_surface(host.id, SurfaceKind::PrimarySearch, source()).await,
            Err(ShellError::InvariantViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_relayout_skips_fenced_surfaces() {
        let f = fixture();
        let host = f
            .hosts
            .create_host(HostKind::Following, Bounds::from_size(640, 480), "f")
            .await
            .unwrap();
        let a = f.views.create_surface(host.id, SurfaceKind::PluginContent, source()).await.unwrap();
        let b = f.views.create_surface(host.id, SurfaceKind::PluginContent, source()).await.unwrap();

        f.hosts
            .on_native_bounds_changed(host.id, Bounds::from_size(1000, 700), &f.views, |id| id == &a.id)
            .unwrap();

        assert_eq!(f.views.registry().get(&a.id).unwrap().bounds, Bounds::new(8, 8, 624, 464));
        assert_eq!(f.views.registry().get(&b.id).unwrap().bounds, Bounds::new(8, 8, 984, 684));
    }

    #[tokio::test]
    async fn test_activate_hides_other_secondary_surfaces() {
        let f = fixture();
        let host = f.hosts.create_host(HostKind::Main, Bounds::from_size(800, 486), "m").await.unwrap();
        f.views
            .create_surface(host.id, SurfaceKind::PrimarySearch, source())
            .await
            .unwrap();
        let settings = f.views.create_surface(host.id, SurfaceKind::Settings, source()).await.unwrap();
        let plugin = f.views.create_surface(host.id, SurfaceKind::PluginContent, source()).await.unwrap();

        f.views.activate_surface(&settings.id).unwrap();
        f.views.activate_surface(&plugin.id).unwrap();

        assert_eq!(f.views.registry().get(&settings.id).unwrap().state, SurfaceState::Hidden);
        assert_eq!(f.views.registry().get(&plugin.id).unwrap().state, SurfaceState::Active);
        let host = f.hosts.get(host.id).unwrap();
        assert_eq!(host.active_surface, Some(plugin.id.clone()));
        assert_eq!(f.views.layout_mode(&host), LayoutMode::Window);
        let search = f.views.registry().get(&SurfaceId::from(MAIN_VIEW_ID)).unwrap();
        assert_eq!(search.bounds, Bounds::new(8, 8, 784, 470));
    }
}
