//! The shell context.
//!
//! A [`Shell`] is constructed once at startup and owns every component of
//! the windowing core: the surface registry, the host and view managers,
//! the detach coordinator, the event bus and the native event router.

use std::sync::Arc;

use chrono::Utc;
use launchpad_core::logging::targets;
use launchpad_core::{Bounds, HostId, Point, ShellError, ShellResult, SurfaceId};
use serde::{Deserialize, Serialize};
use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::config::ShellConfig;
use crate::control::ControlChannel;
use crate::detach::DetachCoordinator;
use crate::event_router::{EventRouter, NativeWindowEvent};
use crate::events::{EventBus, RestoreReason, ShellEvent};
use crate::host::{CloseDisposition, HostWindowManager};
use crate::layout::{LayoutEngine, LayoutMode};
use crate::native::{Compositor, HostKind};
use crate::registry::SurfaceRegistry;
use crate::surface::{ContentSource, SurfaceKind, MAIN_VIEW_ID, SETTINGS_VIEW_ID};
use crate::view::ViewManager;

/// Bulk action on following hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowingAction {
    Hide,
    Close,
}

/// Minimum change of the main host's height worth a native resize.
const RESIZE_THRESHOLD: i32 = 5;

/// The windowing core of the launcher.
pub struct Shell<C: Compositor> {
    compositor: Arc<C>,
    config: ShellConfig,
    registry: Arc<SurfaceRegistry>,
    hosts: Arc<HostWindowManager<C>>,
    views: Arc<ViewManager<C>>,
    detach: DetachCoordinator<C>,
    events: Arc<EventBus>,
    main: HostId,
}

impl<C: Compositor> Shell<C> {
    /// Validate the configuration, create the main host and its search
    /// surface.
    pub async fn launch(compositor: C, config: ShellConfig) -> ShellResult<Self> {
        config.validate()?;
        let compositor = Arc::new(compositor);
        let layout = LayoutEngine::new(config.layout);
        let registry = Arc::new(SurfaceRegistry::new());
        let hosts = Arc::new(HostWindowManager::new(compositor.clone()));
        let views = Arc::new(ViewManager::new(
            compositor.clone(),
            hosts.clone(),
            registry.clone(),
            layout,
        ));
        let events = Arc::new(EventBus::new());
        let detach = DetachCoordinator::new(
            compositor.clone(),
            hosts.clone(),
            views.clone(),
            events.clone(),
            config.detach,
            config.content.control_bar(),
        );

        let cursor = compositor.cursor_position();
        let work_area = compositor.work_area(cursor);
        let width = config.layout.window_width;
        let height = layout.host_height(0, LayoutMode::Search);
        let bounds = Bounds::new(
            work_area.x + (work_area.width - width) / 2,
            work_area.y + work_area.height / 4,
            width,
            height,
        )
        .clamp_within(&work_area);

        let main = hosts.create_host(HostKind::Main, bounds, "Launchpad").await?.id;
        views
            .create_surface_with_id(
                main,
                SurfaceId::from(MAIN_VIEW_ID),
                SurfaceKind::PrimarySearch,
                config.content.search(),
            )
            .await?;
        hosts.set_visible(main, true)?;
        tracing::info!(target: targets::HOST, host = %main, ?bounds, "shell launched");

        Ok(Self {
            compositor,
            config,
            registry,
            hosts,
            views,
            detach,
            events,
            main,
        })
    }

    // =========================================================================
    // Components
    // =========================================================================

    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    pub fn hosts(&self) -> &HostWindowManager<C> {
        &self.hosts
    }

    pub fn views(&self) -> &ViewManager<C> {
        &self.views
    }

    pub fn detach(&self) -> &DetachCoordinator<C> {
        &self.detach
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn router(&self) -> &EventRouter {
        self.hosts.router()
    }

    pub fn main_host(&self) -> HostId {
        self.main
    }

    /// The UI command boundary.
    pub fn control(&self) -> ControlChannel<'_, C> {
        ControlChannel::new(self)
    }

    // =========================================================================
    // Settings and plugin surfaces
    // =========================================================================

    /// Open the settings surface on the main host, or bring an existing one
    /// to the front.
    pub async fn open_settings(&self) -> ShellResult<SurfaceId> {
        let id = SurfaceId::from(SETTINGS_VIEW_ID);
        if let Some(host) = self.detach.detached_host_of(&id) {
            self.hosts.focus(host)?;
            return Ok(id);
        }
        if !self.registry.contains(&id) {
            self.views
                .create_surface_with_id(self.main, id.clone(), SurfaceKind::Settings, self.config.content.settings())
                .await?;
        }
        self.expand_main()?;
        self.views.activate_surface(&id)?;
        Ok(id)
    }

    /// Close the settings surface wherever it lives.
    pub fn close_settings(&self) -> ShellResult<()> {
        let id = SurfaceId::from(SETTINGS_VIEW_ID);
        self.close_secondary(&id, RestoreReason::SettingsClosed)
    }

    /// Open plugin content on the main host.
    pub async fn open_plugin(&self, source: ContentSource) -> ShellResult<SurfaceId> {
        let surface = self
            .views
            .create_surface(self.main, SurfaceKind::PluginContent, source)
            .await?;
        self.expand_main()?;
        self.views.activate_surface(&surface.id)?;
        Ok(surface.id)
    }

    /// Close plugin content, together with the following hosts it spawned.
    pub fn close_plugin(&self, id: &SurfaceId) -> ShellResult<()> {
        let surface = self.registry.require(id)?;
        if surface.kind != SurfaceKind::PluginContent {
            return Err(ShellError::SurfaceNotFound(id.clone()));
        }
        for host in self.following_hosts_of(Some(id)) {
            self.hosts.destroy_host(host, &self.views)?;
        }
        self.close_secondary(id, RestoreReason::PluginClosed)
    }

    fn close_secondary(&self, id: &SurfaceId, reason: RestoreReason) -> ShellResult<()> {
        if self.detach.detached_host_of(id).is_some() {
            return self.detach.close_detached_surface(id);
        }
        let host = self.registry.get(id).and_then(|surface| surface.host_id);
        self.views.close_surface(id)?;
        if host == Some(self.main) && self.hosts.require(self.main)?.active_surface.is_none() {
            self.collapse_main()?;
            self.events.emit(ShellEvent::ViewRestoreRequested {
                surface_id: id.clone(),
                host_id: self.main,
                reason,
                timestamp: Utc::now(),
            });
        }
        Ok(())
    }

    /// Grow the main host to show a secondary surface.
    fn expand_main(&self) -> ShellResult<()> {
        let layout = self.views.layout();
        let height = layout.host_height(layout.config().content_max_height, LayoutMode::Settings);
        self.set_main_height(height)
    }

    /// Shrink the main host back to the search header.
    fn collapse_main(&self) -> ShellResult<()> {
        let height = self.views.layout().host_height(0, LayoutMode::Search);
        self.set_main_height(height)?;
        self.relayout(self.main)
    }

    fn set_main_height(&self, height: i32) -> ShellResult<()> {
        let bounds = self.hosts.bounds_of(self.main)?;
        self.hosts.set_bounds(self.main, bounds.with_size(bounds.width, height))
    }

    /// Resize the main host for `content_height` of search results.
    ///
    /// Returns `false` when the change is within a few pixels and skipped.
    pub fn resize_main_height(&self, content_height: i32) -> ShellResult<bool> {
        let host = self.hosts.require(self.main)?;
        let mode = self.views.layout_mode(&host);
        let height = self.views.layout().host_height(content_height, mode);
        if (height - host.bounds.height).abs() <= RESIZE_THRESHOLD {
            return Ok(false);
        }
        self.set_main_height(height)?;
        self.relayout(self.main)?;
        Ok(true)
    }

    // =========================================================================
    // Main host visibility
    // =========================================================================

    pub fn show_main(&self) -> ShellResult<()> {
        self.hosts.set_visible(self.main, true)?;
        self.hosts.focus(self.main)?;
        self.events.emit(ShellEvent::WindowMainShow {
            host_id: self.main,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    pub fn hide_main(&self) -> ShellResult<()> {
        self.hosts.set_visible(self.main, false)?;
        self.events.emit(ShellEvent::WindowMainHide {
            host_id: self.main,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    // =========================================================================
    // Host moves
    // =========================================================================

    /// Apply bounds from a drag or resize gesture in the UI.
    pub fn move_host(&self, host: HostId, bounds: Bounds) -> ShellResult<()> {
        self.hosts.set_bounds(host, bounds)?;
        self.relayout(host)
    }

    /// Move a host, keeping its size.
    pub fn move_host_to(&self, host: HostId, position: Point) -> ShellResult<()> {
        let bounds = self.hosts.bounds_of(host)?;
        self.move_host(host, bounds.with_position(position.x, position.y))
    }

    fn relayout(&self, host: HostId) -> ShellResult<()> {
        self.views.relayout_host(host, |id| self.detach.is_in_flight(id))
    }

    // =========================================================================
    // Following hosts
    // =========================================================================

    /// Create a following host showing `source`, owned by `owner` or by the
    /// main host's active plugin surface.
    pub async fn create_following_window(
        &self,
        source: ContentSource,
        owner: Option<SurfaceId>,
        bounds: Option<Bounds>,
    ) -> ShellResult<(HostId, SurfaceId)> {
        let owner = owner.or_else(|| self.active_plugin());
        let bounds = match bounds {
            Some(bounds) => bounds,
            None => {
                let size = self.config.detach.default_size();
                let work_area = self.compositor.work_area(self.compositor.cursor_position());
                Bounds::new(
                    work_area.x + (work_area.width - size.width) / 2,
                    work_area.y + (work_area.height - size.height) / 2,
                    size.width,
                    size.height,
                )
                .clamp_within(&work_area)
            }
        };
        let host = self
            .hosts
            .create_host(HostKind::Following, bounds, source.to_string())
            .await?
            .id;
        self.hosts.set_owner(host, owner)?;
        let surface = match self
            .views
            .create_surface(host, SurfaceKind::PluginContent, source)
            .await
        {
            Ok(surface) => surface,
            Err(err) => {
                self.hosts.destroy_host(host, &self.views)?;
                return Err(err);
            }
        };
        self.hosts.set_active_surface(host, Some(surface.id.clone()))?;
        self.hosts.set_visible(host, true)?;
        Ok((host, surface.id))
    }

    fn active_plugin(&self) -> Option<SurfaceId> {
        let active = self.hosts.get(self.main)?.active_surface?;
        let surface = self.registry.get(&active)?;
        (surface.kind == SurfaceKind::PluginContent).then_some(active)
    }

    /// Following hosts tied to `owner`, or every following host if `None`.
    fn following_hosts_of(&self, owner: Option<&SurfaceId>) -> Vec<HostId> {
        self.hosts
            .snapshot()
            .into_iter()
            .filter(|host| host.kind == HostKind::Following)
            .filter(|host| owner.is_none_or(|owner| host.owner.as_ref() == Some(owner)))
            .map(|host| host.id)
            .collect()
    }

    /// Hide or close the following hosts of the active plugin item, or all
    /// of them when no plugin is active. Returns the hosts acted on.
    pub fn manage_following_windows(&self, action: FollowingAction) -> ShellResult<Vec<HostId>> {
        let owner = self.active_plugin();
        let targets = self.following_hosts_of(owner.as_ref());
        for host in &targets {
            match action {
                FollowingAction::Hide => self.hosts.set_visible(*host, false)?,
                FollowingAction::Close => self.hosts.destroy_host(*host, &self.views)?,
            }
        }
        tracing::debug!(target: targets::HOST, ?action, count = targets.len(), "following hosts managed");
        Ok(targets)
    }

    /// Show the following hosts of the active plugin item.
    pub fn show_following_windows(&self) -> ShellResult<Vec<HostId>> {
        let owner = self.active_plugin();
        let targets = self.following_hosts_of(owner.as_ref());
        for host in &targets {
            self.hosts.set_visible(*host, true)?;
        }
        Ok(targets)
    }

    // =========================================================================
    // Native events
    // =========================================================================

    /// React to a translated native window event.
    pub async fn handle_native_event(&self, event: NativeWindowEvent) -> ShellResult<()> {
        match event {
            NativeWindowEvent::Moved { host, position } => {
                let bounds = self.hosts.bounds_of(host)?;
                self.on_native_bounds(host, bounds.with_position(position.x, position.y))
            }
            NativeWindowEvent::Resized { host, size } => {
                let bounds = self.hosts.bounds_of(host)?;
                self.on_native_bounds(host, bounds.with_size(size.width, size.height))
            }
            NativeWindowEvent::CloseRequested { host } => self.on_close_requested(host).await.map(|_| ()),
            NativeWindowEvent::Focused { host, focused } => {
                if focused {
                    self.hosts.notify_focus(host);
                }
                Ok(())
            }
        }
    }

    /// Route a winit window event to the host it belongs to.
    ///
    /// Events of unbound windows and events the core ignores are dropped.
    pub async fn dispatch_window_event(&self, window: WindowId, event: &WindowEvent) -> ShellResult<()> {
        match self.router().translate(window, event) {
            Some(event) => self.handle_native_event(event).await,
            None => Ok(()),
        }
    }

    fn on_native_bounds(&self, host: HostId, bounds: Bounds) -> ShellResult<()> {
        self.hosts
            .on_native_bounds_changed(host, bounds, &self.views, |id| self.detach.is_in_flight(id))
    }

    /// Honor an OS close request.
    ///
    /// A detached host first hands its surface back to the main host; if
    /// that fails the host stays open and the error is returned.
    pub async fn on_close_requested(&self, host: HostId) -> ShellResult<CloseDisposition> {
        let disposition = match self.detach.detached_entry(host) {
            Ok(entry) => CloseDisposition::Reattach(entry.surface_id),
            Err(_) => self.hosts.on_native_close_requested(host, &self.views)?,
        };
        match &disposition {
            CloseDisposition::Reattach(_) => {
                self.detach.close_detached_host(host).await?;
            }
            CloseDisposition::Hide => self.hide_main()?,
            CloseDisposition::Destroy => {
                self.detach.forget_host(host);
                self.hosts.destroy_host(host, &self.views)?;
            }
        }
        Ok(disposition)
    }

    // =========================================================================
    // Consistency
    // =========================================================================

    /// Check the registry against every host's paint tree.
    ///
    /// Only meaningful between operations. Returns the first violation found.
    pub fn verify_consistency(&self) -> ShellResult<()> {
        let hosts = self.hosts.snapshot();
        let mains = hosts.iter().filter(|host| host.kind == HostKind::Main).count();
        if mains != 1 {
            return Err(ShellError::invariant(format!("expected one main host, found {mains}")));
        }

        for surface in self.registry.snapshot() {
            let Some(host_id) = surface.host_id else {
                return Err(ShellError::invariant(format!("surface {} has no host", surface.id)));
            };
            let owners: Vec<_> = hosts.iter().filter(|host| host.owns(&surface.id)).collect();
            match owners.as_slice() {
                [owner] if owner.id == host_id => {}
                [] => {
                    return Err(ShellError::invariant(format!(
                        "surface {} references {host_id}, which does not own it",
                        surface.id
                    )));
                }
                _ => {
                    return Err(ShellError::invariant(format!(
                        "surface {} is owned by {} hosts",
                        surface.id,
                        owners.len()
                    )));
                }
            }
            let Some(owner) = owners.first() else {
                continue;
            };
            if !owner.bounds.local().contains(&surface.bounds) {
                return Err(ShellError::invariant(format!(
                    "surface {} bounds {:?} exceed host {}",
                    surface.id, surface.bounds, owner.id
                )));
            }
        }

        for host in &hosts {
            for id in &host.owned_surface_ids {
                if !self.registry.contains(id) {
                    return Err(ShellError::invariant(format!("host {} owns unregistered surface {id}", host.id)));
                }
            }
            if host.kind == HostKind::Detached {
                let kinds: Vec<SurfaceKind> = host
                    .owned_surface_ids
                    .iter()
                    .filter_map(|id| self.registry.get(id))
                    .map(|surface| surface.kind)
                    .collect();
                let content = kinds.iter().filter(|kind| kind.is_migratable()).count();
                let bars = kinds.iter().filter(|kind| **kind == SurfaceKind::ControlBar).count();
                if content != 1 || bars != 1 || kinds.contains(&SurfaceKind::PrimarySearch) {
                    return Err(ShellError::invariant(format!(
                        "detached host {} holds {kinds:?}",
                        host.id
                    )));
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Close every surface and host, the main host last.
    pub fn shutdown(self) -> ShellResult<()> {
        for (host, _) in self.detach.detached_hosts() {
            self.detach.forget_host(host);
        }
        for host in self.hosts.host_ids() {
            if host != self.main {
                self.hosts.destroy_host_unchecked(host, &self.views)?;
            }
        }
        self.hosts.destroy_host_unchecked(self.main, &self.views)?;
        tracing::info!(target: targets::HOST, "shell shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessCompositor;
    use crate::surface::SurfaceState;

    async fn launch() -> Shell<HeadlessCompositor> {
        Shell::launch(HeadlessCompositor::new(), ShellConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_launch_creates_main_host_and_search() {
        let shell = launch().await;
        let main = shell.hosts().get(shell.main_host()).unwrap();
        assert_eq!(main.kind, HostKind::Main);
        assert_eq!(main.bounds, Bounds::new(560, 260, 800, 66));
        assert!(main.visible);
        assert_eq!(main.owned_surface_ids, vec![SurfaceId::from(MAIN_VIEW_ID)]);
        shell.verify_consistency().unwrap();
    }

    #[tokio::test]
    async fn test_launch_rejects_invalid_config() {
        let mut config = ShellConfig::default();
        config.layout.header_height = -1;
        let result = Shell::launch(HeadlessCompositor::new(), config).await;
        assert!(matches!(result, Err(ShellError::Config(_))));
    }

    #[tokio::test]
    async fn test_settings_open_close() {
        let shell = launch().await;
        let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = events.clone();
        shell.events().subscribe(move |event| sink.lock().push(event.clone()));

        let id = shell.open_settings().await.unwrap();
        assert_eq!(shell.hosts().bounds_of(shell.main_host()).unwrap().height, 486);
        assert_eq!(shell.open_settings().await.unwrap(), id);
        assert_eq!(shell.registry().len(), 2);
        shell.verify_consistency().unwrap();

        shell.close_settings().unwrap();
        assert_eq!(shell.hosts().bounds_of(shell.main_host()).unwrap().height, 66);
        assert!(matches!(
            events.lock().last(),
            Some(ShellEvent::ViewRestoreRequested {
                reason: RestoreReason::SettingsClosed,
                ..
            })
        ));
        shell.verify_consistency().unwrap();
    }

    #[tokio::test]
    async fn test_resize_main_height_threshold() {
        let shell = launch().await;
        assert!(!shell.resize_main_height(3).unwrap());
        assert!(shell.resize_main_height(200).unwrap());
        assert_eq!(shell.hosts().bounds_of(shell.main_host()).unwrap().height, 266);
    }

    #[tokio::test]
    async fn test_hide_and_show_main() {
        let shell = launch().await;
        let channels = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = channels.clone();
        shell.events().subscribe(move |event| sink.lock().push(event.channel()));

        let disposition = shell.on_close_requested(shell.main_host()).await.unwrap();
        assert_eq!(disposition, CloseDisposition::Hide);
        assert!(!shell.hosts().get(shell.main_host()).unwrap().visible);
        shell.show_main().unwrap();
        assert_eq!(*channels.lock(), vec!["window-main-hide", "window-main-show"]);
    }

    #[tokio::test]
    async fn test_following_windows_follow_active_plugin() {
        let shell = launch().await;
        let plugin = shell.open_plugin(ContentSource::local("notes.html")).await.unwrap();
        let (owned, _) = shell
            .create_following_window(ContentSource::local("notes-popup.html"), None, None)
            .await
            .unwrap();
        let (other, _) = shell
            .create_following_window(
                ContentSource::local("other.html"),
                Some(SurfaceId::from("plugin-content-99")),
                None,
            )
            .await
            .unwrap();
        assert_eq!(shell.hosts().get(owned).unwrap().owner, Some(plugin.clone()));

        assert_eq!(shell.manage_following_windows(FollowingAction::Hide).unwrap(), vec![owned]);
        assert!(!shell.hosts().get(owned).unwrap().visible);
        assert!(shell.hosts().get(other).unwrap().visible);

        shell.close_plugin(&plugin).unwrap();
        assert!(!shell.hosts().contains(owned));
        assert!(shell.hosts().contains(other));
        shell.verify_consistency().unwrap();
    }

    #[tokio::test]
    async fn test_native_resize_relayouts() {
        let shell = launch().await;
        let plugin = shell.open_plugin(ContentSource::local("notes.html")).await.unwrap();
        shell
            .handle_native_event(NativeWindowEvent::Resized {
                host: shell.main_host(),
                size: launchpad_core::Size::new(1000, 486),
            })
            .await
            .unwrap();
        let surface = shell.registry().get(&plugin).unwrap();
        assert_eq!(surface.bounds, Bounds::new(16, 66, 968, 404));
        assert_eq!(surface.state, SurfaceState::Active);
    }

    #[tokio::test]
    async fn test_shutdown_releases_everything() {
        let shell = launch().await;
        let plugin = shell.open_plugin(ContentSource::local("notes.html")).await.unwrap();
        shell.detach().detach(&plugin).await.unwrap();
        let compositor_views = shell.compositor().live_view_count();
        assert_eq!(compositor_views, 3);

        let compositor = shell.compositor.clone();
        shell.shutdown().unwrap();
        assert_eq!(compositor.live_view_count(), 0);
        assert_eq!(compositor.live_window_count(), 0);
    }
}
