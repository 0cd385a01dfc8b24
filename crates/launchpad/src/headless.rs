//! In-memory compositor.
//!
//! `HeadlessCompositor` keeps native windows and views as plain records. It
//! is the backend for tests and for running the shell without a display:
//! every call is logged, creation and attachment can be made to fail on
//! demand, and each async call yields once to the scheduler so that
//! concurrently started operations genuinely interleave.

use std::collections::HashMap;

use launchpad_core::{Bounds, NativeError, NativeResult, Point};
use parking_lot::Mutex;
use winit::window::WindowId;

use crate::native::{Compositor, DisplayMode, HostKind, WindowSpec};
use crate::surface::{ContentSource, SurfaceKind};

/// Handle to a headless window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadlessWindow(u64);

impl HeadlessWindow {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Handle to a headless view. Deliberately not `Clone`.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct HeadlessView(u64);

impl HeadlessView {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A native call, as recorded by [`HeadlessCompositor::calls`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    CreateWindow { window: u64, kind: HostKind },
    DestroyWindow(u64),
    SetWindowBounds(u64, Bounds),
    SetWindowVisible(u64, bool),
    FocusWindow(u64),
    MinimizeWindow(u64),
    SetDisplayMode(u64, DisplayMode),
    CreateView { view: u64, kind: SurfaceKind },
    DestroyView(u64),
    AttachView { view: u64, window: u64 },
    DetachView { view: u64, window: u64 },
    SetViewBounds(u64, Bounds),
    SetViewVisible(u64, bool),
}

/// State of one headless window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRecord {
    pub title: String,
    pub kind: HostKind,
    pub bounds: Bounds,
    pub min_size: Option<(i32, i32)>,
    /// Chrome requested at creation.
    pub frameless: bool,
    pub resizable: bool,
    pub always_on_top: bool,
    pub visible: bool,
    pub display_mode: DisplayMode,
    pub minimized: bool,
    pub destroyed: bool,
    /// Attached views, bottom to top.
    pub views: Vec<u64>,
}

/// State of one headless view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRecord {
    pub kind: SurfaceKind,
    pub source: ContentSource,
    pub parent: Option<u64>,
    pub bounds: Bounds,
    pub visible: bool,
    pub destroyed: bool,
}

#[derive(Debug, Default)]
struct Failures {
    window_creations: usize,
    view_creations: usize,
    attaches: usize,
    /// Attaches that still succeed before `attaches` starts counting.
    attaches_skipped: usize,
}

fn take_failure(counter: &mut usize) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

#[derive(Debug)]
struct HeadlessState {
    next_id: u64,
    windows: HashMap<u64, WindowRecord>,
    views: HashMap<u64, ViewRecord>,
    calls: Vec<NativeCall>,
    failures: Failures,
    cursor: Point,
    work_area: Bounds,
    focused: Option<u64>,
}

/// Compositor that keeps everything in memory.
#[derive(Debug)]
pub struct HeadlessCompositor {
    state: Mutex<HeadlessState>,
}

impl Default for HeadlessCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessCompositor {
    /// A compositor with a single 1920x1040 work area and the cursor at its
    /// center.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HeadlessState {
                next_id: 1,
                windows: HashMap::new(),
                views: HashMap::new(),
                calls: Vec::new(),
                failures: Failures::default(),
                cursor: Point::new(960, 520),
                work_area: Bounds::new(0, 0, 1920, 1040),
                focused: None,
            }),
        }
    }

    pub fn set_cursor(&self, cursor: Point) {
        self.state.lock().cursor = cursor;
    }

    pub fn set_work_area(&self, work_area: Bounds) {
        self.state.lock().work_area = work_area;
    }

    /// Make the next `count` window creations fail.
    pub fn fail_next_window_creations(&self, count: usize) {
        self.state.lock().failures.window_creations = count;
    }

    /// Make the next `count` view creations fail.
    pub fn fail_next_view_creations(&self, count: usize) {
        self.state.lock().failures.view_creations = count;
    }

    /// Make the next `count` view attachments fail.
    pub fn fail_next_attaches(&self, count: usize) {
        self.fail_next_attaches_after(0, count);
    }

    /// Let `skip` attachments succeed, then make `count` fail.
    pub fn fail_next_attaches_after(&self, skip: usize, count: usize) {
        let mut state = self.state.lock();
        state.failures.attaches_skipped = skip;
        state.failures.attaches = count;
    }

    pub fn calls(&self) -> Vec<NativeCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn window(&self, window: u64) -> Option<WindowRecord> {
        self.state.lock().windows.get(&window).cloned()
    }

    pub fn view(&self, view: u64) -> Option<ViewRecord> {
        self.state.lock().views.get(&view).cloned()
    }

    /// The window a view is attached to.
    pub fn view_parent(&self, view: u64) -> Option<u64> {
        self.state.lock().views.get(&view).and_then(|record| record.parent)
    }

    /// Number of windows not yet destroyed.
    pub fn live_window_count(&self) -> usize {
        self.state.lock().windows.values().filter(|w| !w.destroyed).count()
    }

    /// Number of views not yet destroyed.
    pub fn live_view_count(&self) -> usize {
        self.state.lock().views.values().filter(|v| !v.destroyed).count()
    }

    /// Number of views ever created.
    pub fn created_view_count(&self) -> usize {
        self.state.lock().views.len()
    }

    pub fn focused_window(&self) -> Option<u64> {
        self.state.lock().focused
    }

    fn with_window(&self, window: &HeadlessWindow, call: NativeCall, f: impl FnOnce(&mut WindowRecord)) {
        let mut state = self.state.lock();
        state.calls.push(call);
        if let Some(record) = state.windows.get_mut(&window.0) {
            f(record);
        }
    }

    fn with_view(&self, view: &HeadlessView, call: NativeCall, f: impl FnOnce(&mut ViewRecord)) {
        let mut state = self.state.lock();
        state.calls.push(call);
        if let Some(record) = state.views.get_mut(&view.0) {
            f(record);
        }
    }
}

impl Compositor for HeadlessCompositor {
    type Window = HeadlessWindow;
    type View = HeadlessView;

    async fn create_window(&self, spec: &WindowSpec) -> NativeResult<HeadlessWindow> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        if take_failure(&mut state.failures.window_creations) {
            return Err(NativeError::WindowCreation("injected failure".into()));
        }
        let id = state.next_id;
        state.next_id += 1;
        state.windows.insert(
            id,
            WindowRecord {
                title: spec.title().to_string(),
                kind: spec.kind(),
                bounds: spec.bounds(),
                min_size: spec.min_size(),
                frameless: spec.kind().is_frameless(),
                resizable: spec.kind().is_resizable(),
                always_on_top: spec.kind().stays_on_top(),
                visible: spec.visible(),
                display_mode: DisplayMode::Normal,
                minimized: false,
                destroyed: false,
                views: Vec::new(),
            },
        );
        state.calls.push(NativeCall::CreateWindow {
            window: id,
            kind: spec.kind(),
        });
        Ok(HeadlessWindow(id))
    }

    fn winit_id(&self, window: &HeadlessWindow) -> Option<WindowId> {
        Some(WindowId::from(window.0))
    }

    fn destroy_window(&self, window: &HeadlessWindow) {
        let mut state = self.state.lock();
        state.calls.push(NativeCall::DestroyWindow(window.0));
        let attached = match state.windows.get_mut(&window.0) {
            Some(record) => {
                record.destroyed = true;
                record.visible = false;
                std::mem::take(&mut record.views)
            }
            None => return,
        };
        // Views still inside a destroyed window lose their parent.
        for view in attached {
            if let Some(record) = state.views.get_mut(&view) {
                record.parent = None;
            }
        }
        if state.focused == Some(window.0) {
            state.focused = None;
        }
    }

    fn set_window_bounds(&self, window: &HeadlessWindow, bounds: Bounds) {
        self.with_window(window, NativeCall::SetWindowBounds(window.0, bounds), |record| {
            record.bounds = bounds;
        });
    }

    fn set_window_visible(&self, window: &HeadlessWindow, visible: bool) {
        self.with_window(window, NativeCall::SetWindowVisible(window.0, visible), |record| {
            record.visible = visible;
            if visible {
                record.minimized = false;
            }
        });
    }

    fn focus_window(&self, window: &HeadlessWindow) {
        self.with_window(window, NativeCall::FocusWindow(window.0), |record| {
            record.minimized = false;
        });
        self.state.lock().focused = Some(window.0);
    }

    fn minimize_window(&self, window: &HeadlessWindow) {
        self.with_window(window, NativeCall::MinimizeWindow(window.0), |record| {
            record.minimized = true;
        });
    }

    fn set_display_mode(&self, window: &HeadlessWindow, mode: DisplayMode) {
        self.with_window(window, NativeCall::SetDisplayMode(window.0, mode), |record| {
            record.display_mode = mode;
        });
    }

    async fn create_view(&self, kind: SurfaceKind, source: &ContentSource) -> NativeResult<HeadlessView> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        if take_failure(&mut state.failures.view_creations) {
            return Err(NativeError::ViewCreation("injected failure".into()));
        }
        let id = state.next_id;
        state.next_id += 1;
        state.views.insert(
            id,
            ViewRecord {
                kind,
                source: source.clone(),
                parent: None,
                bounds: Bounds::default(),
                visible: true,
                destroyed: false,
            },
        );
        state.calls.push(NativeCall::CreateView { view: id, kind });
        Ok(HeadlessView(id))
    }

    fn destroy_view(&self, view: HeadlessView) {
        let mut state = self.state.lock();
        state.calls.push(NativeCall::DestroyView(view.0));
        let parent = match state.views.get_mut(&view.0) {
            Some(record) => {
                record.destroyed = true;
                record.parent.take()
            }
            None => return,
        };
        if let Some(window) = parent.and_then(|parent| state.windows.get_mut(&parent)) {
            window.views.retain(|&v| v != view.0);
        }
    }

    async fn attach_view(&self, window: &HeadlessWindow, view: &HeadlessView) -> NativeResult<()> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        let failures = &mut state.failures;
        let skipped = failures.attaches > 0 && take_failure(&mut failures.attaches_skipped);
        if !skipped && take_failure(&mut failures.attaches) {
            return Err(NativeError::Attach("injected failure".into()));
        }
        match state.windows.get(&window.0) {
            Some(record) if !record.destroyed => {}
            _ => return Err(NativeError::WindowDestroyed),
        }
        match state.views.get(&view.0) {
            Some(record) if record.destroyed => {
                return Err(NativeError::Attach(format!("view {} is destroyed", view.0)));
            }
            Some(record) if record.parent.is_some() => {
                return Err(NativeError::Attach(format!("view {} is already attached", view.0)));
            }
            Some(_) => {}
            None => return Err(NativeError::Attach(format!("unknown view {}", view.0))),
        }
        if let Some(record) = state.views.get_mut(&view.0) {
            record.parent = Some(window.0);
        }
        if let Some(record) = state.windows.get_mut(&window.0) {
            record.views.push(view.0);
        }
        state.calls.push(NativeCall::AttachView {
            view: view.0,
            window: window.0,
        });
        Ok(())
    }

    fn detach_view(&self, window: &HeadlessWindow, view: &HeadlessView) {
        let mut state = self.state.lock();
        state.calls.push(NativeCall::DetachView {
            view: view.0,
            window: window.0,
        });
        if let Some(record) = state.windows.get_mut(&window.0) {
            record.views.retain(|&v| v != view.0);
        }
        if let Some(record) = state.views.get_mut(&view.0) {
            if record.parent == Some(window.0) {
                record.parent = None;
            }
        }
    }

    fn set_view_bounds(&self, view: &HeadlessView, bounds: Bounds) {
        self.with_view(view, NativeCall::SetViewBounds(view.0, bounds), |record| {
            record.bounds = bounds;
        });
    }

    fn set_view_visible(&self, view: &HeadlessView, visible: bool) {
        self.with_view(view, NativeCall::SetViewVisible(view.0, visible), |record| {
            record.visible = visible;
        });
    }

    fn cursor_position(&self) -> Point {
        self.state.lock().cursor
    }

    fn work_area(&self, _point: Point) -> Bounds {
        self.state.lock().work_area
    }
}
