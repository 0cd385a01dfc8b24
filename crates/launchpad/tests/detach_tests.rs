//! Tests for detaching and reattaching surfaces through the shell.

use std::sync::Arc;

use launchpad::headless::NativeCall;
use launchpad::{
    Bounds, ContentSource, HeadlessCompositor, HostKind, MigrationState, NativeWindowEvent, Shell, ShellConfig,
    ShellError, ShellEvent, Size, SurfaceId, SurfaceKind, SurfaceState,
};
use parking_lot::Mutex;
use winit::event::WindowEvent;
use winit::window::WindowId;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn launch() -> Shell<HeadlessCompositor> {
    init_tracing();
    Shell::launch(HeadlessCompositor::new(), ShellConfig::default())
        .await
        .expect("shell launches")
}

fn record_events(shell: &Shell<HeadlessCompositor>) -> Arc<Mutex<Vec<ShellEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    shell.events().subscribe(move |event| sink.lock().push(event.clone()));
    events
}

fn channels(events: &Mutex<Vec<ShellEvent>>) -> Vec<&'static str> {
    events.lock().iter().map(ShellEvent::channel).collect()
}

#[tokio::test]
async fn test_detach_emits_source_and_new_host() {
    let shell = launch().await;
    let h1 = shell.main_host();
    let plugin = shell.open_plugin(ContentSource::local("notes.html")).await.unwrap();
    assert_eq!(plugin, SurfaceId::from("plugin-content-1"));
    let events = record_events(&shell);

    let h2 = shell.detach().detach(&plugin).await.unwrap();

    assert_ne!(h1, h2);
    assert_eq!(shell.hosts().kind_of(h2).unwrap(), HostKind::Detached);
    assert!(!shell.hosts().get(h1).unwrap().owns(&plugin));
    assert!(shell.hosts().get(h2).unwrap().owns(&plugin));

    let events = events.lock();
    match events.as_slice() {
        [ShellEvent::ViewDetached {
            detached_surface_id,
            source_host_id,
            detached_host_id,
            remaining_surface_ids,
            ..
        }] => {
            assert_eq!(detached_surface_id, &plugin);
            assert_eq!(*source_host_id, h1);
            assert_eq!(*detached_host_id, h2);
            assert_eq!(remaining_surface_ids, &vec![SurfaceId::from("main-view")]);
        }
        other => panic!("unexpected events: {other:?}"),
    }
    drop(events);
    shell.verify_consistency().unwrap();
}

#[tokio::test]
async fn test_round_trip_restores_bounds_and_hosts() {
    let shell = launch().await;
    let plugin = shell.open_plugin(ContentSource::local("notes.html")).await.unwrap();
    let before = shell.registry().get(&plugin).unwrap().bounds;
    let host_count = shell.hosts().count();

    shell.detach().detach(&plugin).await.unwrap();
    let target = shell.detach().reattach(&plugin, None).await.unwrap();

    assert_eq!(target, shell.main_host());
    assert_eq!(shell.hosts().count(), host_count);
    let after = shell.registry().get(&plugin).unwrap().bounds;
    assert!(after.approx_eq(&before, 1), "{after:?} vs {before:?}");
    shell.verify_consistency().unwrap();
}

#[tokio::test]
async fn test_relocation_preserves_native_view() {
    let shell = launch().await;
    let plugin = shell.open_plugin(ContentSource::local("notes.html")).await.unwrap();
    let main = shell.main_host();
    let original = shell.hosts().with_view(main, &plugin, |view| view.raw()).unwrap();

    let detached = shell.detach().detach(&plugin).await.unwrap();
    assert_eq!(shell.hosts().with_view(detached, &plugin, |view| view.raw()), Some(original));

    shell.detach().reattach(&plugin, None).await.unwrap();
    assert_eq!(shell.hosts().with_view(main, &plugin, |view| view.raw()), Some(original));

    let destroyed_original = shell
        .compositor()
        .calls()
        .iter()
        .any(|call| *call == NativeCall::DestroyView(original));
    assert!(!destroyed_original);
    assert!(!shell.compositor().view(original).unwrap().destroyed);
}

#[tokio::test]
async fn test_concurrent_detach_is_serialized() {
    let shell = launch().await;
    let plugin = shell.open_plugin(ContentSource::local("notes.html")).await.unwrap();

    let (first, second) = tokio::join!(shell.detach().detach(&plugin), shell.detach().detach(&plugin));

    let results = [first, second];
    let successes = results.iter().filter(|result| result.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|result| matches!(result, Err(ShellError::OperationInProgress(id)) if id == &plugin))
        .count();
    assert_eq!((successes, rejected), (1, 1));
    assert_eq!(shell.hosts().hosts_of_kind(HostKind::Detached).len(), 1);
    shell.verify_consistency().unwrap();
}

#[tokio::test]
async fn test_os_close_reattaches_before_destroying() {
    let shell = launch().await;
    let plugin = shell.open_plugin(ContentSource::local("notes.html")).await.unwrap();
    let h2 = shell.detach().detach(&plugin).await.unwrap();
    let events = record_events(&shell);

    shell
        .handle_native_event(launchpad::NativeWindowEvent::CloseRequested { host: h2 })
        .await
        .unwrap();

    assert_eq!(channels(&events), vec!["view-reattached", "detached-window-closed"]);
    assert!(!shell.hosts().contains(h2));
    assert_eq!(
        shell.detach().migration_state(&plugin),
        Some(MigrationState::Attached(shell.main_host()))
    );
    assert!(shell.registry().contains(&plugin));
    shell.verify_consistency().unwrap();
}

#[tokio::test]
async fn test_os_close_keeps_window_when_reattach_fails() {
    let shell = launch().await;
    let plugin = shell.open_plugin(ContentSource::local("notes.html")).await.unwrap();
    let h2 = shell.detach().detach(&plugin).await.unwrap();

    shell.compositor().fail_next_attaches(1);
    assert!(shell.on_close_requested(h2).await.is_err());

    assert!(shell.hosts().contains(h2));
    assert!(shell.hosts().get(h2).unwrap().owns(&plugin));
    assert_eq!(shell.detach().statistics().rolled_back, 1);
    shell.verify_consistency().unwrap();
}

#[tokio::test]
async fn test_failed_detach_is_invisible() {
    let shell = launch().await;
    let plugin = shell.open_plugin(ContentSource::local("notes.html")).await.unwrap();
    let main_before = shell.hosts().get(shell.main_host()).unwrap();
    let events = record_events(&shell);

    shell.compositor().fail_next_view_creations(1);
    let err = shell.detach().detach(&plugin).await.unwrap_err();
    assert!(matches!(err, ShellError::CreationFailed(_)));

    assert_eq!(shell.hosts().get(shell.main_host()).unwrap(), main_before);
    assert_eq!(shell.hosts().count(), 1);
    assert_eq!(channels(&events), vec!["detach-failed"]);
    shell.verify_consistency().unwrap();
}

#[tokio::test]
async fn test_reattach_into_preferred_host() {
    let shell = launch().await;
    let plugin = shell.open_plugin(ContentSource::local("notes.html")).await.unwrap();
    let (following, _) = shell
        .create_following_window(ContentSource::local("board.html"), None, Some(Bounds::new(0, 0, 640, 480)))
        .await
        .unwrap();
    let detached = shell.detach().detach(&plugin).await.unwrap();

    let target = shell.detach().reattach(&plugin, Some(following)).await.unwrap();
    assert_eq!(target, following);
    assert!(shell.hosts().get(following).unwrap().owns(&plugin));
    assert!(!shell.hosts().contains(detached));

    // A detached host is never a reattach target.
    let again = shell.detach().detach(&plugin).await.unwrap();
    let other = shell.open_settings().await.unwrap();
    let settings_host = shell.detach().detach(&other).await.unwrap();
    let target = shell.detach().reattach(&plugin, Some(settings_host)).await.unwrap();
    assert_eq!(target, shell.main_host());
    assert!(!shell.hosts().contains(again));
    shell.verify_consistency().unwrap();
}

#[tokio::test]
async fn test_surface_in_flight_cannot_be_closed_through_os() {
    let shell = launch().await;
    let plugin = shell.open_plugin(ContentSource::local("notes.html")).await.unwrap();
    let h2 = shell.detach().detach(&plugin).await.unwrap();

    let (reattached, closed) = tokio::join!(shell.detach().reattach(&plugin, None), shell.on_close_requested(h2));
    assert!(reattached.is_ok());
    assert!(matches!(closed, Err(ShellError::OperationInProgress(_))));
    assert!(!shell.hosts().contains(h2));
    shell.verify_consistency().unwrap();
}

#[tokio::test]
async fn test_source_host_survives_while_its_surface_is_in_transit() {
    let shell = launch().await;
    let (following, plugin) = shell
        .create_following_window(ContentSource::local("popup.html"), None, None)
        .await
        .unwrap();
    // The control bar attaches, the migrated surface does not.
    shell.compositor().fail_next_attaches_after(1, 1);

    let (detached, destroyed) = tokio::join!(shell.detach().detach(&plugin), async {
        for _ in 0..32 {
            if shell.registry().get(&plugin).is_some_and(|surface| surface.host_id.is_none()) {
                break;
            }
            tokio::task::yield_now().await;
        }
        shell.hosts().destroy_host(following, shell.views())
    });

    assert!(matches!(detached, Err(ShellError::CreationFailed(_))));
    assert_eq!(destroyed, Err(ShellError::OperationInProgress(plugin.clone())));
    assert_eq!(shell.registry().get(&plugin).unwrap().host_id, Some(following));
    assert!(shell.hosts().get(following).unwrap().owns(&plugin));
    shell.verify_consistency().unwrap();

    shell.hosts().destroy_host(following, shell.views()).unwrap();
    assert!(!shell.registry().contains(&plugin));
    shell.verify_consistency().unwrap();
}

#[tokio::test]
async fn test_detaching_hidden_surface_shows_it() {
    let shell = launch().await;
    let settings = shell.open_settings().await.unwrap();
    shell.open_plugin(ContentSource::local("notes.html")).await.unwrap();
    assert_eq!(shell.registry().get(&settings).unwrap().state, SurfaceState::Hidden);

    let host = shell.detach().detach(&settings).await.unwrap();

    assert_eq!(shell.registry().get(&settings).unwrap().state, SurfaceState::Active);
    let raw = shell.hosts().with_view(host, &settings, |view| view.raw()).unwrap();
    assert!(shell.compositor().view(raw).unwrap().visible);
    assert_eq!(shell.hosts().get(host).unwrap().active_surface, Some(settings.clone()));
    let entry = shell.detach().detached_entry(host).unwrap();
    assert!(shell.hosts().get(host).unwrap().owns(&entry.control_bar_id));
    shell.verify_consistency().unwrap();
}

#[tokio::test]
async fn test_resize_during_detach_fences_migrating_surface() {
    let shell = launch().await;
    let main = shell.main_host();
    let plugin = shell.open_plugin(ContentSource::local("notes.html")).await.unwrap();
    let before = shell.registry().get(&plugin).unwrap().bounds;

    let (detached, relaid) = tokio::join!(shell.detach().detach(&plugin), async {
        while !shell.detach().is_in_flight(&plugin) {
            tokio::task::yield_now().await;
        }
        shell
            .handle_native_event(NativeWindowEvent::Resized {
                host: main,
                size: Size::new(1000, 486),
            })
            .await
            .unwrap();
        let host = shell.hosts().get(main).unwrap();
        let expected = shell.views().layout_bounds(&host, SurfaceKind::PrimarySearch);
        let search = shell.registry().get(&SurfaceId::from("main-view")).unwrap();
        (shell.registry().get(&plugin).unwrap().bounds, search.bounds, expected)
    });

    let (plugin_bounds, search_bounds, expected) = relaid;
    assert_eq!(plugin_bounds, before);
    assert_eq!(search_bounds, expected);
    assert_eq!(search_bounds.width, 984);

    let host = detached.unwrap();
    assert!(shell.hosts().get(host).unwrap().owns(&plugin));
    assert_eq!(shell.hosts().bounds_of(main).unwrap().width, 1000);
    shell.verify_consistency().unwrap();
}

#[tokio::test]
async fn test_winit_close_routes_to_detached_host() {
    let shell = launch().await;
    let plugin = shell.open_plugin(ContentSource::local("notes.html")).await.unwrap();
    let host = shell.detach().detach(&plugin).await.unwrap();
    let window = shell
        .compositor()
        .calls()
        .iter()
        .find_map(|call| match call {
            NativeCall::CreateWindow {
                window,
                kind: HostKind::Detached,
            } => Some(WindowId::from(*window)),
            _ => None,
        })
        .unwrap();
    assert_eq!(shell.router().host_for(window), Some(host));

    shell
        .dispatch_window_event(window, &WindowEvent::CloseRequested)
        .await
        .unwrap();

    assert!(!shell.hosts().contains(host));
    assert_eq!(shell.router().host_for(window), None);
    assert!(shell.hosts().get(shell.main_host()).unwrap().owns(&plugin));
    shell.verify_consistency().unwrap();
}
