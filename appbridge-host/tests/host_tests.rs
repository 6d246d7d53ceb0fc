use appbridge_host::{
    AppHost, BridgeConfig, BridgeError, Identity, NativeComponent, TriggerContext, TriggerResponse,
};
use std::path::Path;
use std::time::Duration;

fn component(trigger: &str) -> Box<NativeComponent> {
    let mut component = NativeComponent::new();
    component
        .register_trigger(
            trigger,
            |ctx: &TriggerContext| Ok(TriggerResponse::new(ctx.store(), Vec::new())),
            "{}",
            "{}",
        )
        .unwrap();
    Box::new(component)
}

#[test]
fn insert_and_get() {
    let mut host = AppHost::default();
    host.insert("todo", component("new-todos")).unwrap();
    assert!(host.is_loaded("todo"));
    assert_eq!(host.len(), 1);
    let app = host.get("todo").unwrap();
    assert_eq!(app.name(), "todo");
    assert_eq!(app.trigger_ids(), vec!["new-todos"]);
}

#[test]
fn duplicate_app_id_is_rejected() {
    let mut host = AppHost::default();
    host.insert("todo", component("a")).unwrap();
    let err = host.insert("todo", component("b")).unwrap_err();
    assert!(matches!(err, BridgeError::AppAlreadyLoaded(id) if id == "todo"));
    assert_eq!(host.get("todo").unwrap().trigger_ids(), vec!["a"]);
}

#[test]
fn unload_removes_app() {
    let mut host = AppHost::default();
    host.insert("todo", component("a")).unwrap();
    host.unload("todo").unwrap();
    assert!(!host.is_loaded("todo"));
    assert!(host.is_empty());
}

#[test]
fn unknown_app_is_not_found() {
    let mut host = AppHost::default();
    assert!(matches!(host.get("nope"), Err(BridgeError::AppNotFound(_))));
    assert!(matches!(host.unload("nope"), Err(BridgeError::AppNotFound(_))));
}

#[test]
fn app_ids_are_sorted() {
    let mut host = AppHost::default();
    host.insert("zeta", component("z")).unwrap();
    host.insert("alpha", component("a")).unwrap();
    assert_eq!(host.app_ids(), vec!["alpha", "zeta"]);
}

#[test]
fn load_missing_file_leaves_host_empty() {
    let mut host = AppHost::default();
    let err = host.load(Path::new("/nonexistent/todo.wasm")).unwrap_err();
    assert!(matches!(err, BridgeError::Load(_)));
    assert!(host.is_empty());
}

#[test]
fn apps_inherit_host_limits() {
    let config = BridgeConfig::default().with_timeout(Duration::from_secs(5));
    let mut host = AppHost::new(config);
    host.insert("todo", component("a")).unwrap();
    assert_eq!(host.get("todo").unwrap().timeout(), Duration::from_secs(5));
}

#[tokio::test]
async fn apps_are_independent() {
    let mut host = AppHost::default();
    host.insert("one", component("t")).unwrap();
    host.insert("two", component("t")).unwrap();

    let identity = Identity::new("1", "Test", "{}").unwrap();
    let ctx = TriggerContext::new("t", identity, "7").unwrap();
    let (a, b) = tokio::join!(
        host.get("one").unwrap().fetch_events(&ctx),
        host.get("two").unwrap().fetch_events(&ctx),
    );
    assert_eq!(a.unwrap().store, "7");
    assert_eq!(b.unwrap().store, "7");
}
