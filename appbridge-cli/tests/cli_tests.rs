use appbridge_cli::{
    CLI_IDENTITY_ID, load_config, load_identity, read_input, render_capabilities, render_schema,
    render_trigger_response,
};
use appbridge_host::{TriggerEvent, TriggerResponse};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn missing_config_flag_uses_defaults() {
    let config = load_config(None).unwrap();
    assert_eq!(config.limits.timeout, Duration::from_secs(30));
}

#[test]
fn config_file_is_parsed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bridge.toml");
    std::fs::write(&path, "[limits]\ntimeout_secs = 5\n").unwrap();
    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.limits.timeout, Duration::from_secs(5));
}

#[test]
fn invalid_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bridge.toml");
    std::fs::write(&path, "[limits\n").unwrap();
    assert!(load_config(Some(&path)).is_err());
    assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
}

#[test]
fn default_identity() {
    let identity = load_identity(None).unwrap();
    assert_eq!(identity.id(), CLI_IDENTITY_ID);
}

#[test]
fn identity_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("me.json");
    std::fs::write(
        &path,
        r#"{"id":"7","name":"Ada","serialized_profile":"{\"plan\":\"premium\"}"}"#,
    )
    .unwrap();
    let identity = load_identity(Some(&path)).unwrap();
    assert_eq!(identity.name(), "Ada");
    assert_eq!(identity.serialized_profile(), r#"{"plan":"premium"}"#);
}

#[test]
fn identity_without_id_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("me.json");
    std::fs::write(&path, r#"{"id":"","name":"Ada"}"#).unwrap();
    assert!(load_identity(Some(&path)).is_err());
}

#[test]
fn input_handling() {
    assert_eq!(read_input(None).unwrap(), "{}");
    assert_eq!(read_input(Some("  ")).unwrap(), "{}");
    assert_eq!(read_input(Some(r#"{"a":1}"#)).unwrap(), r#"{"a":1}"#);
    assert!(read_input(Some("{not json")).is_err());

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("input.json");
    std::fs::write(&path, r#"{"url":"https://example.com"}"#).unwrap();
    let arg = format!("@{}", path.display());
    assert_eq!(read_input(Some(&arg)).unwrap(), r#"{"url":"https://example.com"}"#);
}

#[test]
fn capabilities_render_as_json() {
    let text = render_capabilities("todo", vec!["new-todos".into()], vec!["http-post".into()]).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["app"], "todo");
    assert_eq!(value["triggers"][0], "new-todos");
    assert_eq!(value["actions"][0], "http-post");
}

#[test]
fn trigger_response_renders_events_in_order() {
    let response = TriggerResponse::new("2", vec![TriggerEvent::new("1", "{}"), TriggerEvent::new("2", "{}")]);
    let value: serde_json::Value = serde_json::from_str(&render_trigger_response(&response).unwrap()).unwrap();
    assert_eq!(value["store"], "2");
    assert_eq!(value["events"][1]["id"], "2");
}

#[test]
fn schema_is_printed_verbatim_by_default() {
    let schema = r#"{ "type":"object",  "required" : ["title"] }"#;
    assert_eq!(render_schema(schema, false), schema);
    assert_eq!(render_schema("not json", false), "not json");
}

#[test]
fn pretty_schema_rendering() {
    assert_eq!(render_schema(r#"{"type":"object"}"#, true), "{\n  \"type\": \"object\"\n}");
    assert_eq!(render_schema("not json", true), "not json");
}
