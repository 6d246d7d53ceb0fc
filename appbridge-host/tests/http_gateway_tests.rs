use appbridge_host::{
    ActionContext, ActionResponse, App, BridgeConfig, ComponentFault, ErrorCode, ExecutionLimits,
    HttpError, HttpGateway, Identity, NativeComponent, OutboundRequest,
};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway() -> HttpGateway {
    HttpGateway::new(BridgeConfig::default().user_agent)
}

fn post(url: String, body: &str) -> OutboundRequest {
    OutboundRequest {
        method: reqwest::Method::POST,
        url,
        headers: vec![("content-type".into(), "application/json".into())],
        body: body.to_string(),
    }
}

async fn send(request: OutboundRequest, deadline: Option<Instant>) -> Result<appbridge_host::OutboundResponse, HttpError> {
    let gateway = gateway();
    tokio::task::spawn_blocking(move || gateway.send(request, deadline))
        .await
        .unwrap()
}

// ── Gateway ───────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn default_user_agent_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .and(header("user-agent", gateway().user_agent()))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .expect(1)
        .mount(&server)
        .await;

    let request = OutboundRequest {
        method: reqwest::Method::GET,
        url: format!("{}/ping", server.uri()),
        headers: Vec::new(),
        body: String::new(),
    };
    let response = send(request, None).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "pong");
    assert!(gateway().user_agent().starts_with("AppBridge/"));
}

#[tokio::test(flavor = "multi_thread")]
async fn component_can_override_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "custom-agent/1.0"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let request = OutboundRequest {
        method: reqwest::Method::GET,
        url: server.uri(),
        headers: vec![("User-Agent".into(), "custom-agent/1.0".into())],
        body: String::new(),
    };
    assert_eq!(send(request, None).await.unwrap().status, 204);
}

#[tokio::test(flavor = "multi_thread")]
async fn body_and_status_pass_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .and(body_string(r#"{"test":"data"}"#))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("x-request-id", "abc")
                .set_body_string(r#"{"received":true}"#),
        )
        .mount(&server)
        .await;

    let response = send(post(format!("{}/echo", server.uri()), r#"{"test":"data"}"#), None)
        .await
        .unwrap();
    assert_eq!(response.status, 201);
    assert_eq!(response.body, r#"{"received":true}"#);
    assert!(
        response
            .headers
            .iter()
            .any(|(k, v)| k == "x-request-id" && v == "abc")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn error_status_is_a_response_not_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let response = send(post(server.uri(), "{}"), None).await.unwrap();
    assert_eq!(response.status, 503);
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_upstream_is_bounded_by_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let started = Instant::now();
    let deadline = Instant::now() + Duration::from_millis(100);
    let err = send(post(server.uri(), "{}"), Some(deadline)).await.unwrap_err();
    assert!(matches!(err, HttpError::Timeout(_)), "got {err}");
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test(flavor = "multi_thread")]
async fn expired_deadline_fails_without_sending() {
    let deadline = Instant::now() - Duration::from_millis(1);
    let err = send(post("http://127.0.0.1:9/".into(), "{}"), Some(deadline))
        .await
        .unwrap_err();
    assert!(matches!(err, HttpError::Timeout(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_url_is_reported() {
    let err = send(post("not a url".into(), "{}"), None).await.unwrap_err();
    assert!(matches!(err, HttpError::InvalidUrl(_)));
}

#[test]
fn send_outside_runtime_fails_cleanly() {
    let err = gateway().send(post("http://127.0.0.1:9/".into(), "{}"), None).unwrap_err();
    assert!(matches!(err, HttpError::Other(_)));
}

// ── Through the bridge ────────────────────────────────────────────

fn http_app() -> App {
    let gateway = gateway();
    let mut component = NativeComponent::new();
    component
        .register_action(
            "http-post",
            move |ctx: &ActionContext| {
                let input: Value = serde_json::from_str(ctx.serialized_input())
                    .map_err(|e| ComponentFault::from_code(ErrorCode::Misconfigured, e.to_string()))?;
                let url = input["url"].as_str().unwrap_or_default().to_string();
                let body = input["body"].as_str().unwrap_or_default();
                let response = gateway
                    .send(post(url, body), None)
                    .map_err(|e| ComponentFault::from_code(ErrorCode::Unavailable, e.to_string()))?;
                Ok(ActionResponse::new(
                    json!({ "status": response.status, "body": response.body }).to_string(),
                ))
            },
            "{}",
            "{}",
        )
        .unwrap();
    App::from_instance("http", Box::new(component), &ExecutionLimits::default()).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn http_post_action_echoes_upstream_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/post"))
        .respond_with(|req: &wiremock::Request| {
            ResponseTemplate::new(200).set_body_bytes(req.body.clone())
        })
        .mount(&server)
        .await;

    let identity = Identity::new("1", "Test", "{}").unwrap();
    let input = json!({ "url": format!("{}/post", server.uri()), "body": "{\"test\":\"data\"}" });
    let ctx = ActionContext::new("http-post", identity, input.to_string()).unwrap();

    let response = http_app().execute_action(&ctx).await.unwrap();
    let output: Value = serde_json::from_str(&response.serialized_output).unwrap();
    assert_eq!(output["status"], 200);
    assert_eq!(output["body"], r#"{"test":"data"}"#);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_upstream_is_a_component_error() {
    let identity = Identity::new("1", "Test", "{}").unwrap();
    let input = json!({ "url": "not a url", "body": "{}" });
    let ctx = ActionContext::new("http-post", identity, input.to_string()).unwrap();

    let err = http_app().execute_action(&ctx).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Unavailable));
}
