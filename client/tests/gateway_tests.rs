use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use client::{
    ArmingState, DeviceConfig, DeviceGateway, GatewayErrorKind, HttpGateway, Script, ScriptAction, UsbDeviceType,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

// ==========================================
// FAKE DEVICE
// ==========================================

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    content_type: Option<String>,
    body: Option<Value>,
}

#[derive(Clone)]
struct FakeDevice {
    status: StatusCode,
    reply: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

async fn handle(
    State(device): State<FakeDevice>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    device.requests.lock().unwrap().push(Recorded {
        method,
        path: uri.path().to_string(),
        content_type: headers
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).ok(),
    });
    (device.status, device.reply.clone()).into_response()
}

/// Serves every path with the same status and body, recording requests.
async fn spawn_device(status: StatusCode, reply: &str) -> (String, Arc<Mutex<Vec<Recorded>>>) {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let device = FakeDevice {
        status,
        reply: reply.to_string(),
        requests: Arc::clone(&requests),
    };
    let app = Router::new().fallback(handle).with_state(device);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), requests)
}

fn recorded(requests: &Arc<Mutex<Vec<Recorded>>>) -> Vec<Recorded> {
    requests.lock().unwrap().clone()
}

// ==========================================
// SCRIPT RESOURCE
// ==========================================

#[tokio::test]
async fn test_load_script_decodes_body() {
    let (url, requests) = spawn_device(StatusCode::OK, r#"{"script":"DELAY 500\nSTRING hi"}"#).await;
    let gateway = HttpGateway::new(&url).unwrap();

    let script = gateway.load_script().await.unwrap();

    assert_eq!(script.as_str(), "DELAY 500\nSTRING hi");
    let requests = recorded(&requests);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::GET);
    assert_eq!(requests[0].path, "/script");
}

#[tokio::test]
async fn test_load_script_rejects_malformed_body() {
    let (url, _requests) = spawn_device(StatusCode::OK, r#"{"text":"STRING hi"}"#).await;
    let gateway = HttpGateway::new(&url).unwrap();

    let err = gateway.load_script().await.unwrap_err();

    assert_eq!(err.kind, GatewayErrorKind::RequestFailed);
    assert!(err.detail.contains("invalid body"), "{}", err.detail);
}

#[tokio::test]
async fn test_run_and_save_send_exact_text_and_action_code() {
    let (url, requests) = spawn_device(StatusCode::OK, r#"{"status":"success"}"#).await;
    let gateway = HttpGateway::new(&url).unwrap();
    let text = "\tSTRING keep   whitespace \n";

    gateway.run_script(Script::new(text)).await.unwrap();
    gateway.save_script(Script::new(text)).await.unwrap();

    let requests = recorded(&requests);
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/script");
        assert_eq!(request.content_type.as_deref(), Some("application/json"));
    }
    assert_eq!(requests[0].body, Some(json!({ "script": text, "action": 0 })));
    assert_eq!(requests[1].body, Some(json!({ "script": text, "action": 1 })));
}

#[tokio::test]
async fn test_submit_script_server_error_is_request_failed() {
    let (url, _requests) = spawn_device(StatusCode::INTERNAL_SERVER_ERROR, "").await;
    let gateway = HttpGateway::new(&url).unwrap();

    let err = gateway
        .submit_script(Script::new("STRING hi"), ScriptAction::Run)
        .await
        .unwrap_err();

    assert_eq!(err.kind, GatewayErrorKind::RequestFailed);
    assert_eq!(err.detail, "POST /script returned 500 Internal Server Error");
}

#[tokio::test]
async fn test_submit_ignores_non_json_success_body() {
    let (url, _requests) = spawn_device(StatusCode::OK, "ok, running").await;
    let gateway = HttpGateway::new(&url).unwrap();

    assert!(gateway.save_script(Script::new("STRING hi")).await.is_ok());
}

// ==========================================
// CONFIG RESOURCE
// ==========================================

#[tokio::test]
async fn test_load_config_decodes_integers() {
    let (url, requests) = spawn_device(StatusCode::OK, r#"{"armingState":1,"usbDeviceType":0}"#).await;
    let gateway = HttpGateway::new(&url).unwrap();

    let config = gateway.load_config().await.unwrap();

    assert_eq!(config.arming_state, ArmingState::SingleRun);
    assert_eq!(config.usb_device_type, UsbDeviceType::SerialJtag);
    assert_eq!(recorded(&requests)[0].path, "/config");
}

#[tokio::test]
async fn test_load_config_unknown_code_is_request_failed() {
    let (url, _requests) = spawn_device(StatusCode::OK, r#"{"armingState":9,"usbDeviceType":0}"#).await;
    let gateway = HttpGateway::new(&url).unwrap();

    let err = gateway.load_config().await.unwrap_err();
    assert_eq!(err.kind, GatewayErrorKind::RequestFailed);
}

#[tokio::test]
async fn test_submit_config_sends_one_integer_body() {
    let (url, requests) = spawn_device(StatusCode::OK, "").await;
    let gateway = HttpGateway::new(&url).unwrap();

    gateway
        .submit_config(DeviceConfig {
            arming_state: "2".parse().unwrap(),
            usb_device_type: "1".parse().unwrap(),
        })
        .await
        .unwrap();

    let requests = recorded(&requests);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(requests[0].path, "/config");
    assert_eq!(requests[0].body, Some(json!({ "armingState": 2, "usbDeviceType": 1 })));
}

#[tokio::test]
async fn test_submit_config_not_found_is_request_failed() {
    let (url, _requests) = spawn_device(StatusCode::NOT_FOUND, "").await;
    let gateway = HttpGateway::new(&url).unwrap();

    let err = gateway.submit_config(DeviceConfig::default()).await.unwrap_err();
    assert_eq!(err.detail, "POST /config returned 404 Not Found");
}

// ==========================================
// TRANSPORT & URLS
// ==========================================

#[tokio::test]
async fn test_unreachable_device_is_request_failed() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = HttpGateway::new(&format!("http://{addr}")).unwrap();
    let err = gateway.load_config().await.unwrap_err();

    assert_eq!(err.kind, GatewayErrorKind::RequestFailed);
    assert!(!err.detail.is_empty());
}

#[tokio::test]
async fn test_base_path_prefix_is_kept() {
    let (url, requests) = spawn_device(StatusCode::OK, r#"{"script":""}"#).await;
    let gateway = HttpGateway::new(&format!("{url}/ducky")).unwrap();

    gateway.load_script().await.unwrap();

    assert_eq!(recorded(&requests)[0].path, "/ducky/script");
}

#[test]
fn test_resource_urls() {
    let gateway = HttpGateway::new("http://esp-ducky.local").unwrap();
    assert_eq!(gateway.script_url().as_str(), "http://esp-ducky.local/script");
    assert_eq!(gateway.config_url().as_str(), "http://esp-ducky.local/config");

    let nested = HttpGateway::new("http://192.168.4.1/panel/").unwrap();
    assert_eq!(nested.config_url().as_str(), "http://192.168.4.1/panel/config");
}

#[test]
fn test_invalid_base_url_is_an_error() {
    let err = HttpGateway::new("not a url").unwrap_err();
    assert_eq!(err.kind, GatewayErrorKind::RequestFailed);
    assert!(err.detail.contains("not a url"));
}

#[tokio::test]
async fn test_truncated_acknowledgement_still_succeeds() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Promises more body than it sends, so reading the 2xx body fails
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nok")
            .await;
        let _ = socket.shutdown().await;
    });

    let gateway = HttpGateway::new(&format!("http://{addr}/")).unwrap();
    let config = DeviceConfig {
        arming_state: ArmingState::Unarmed,
        usb_device_type: UsbDeviceType::Hid,
    };

    assert!(gateway.submit_config(config).await.is_ok());
}
