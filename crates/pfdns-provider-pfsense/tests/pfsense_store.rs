//! pfSense store against a local XML-RPC double
//!
//! The double answers the three pfSense methods with canned documents and
//! records every request body it receives.

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use pfdns_core::config::EngineConfig;
use pfdns_core::record::{Changes, Endpoint};
use pfdns_core::traits::RemoteStore;
use pfdns_core::{Error, SyncEngine};
use pfdns_provider_pfsense::{DEFAULT_HTTP_TIMEOUT, PfsenseStore};
use std::sync::{Arc, Mutex};

const BACKUP_RESPONSE: &str = r#"<?xml version="1.0" encoding="iso-8859-1"?>
<methodResponse>
<params>
<param>
<value><struct>
<member><name>unbound</name>
<value><struct>
<member><name>enable</name><value><string></string></value></member>
<member><name>hosts</name>
<value><array><data>
<value><struct>
<member><name>host</name><value><string>nas</string></value></member>
<member><name>domain</name><value><string>home.lan</string></value></member>
<member><name>ip</name><value><string>10.0.0.5</string></value></member>
<member><name>descr</name><value><string></string></value></member>
<member><name>aliases</name><value><string></string></value></member>
</struct></value>
</data></array></value>
</member>
<member><name>port</name><value><string>53</string></value></member>
</struct></value>
</member>
</struct></value>
</param>
</params>
</methodResponse>"#;

const TRUE_RESPONSE: &str =
    "<methodResponse><params><param><value><boolean>1</boolean></value></param></params></methodResponse>";

const ZERO_RESPONSE: &str =
    "<methodResponse><params><param><value><int>0</int></value></param></params></methodResponse>";

const FAULT_RESPONSE: &str = "<methodResponse><fault><value><struct>\
    <member><name>faultCode</name><value><int>-32601</int></value></member>\
    <member><name>faultString</name><value><string>server error. requested method does not exist</string></value></member>\
    </struct></value></fault></methodResponse>";

#[derive(Default)]
struct Recorded {
    requests: Mutex<Vec<(String, Option<String>)>>,
}

impl Recorded {
    fn methods(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(body, _)| method_name(body).to_string())
            .collect()
    }

    fn body(&self, method: &str) -> String {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|(body, _)| method_name(body) == method)
            .map(|(body, _)| body.clone())
            .unwrap()
    }
}

fn method_name(body: &str) -> &str {
    let start = body.find("<methodName>").unwrap() + "<methodName>".len();
    let end = body.find("</methodName>").unwrap();
    &body[start..end]
}

async fn rpc(State(recorded): State<Arc<Recorded>>, headers: HeaderMap, body: String) -> (StatusCode, String) {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let method = method_name(&body).to_string();
    recorded.requests.lock().unwrap().push((body, auth));

    let response = match method.as_str() {
        "pfsense.backup_config_section" => BACKUP_RESPONSE,
        "pfsense.restore_config_section" => TRUE_RESPONSE,
        "pfsense.exec_php" => ZERO_RESPONSE,
        _ => FAULT_RESPONSE,
    };
    (StatusCode::OK, response.to_string())
}

async fn faulty() -> String {
    FAULT_RESPONSE.to_string()
}

async fn denied() -> StatusCode {
    StatusCode::UNAUTHORIZED
}

async fn unavailable() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "maintenance")
}

async fn serve() -> (String, Arc<Recorded>) {
    let recorded = Arc::new(Recorded::default());
    let app = Router::new()
        .route("/xmlrpc.php", post(rpc))
        .route("/faulty", post(faulty))
        .route("/denied", post(denied))
        .route("/unavailable", post(unavailable))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), recorded)
}

fn store(url: &str) -> PfsenseStore {
    PfsenseStore::new(url, "admin", "secret", false, DEFAULT_HTTP_TIMEOUT).unwrap()
}

#[tokio::test]
async fn fetch_section_unwraps_backup_struct() {
    let (url, recorded) = serve().await;
    let store = store(&url);

    let section = store.fetch_section("unbound").await.unwrap();

    assert_eq!(section["port"], "53");
    assert_eq!(section["hosts"][0]["host"], "nas");

    let requests = recorded.requests.lock().unwrap();
    let (body, auth) = &requests[0];
    assert!(body.contains("<param><value><array><data><value><string>unbound</string></value></data></array></value></param>"));
    assert_eq!(auth.as_deref(), Some("Basic YWRtaW46c2VjcmV0"));
}

#[tokio::test]
async fn engine_apply_writes_section_and_runs_triggers() {
    let (url, recorded) = serve().await;
    let (engine, _events) = SyncEngine::new(Box::new(store(&url)), EngineConfig::default()).unwrap();

    let endpoints = engine.list_endpoints().await.unwrap();
    assert_eq!(endpoints, vec![Endpoint::new("nas.home.lan", "A", ["10.0.0.5"])]);

    let changes = Changes {
        create: vec![Endpoint::new("www.home.lan", "A", ["10.0.0.9"])],
        ..Changes::default()
    };
    engine.apply_changes(&changes).await.unwrap();

    assert_eq!(
        recorded.methods(),
        vec![
            "pfsense.backup_config_section",
            "pfsense.backup_config_section",
            "pfsense.restore_config_section",
            "pfsense.exec_php",
            "pfsense.exec_php",
        ]
    );

    let restore = recorded.body("pfsense.restore_config_section");
    assert!(restore.contains("<member><name>port</name><value><string>53</string></value></member>"));
    assert!(restore.contains("<value><string>www</string></value>"));
    assert!(restore.contains("<value><string>10.0.0.9</string></value>"));
    assert!(restore.contains("<param><value><int>30</int></value></param>"));

    let exec = recorded.body("pfsense.exec_php");
    assert!(exec.contains("services_unbound_configure(false);"));
}

#[tokio::test]
async fn fault_is_an_rpc_error() {
    let (url, _recorded) = serve().await;

    let err = store(&format!("{}/faulty", url)).execute_trigger("noop").await.unwrap_err();
    assert!(matches!(err, Error::Rpc(_)));
    assert!(err.to_string().contains("fault -32601"));
}

#[tokio::test]
async fn missing_section_is_an_rpc_error() {
    let (url, _recorded) = serve().await;

    let err = store(&url).fetch_section("dhcpd").await.unwrap_err();
    assert!(matches!(err, Error::Rpc(_)));
}

#[tokio::test]
async fn http_status_is_mapped() {
    let (url, _recorded) = serve().await;

    let err = store(&format!("{}/denied", url)).fetch_section("unbound").await.unwrap_err();
    assert!(matches!(err, Error::Authentication(_)));

    let err = store(&format!("{}/unavailable", url)).fetch_section("unbound").await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
    assert!(err.to_string().contains("transient"));
}

#[tokio::test]
async fn unreachable_appliance_is_an_http_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = store(&format!("http://{}", addr)).fetch_section("unbound").await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
}
