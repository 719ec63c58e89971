//! external-dns webhook server for pfdns
//!
//! Routes:
//!
//! | method | path               | action                                 |
//! |--------|--------------------|----------------------------------------|
//! | GET    | `/`                | negotiate, announces the domain filters|
//! | GET    | `/records`         | current endpoints                      |
//! | POST   | `/records`         | apply a change batch, `204`            |
//! | POST   | `/adjustendpoints` | echo the endpoints unchanged           |
//! | GET    | `/healthz`         | liveness                               |
//!
//! Failures are answered with a problem-detail body: `400` for input the
//! engine rejected, `500` for everything else.

pub mod wire;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use pfdns_core::record::Changes;
use pfdns_core::{ApplyOutcome, Error, SyncEngine};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use wire::{MEDIA_TYPE, Negotiation, WireChanges, WireEndpoint};

/// Shared state of the webhook handlers
pub struct WebhookState {
    engine: SyncEngine,
    domain_filters: Vec<String>,
    /// Held for the whole of an apply; the engine does not coordinate writers
    apply_lock: Mutex<()>,
}

impl WebhookState {
    pub fn new(engine: SyncEngine, domain_filters: Vec<String>) -> Self {
        Self {
            engine,
            domain_filters,
            apply_lock: Mutex::new(()),
        }
    }
}

type WebhookStateArc = Arc<WebhookState>;

/// Build the webhook router
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(negotiate))
        .route("/records", get(get_records).post(set_records))
        .route("/adjustendpoints", post(adjust_endpoints))
        .route("/healthz", get(healthz))
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}

/// Serve the router until `shutdown` resolves
pub async fn run(
    listen_addr: &str,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("Webhook listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Webhook server stopped");
    Ok(())
}

async fn negotiate(State(state): State<WebhookStateArc>) -> Result<Response, ApiError> {
    webhook_json(&Negotiation {
        filters: state.domain_filters.clone(),
    })
}

async fn get_records(State(state): State<WebhookStateArc>, uri: Uri) -> Result<Response, ApiError> {
    let endpoints = state
        .engine
        .list_endpoints()
        .await
        .map_err(|e| ApiError::from_engine(e, &uri))?;

    debug!("Listing {} endpoints", endpoints.len());
    let wire: Vec<WireEndpoint> = endpoints.into_iter().map(WireEndpoint::from).collect();
    webhook_json(&wire)
}

async fn set_records(
    State(state): State<WebhookStateArc>,
    uri: Uri,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let wire: WireChanges = serde_json::from_slice(&body).map_err(|e| {
        ApiError::from_engine(Error::invalid_input(format!("changes body: {}", e)), &uri)
    })?;
    let changes = Changes::from(wire);

    info!(
        "external-dns wants to set records: {} create, {} update, {} delete",
        changes.create.len(),
        changes.update.len(),
        changes.delete.len()
    );

    let _guard = state.apply_lock.lock().await;
    match state.engine.apply_changes(&changes).await {
        Ok(ApplyOutcome::DryRun { hosts }) => {
            info!("Dry-run computed {} host overrides", hosts.len());
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(ApiError::from_engine(e, &uri)),
    }
}

async fn adjust_endpoints(uri: Uri, body: Bytes) -> Result<Response, ApiError> {
    // Keep every field as sent, including ones this server does not model
    let endpoints: Vec<serde_json::Value> = serde_json::from_slice(&body).map_err(|e| {
        ApiError::from_engine(Error::invalid_input(format!("endpoints body: {}", e)), &uri)
    })?;
    webhook_json(&endpoints)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Serialize a body with the webhook media type
fn webhook_json<T: Serialize>(body: &T) -> Result<Response, ApiError> {
    let bytes = serde_json::to_vec(body).map_err(|e| ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        detail: e.to_string(),
        instance: String::new(),
    })?;

    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE))],
        bytes,
    )
        .into_response())
}

/// Problem-detail error response
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
    instance: String,
}

#[derive(Serialize)]
struct ProblemDetail<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'a str,
    status: u16,
    detail: &'a str,
    instance: &'a str,
}

impl ApiError {
    fn from_engine(error: Error, uri: &Uri) -> Self {
        let status = if error.is_validation() {
            warn!("Rejected {}: {}", uri.path(), error);
            StatusCode::BAD_REQUEST
        } else {
            error!("Failed {}: {}", uri.path(), error);
            StatusCode::INTERNAL_SERVER_ERROR
        };

        Self {
            status,
            detail: error.to_string(),
            instance: uri.path().to_string(),
        }
    }

    /// HTTP status of the response
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let problem = ProblemDetail {
            kind: "about:blank",
            title: self.status.canonical_reason().unwrap_or("Error"),
            status: self.status.as_u16(),
            detail: &self.detail,
            instance: &self.instance,
        };

        let body = serde_json::to_vec(&problem).unwrap_or_default();
        (
            self.status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/problem+json"))],
            body,
        )
            .into_response()
    }
}
