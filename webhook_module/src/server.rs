//! HTTP surface: the LINE webhook endpoint and a liveness probe.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use line_messaging_module::{parse_webhook_body, verify_signature, LineClient, SIGNATURE_HEADER};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::config::WebhookConfig;
use crate::google_auth::GoogleAuth;
use crate::records::RecordStore;
use crate::router::EventRouter;
use crate::store::FirestoreStore;
use crate::BoxError;

pub struct AppState {
    pub router: EventRouter,
    pub channel_secret: Option<String>,
    pub enforce_signature: bool,
}

impl AppState {
    pub fn new(router: EventRouter) -> Self {
        Self {
            router,
            channel_secret: None,
            enforce_signature: false,
        }
    }

    pub fn with_signature(mut self, channel_secret: impl Into<String>, enforce: bool) -> Self {
        self.channel_secret = Some(channel_secret.into());
        self.enforce_signature = enforce;
        self
    }

    /// Wire Firestore and the LINE reply client from configuration.
    pub fn from_config(config: &WebhookConfig) -> Result<Self, BoxError> {
        let auth = GoogleAuth::new(config.google_auth_config())?;
        let store = FirestoreStore::new(config.firestore_config(), auth)?;
        let sender = LineClient::new(config.line_client_config())?;

        let records = RecordStore::new(Arc::new(store), config.collections.clone());
        let router = EventRouter::new(records, Arc::new(sender))
            .with_note_source(config.note_source.clone());

        Ok(Self {
            router,
            channel_secret: config.line.channel_secret.clone(),
            enforce_signature: config.line.enforce_signature,
        })
    }
}

pub fn build_app(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(receive_webhook))
        .route("/api/webhook", post(receive_webhook))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

/// Bind the configured address and serve until `shutdown` resolves.
pub async fn run_server<F>(config: WebhookConfig, shutdown: F) -> Result<(), BoxError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = Arc::new(AppState::from_config(&config)?);
    let app = build_app(state, config.max_body_bytes);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        "line webhook project={} config_path={:?} signature_enforced={}",
        config.firebase.project_id, config.config_path, config.line.enforce_signature
    );
    info!("line webhook listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("line webhook stopped");
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if check_signature(&state, &headers, &body).is_err() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let payload = match parse_webhook_body(&body) {
        Ok(payload) => payload,
        Err(err) => {
            error!("line webhook malformed payload: {}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    debug!(
        "line webhook destination={:?} events={}",
        payload.destination,
        payload.events.len()
    );

    let report = state.router.handle_batch(&payload.events).await;
    if report.is_success() {
        (StatusCode::OK, Json(json!({"status": "ok"}))).into_response()
    } else {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

/// Verify `x-line-signature` when a channel secret is configured. Failures
/// only reject the request in enforcing mode.
fn check_signature(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), &'static str> {
    let Some(secret) = state.channel_secret.as_deref() else {
        return Ok(());
    };
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match verify_signature(secret, signature, body) {
        Ok(()) => Ok(()),
        Err(reason) if state.enforce_signature => {
            warn!("line webhook rejected request: {}", reason);
            Err(reason)
        }
        Err(reason) => {
            warn!("line webhook signature check failed ({}), accepting", reason);
            Ok(())
        }
    }
}
