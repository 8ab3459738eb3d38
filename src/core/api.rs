//! HTTP + WebSocket API, one independent monitor per subject
//!
//! Endpoints:
//! - POST /subject/new - Start monitoring a subject
//! - GET /subject/{id} - Current state and session stats
//! - POST /subject/{id}/sample - Feed one sample
//! - DELETE /subject/{id} - Stop monitoring
//! - WS /ws/{id} - Live per-sample output
//! - GET /health - Health check

use axum::{
    extract::{Path, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{info, warn};

use crate::core::metrics::Landmarks;
use crate::core::monitor::{Monitor, SessionStats};
use crate::core::settings::{DetectionSettings, Settings};
use crate::core::source::Sample;
use crate::types::{InputError, MachineConfig, PostureState, StateOutput, Timestamp};
use crate::UPDATE_CHANNEL_CAPACITY;

/// One monitored subject
#[derive(Debug)]
pub struct Subject {
    pub id: String,
    pub monitor: Monitor,
    pub update_tx: broadcast::Sender<StateOutput>,
}

/// Shared handle to one subject; the registry lock is never held while a
/// subject processes a sample
pub type SubjectHandle = Arc<Mutex<Subject>>;

/// App state
pub struct AppState {
    pub subjects: RwLock<HashMap<String, SubjectHandle>>,
    pub settings: Settings,
    next_id: AtomicU64,
}

/// Optional per-subject overrides of the configured detection values
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewSubjectRequest {
    pub posture_threshold: Option<f64>,
    pub persistence_secs: Option<f64>,
    pub cooldown_secs: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct NewSubjectResponse {
    pub subject_id: String,
    pub websocket_url: String,
    pub config: ConfigView,
}

/// Machine config in seconds, as accepted on input
#[derive(Debug, Serialize)]
pub struct ConfigView {
    pub posture_threshold: f64,
    pub persistence_secs: f64,
    pub cooldown_secs: f64,
}

impl From<&MachineConfig> for ConfigView {
    fn from(config: &MachineConfig) -> Self {
        Self {
            posture_threshold: config.posture_threshold(),
            persistence_secs: config.persistence().as_secs_f64(),
            cooldown_secs: config.alert_cooldown().as_secs_f64(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubjectStatusResponse {
    pub subject_id: String,
    pub state: PostureState,
    pub pending_ms: u64,
    pub cooldown_remaining_ms: u64,
    pub last_alert_at: Option<Timestamp>,
    pub config: ConfigView,
    pub stats: SessionStats,
}

/// Sample request: `t` in session seconds plus either `vdiff` or `landmarks`;
/// neither means nobody was detected
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SampleRequest {
    pub t: f64,
    #[serde(default)]
    pub vdiff: Option<f64>,
    #[serde(default)]
    pub landmarks: Option<Landmarks>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub subjects_active: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler errors
#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
    Unprocessable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "subject not found".to_string()),
            ApiError::BadRequest(e) => (StatusCode::BAD_REQUEST, e),
            ApiError::Unprocessable(e) => (StatusCode::UNPROCESSABLE_ENTITY, e),
            ApiError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, e),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Create the API router
pub fn create_router(settings: Settings) -> Router {
    let state = Arc::new(AppState {
        subjects: RwLock::new(HashMap::new()),
        settings,
        next_id: AtomicU64::new(1),
    });

    Router::new()
        .route("/health", get(health))
        .route("/subject/new", post(create_subject))
        .route("/subject/:id", get(get_subject).delete(delete_subject))
        .route("/subject/:id/sample", post(add_sample))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let subjects = state.subjects.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        subjects_active: subjects.len(),
    })
}

/// Start monitoring a new subject
async fn create_subject(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewSubjectRequest>,
) -> Result<Json<NewSubjectResponse>, ApiError> {
    let base = &state.settings.detection;
    let detection = DetectionSettings {
        posture_threshold: req.posture_threshold.unwrap_or(base.posture_threshold),
        persistence_secs: req.persistence_secs.unwrap_or(base.persistence_secs),
        cooldown_secs: req.cooldown_secs.unwrap_or(base.cooldown_secs),
        ..base.clone()
    };
    let config = detection.machine_config().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let metrics = detection.metrics_calculator().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut monitor = Monitor::new(config, metrics);
    for sink in state.settings.sinks() {
        monitor.add_sink(sink);
    }

    let subject_id = generate_subject_id(state.next_id.fetch_add(1, Ordering::Relaxed));
    let (tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
    let subject = Subject { id: subject_id.clone(), monitor, update_tx: tx };

    state
        .subjects
        .write()
        .await
        .insert(subject_id.clone(), Arc::new(Mutex::new(subject)));
    info!(subject = %subject_id, threshold = config.posture_threshold(), "subject created");

    Ok(Json(NewSubjectResponse {
        websocket_url: format!("/ws/{}", subject_id),
        subject_id,
        config: ConfigView::from(&config),
    }))
}

/// Get subject status
async fn get_subject(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SubjectStatusResponse>, ApiError> {
    let handle = find_subject(&state, &id).await?;
    let subject = handle.lock().await;

    let output = subject.monitor.current_output();
    let machine = subject.monitor.machine();

    Ok(Json(SubjectStatusResponse {
        subject_id: subject.id.clone(),
        state: output.state,
        pending_ms: output.pending_ms,
        cooldown_remaining_ms: output.cooldown_remaining_ms,
        last_alert_at: machine.last_alert_at(),
        config: ConfigView::from(machine.config()),
        stats: subject.monitor.stats().clone(),
    }))
}

/// Feed one sample to a subject
async fn add_sample(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SampleRequest>,
) -> Result<Json<StateOutput>, ApiError> {
    let at = Timestamp::from_secs_f64(req.t).map_err(|e| ApiError::Unprocessable(e.to_string()))?;
    let sample = match (req.vdiff, req.landmarks) {
        (Some(_), Some(_)) => {
            return Err(ApiError::Unprocessable("send either vdiff or landmarks, not both".to_string()))
        }
        (_, Some(landmarks)) => Sample::landmarks(at, Some(landmarks)),
        (vdiff, None) => Sample::signal(at, vdiff),
    };

    let handle = find_subject(&state, &id).await?;

    // alert sinks may run external commands, so processing happens on the
    // blocking pool and only this subject waits for it
    let output = tokio::task::spawn_blocking(move || -> Result<StateOutput, InputError> {
        let mut subject = handle.blocking_lock();
        let output = subject.monitor.process(sample)?;
        // no receivers is fine
        let _ = subject.update_tx.send(output.clone());
        Ok(output)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("sample processing failed: {}", e)))?
    .map_err(|e| ApiError::Unprocessable(e.to_string()))?;

    Ok(Json(output))
}

/// Look up a subject, releasing the registry lock before returning
async fn find_subject(state: &AppState, id: &str) -> Result<SubjectHandle, ApiError> {
    let subjects = state.subjects.read().await;
    subjects.get(id).cloned().ok_or(ApiError::NotFound)
}

/// Stop monitoring a subject
async fn delete_subject(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let handle = state.subjects.write().await.remove(&id).ok_or(ApiError::NotFound)?;
    let subject = handle.lock().await;
    let stats = subject.monitor.stats();
    info!(subject = %id, samples = stats.samples, alerts = stats.alerts, "subject removed");
    Ok(StatusCode::NO_CONTENT)
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let handle = find_subject(&state, &id).await?;
    let rx = handle.lock().await.update_tx.subscribe();

    Ok(ws.on_upgrade(move |socket| handle_websocket(socket, rx)))
}

/// Forward outputs until the client leaves or the subject is removed
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<StateOutput>) {
    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Ok(output) => {
                    let json = serde_json::to_string(&output).unwrap_or_default();
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket client lagging, updates dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

/// Generate subject ID
fn generate_subject_id(seq: u64) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0);
    format!("subject_{:x}_{}", nanos, seq)
}

/// Run the API server
pub async fn run_server(addr: &str, settings: Settings) -> std::io::Result<()> {
    let router = create_router(settings);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Sitwatch API running on {}", addr);
    info!("  POST   /subject/new        - Start monitoring");
    info!("  GET    /subject/:id        - Get status");
    info!("  POST   /subject/:id/sample - Feed a sample");
    info!("  DELETE /subject/:id        - Stop monitoring");
    info!("  WS     /ws/:id             - Live updates");
    info!("  GET    /health             - Health check");
    axum::serve(listener, router).await
}
