//! HTTP API: ingest, simulation control, queries, live events, health and
//! Prometheus metrics

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use monitor_lib::{
    broadcast::ChannelSubscriber,
    health::{ComponentStatus, HealthResponse, ReadinessResponse},
    ingest::BatchReport,
    models::{Device, ReadingInput, SensorReading},
    simulator::{StartOutcome, StopOutcome},
    storage::{AlertFilter, DashboardSummary, ReadingFilter, TelemetryStore},
    Alert, StoreError,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::AppState;

/// Plain `{"message": ...}` reply
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimulationStatus {
    pub running: bool,
    pub ticks: u64,
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgeRequest {
    pub alert_id: Uuid,
}

/// Error reply rendered as `{"detail": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            detail: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

/// `GET /healthz`: 503 only while some component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let report = state.health_registry.health().await;
    let code = if report.status == ComponentStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(report))
}

/// `GET /readyz`
async fn readyz(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let readiness = state.health_registry.readiness().await;
    let code = match readiness.ready {
        true => StatusCode::OK,
        false => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(readiness))
}

/// `GET /metrics` in the Prometheus text exposition format
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let mut body = Vec::new();
    match encoder.encode(&prometheus::gather(), &mut body) {
        Ok(()) => ([("content-type", encoder.format_type().to_string())], body).into_response(),
        Err(e) => {
            warn!(error = %e, "Prometheus encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn list_devices(State(state): State<Arc<AppState>>) -> Json<Vec<Device>> {
    Json(state.registry.list())
}

/// Batched ingest of externally sourced readings
async fn sensor_ingest(
    State(state): State<Arc<AppState>>,
    Json(readings): Json<Vec<ReadingInput>>,
) -> Json<BatchReport> {
    Json(state.coordinator.ingest_batch(readings).await)
}

async fn readings(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ReadingFilter>,
) -> Json<Vec<SensorReading>> {
    Json(state.store.readings(&filter))
}

async fn alerts(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AlertFilter>,
) -> Json<Vec<Alert>> {
    Json(state.store.alerts(&filter))
}

async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AcknowledgeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if state.store.acknowledge_alert(request.alert_id).await? {
        debug!(alert_id = %request.alert_id, "Alert acknowledged");
        Ok(MessageResponse::new("Alert acknowledged"))
    } else {
        Err(ApiError::not_found("Alert not found"))
    }
}

async fn dashboard_summary(State(state): State<Arc<AppState>>) -> Json<DashboardSummary> {
    Json(state.store.summary(state.registry.len()))
}

async fn start_simulation(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    match state.simulator.start().await {
        StartOutcome::Started => MessageResponse::new("Simulation started"),
        StartOutcome::AlreadyRunning => MessageResponse::new("Simulation already running"),
    }
}

async fn stop_simulation(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    match state.simulator.stop().await {
        StopOutcome::Stopped => MessageResponse::new("Simulation stopped"),
        StopOutcome::NotRunning => MessageResponse::new("Simulation not running"),
    }
}

async fn simulation_status(State(state): State<Arc<AppState>>) -> Json<SimulationStatus> {
    Json(SimulationStatus {
        running: state.simulator.is_running().await,
        ticks: state.simulator.tick_count(),
    })
}

async fn ws_upgrade(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| live_events(socket, state))
}

/// Push hub events to one socket until either side goes away.
/// Client text frames are acknowledged with an echo.
async fn live_events(mut socket: WebSocket, state: Arc<AppState>) {
    let (subscriber, mut events) =
        ChannelSubscriber::new(state.subscriber_queue, state.subscriber_send_timeout);
    let id = state.hub.register(Arc::new(subscriber));
    info!(subscriber = %id, "Live event socket connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let reply = format!("Message received: {}", text);
                    if socket.send(Message::Text(reply)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(subscriber = %id, error = %e, "Socket receive failed");
                    break;
                }
            },
            event = events.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode event");
                        continue;
                    }
                };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
        }
    }

    state.hub.deregister(id);
    info!(subscriber = %id, "Live event socket disconnected");
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws_upgrade))
        .route("/api/devices", get(list_devices))
        .route("/api/sensor-ingest", post(sensor_ingest))
        .route("/api/metrics", get(readings))
        .route("/api/alerts", get(alerts))
        .route("/api/alerts/acknowledge", post(acknowledge_alert))
        .route("/api/dashboard/summary", get(dashboard_summary))
        .route("/api/simulation/start", post(start_simulation))
        .route("/api/simulation/stop", post(stop_simulation))
        .route("/api/simulation/status", get(simulation_status))
        .with_state(state)
}

/// Start the API server; returns once `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
