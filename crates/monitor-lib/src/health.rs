//! Component health and readiness
//!
//! Each pipeline stage reports into a shared [`HealthRegistry`]:
//! - the simulator after every tick
//! - the ingestion coordinator for the store and for batch rejections
//! - the broadcast hub when a subscriber falls behind
//!
//! Status changes are logged once, on transition, so callers may report on
//! every unit of work.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// A pipeline stage whose health is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    Simulator,
    Ingest,
    Broadcast,
    Store,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::Simulator,
        Component::Ingest,
        Component::Broadcast,
        Component::Store,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Simulator => "simulator",
            Component::Ingest => "ingest",
            Component::Broadcast => "broadcast",
            Component::Store => "store",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health of one component, worst last
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Work continues but some of it is being skipped or dropped
    Degraded,
    Unhealthy,
}

/// Last report from one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Unix seconds of the last status change
    pub last_check_timestamp: i64,
}

/// Body of the liveness endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Worst status across all components
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

/// Body of the readiness endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    components: BTreeMap<Component, ComponentHealth>,
    ready: bool,
}

/// Shared health state. Clones refer to the same registry.
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<State>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start every component as healthy
    pub async fn register_all(&self) {
        let now = Utc::now().timestamp();
        let mut state = self.state.write().await;
        for component in Component::ALL {
            state.components.insert(
                component,
                ComponentHealth {
                    status: ComponentStatus::Healthy,
                    message: None,
                    last_check_timestamp: now,
                },
            );
        }
    }

    /// Record a report. Returns true when the status changed.
    ///
    /// A repeated report with the same status only refreshes the message.
    pub async fn report(
        &self,
        component: Component,
        status: ComponentStatus,
        message: Option<String>,
    ) -> bool {
        let mut state = self.state.write().await;
        let previous = state.components.get(&component).map(|h| h.status);

        if previous == Some(status) {
            if let Some(entry) = state.components.get_mut(&component) {
                entry.message = message;
            }
            return false;
        }

        match status {
            ComponentStatus::Healthy => info!(component = %component, "Component recovered"),
            _ => warn!(
                component = %component,
                status = ?status,
                reason = message.as_deref().unwrap_or(""),
                "Component health changed"
            ),
        }
        state.components.insert(
            component,
            ComponentHealth {
                status,
                message,
                last_check_timestamp: Utc::now().timestamp(),
            },
        );
        true
    }

    pub async fn set_healthy(&self, component: Component) -> bool {
        self.report(component, ComponentStatus::Healthy, None).await
    }

    pub async fn set_degraded(&self, component: Component, message: impl Into<String>) -> bool {
        self.report(component, ComponentStatus::Degraded, Some(message.into()))
            .await
    }

    pub async fn set_unhealthy(&self, component: Component, message: impl Into<String>) -> bool {
        self.report(component, ComponentStatus::Unhealthy, Some(message.into()))
            .await
    }

    pub async fn component(&self, component: Component) -> Option<ComponentHealth> {
        self.state.read().await.components.get(&component).cloned()
    }

    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        let status = state
            .components
            .values()
            .map(|h| h.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        let components = state
            .components
            .iter()
            .map(|(c, h)| (c.as_str().to_string(), h.clone()))
            .collect();
        HealthResponse { status, components }
    }

    /// Ready once startup finished and while no component is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        let failed = state
            .components
            .iter()
            .find(|(_, h)| h.status == ComponentStatus::Unhealthy)
            .map(|(c, _)| *c);

        let reason = match (state.ready, failed) {
            (false, _) => Some("Monitor not yet initialized".to_string()),
            (true, Some(component)) => Some(format!("Component {} unhealthy", component)),
            (true, None) => None,
        };
        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}
