//! Health tracking for pipeline components
//!
//! The catalog, trainer and predictor each carry a status. Liveness reports
//! the worst of them; readiness additionally waits until the service has
//! finished starting.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Serving, but on a fallback (synthetic catalog, no classifier, ...)
    Degraded,
    /// A component the pipeline cannot recover on its own
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Unix seconds of the last status change
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Body of the liveness endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

/// Body of the readiness endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    /// Catalog accessor; degraded while serving synthetic records
    pub const CATALOG: &str = "catalog";
    /// Training session; degraded after a failed fit, unhealthy when the
    /// training worker is lost
    pub const TRAINER: &str = "trainer";
    /// Inference; degraded until a classifier is trained
    pub const PREDICTOR: &str = "predictor";

    pub const ALL: [&str; 3] = [CATALOG, TRAINER, PREDICTOR];
}

#[derive(Debug, Default)]
struct Registry {
    components: HashMap<String, ComponentHealth>,
    started: bool,
}

/// Shared, cloneable view of component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    inner: Arc<RwLock<Registry>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every pipeline component as healthy
    pub async fn register_all(&self) {
        let mut registry = self.inner.write().await;
        for name in components::ALL {
            registry.components.insert(
                name.to_string(),
                ComponentHealth::new(ComponentStatus::Healthy, None),
            );
        }
    }

    pub async fn component(&self, name: &str) -> Option<ComponentHealth> {
        self.inner.read().await.components.get(name).cloned()
    }

    pub async fn set_healthy(&self, name: &str) {
        self.set(name, ComponentHealth::new(ComponentStatus::Healthy, None))
            .await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.set(name, ComponentHealth::new(ComponentStatus::Degraded, Some(message.into())))
            .await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.set(name, ComponentHealth::new(ComponentStatus::Unhealthy, Some(message.into())))
            .await;
    }

    /// Flip once startup has finished
    pub async fn set_ready(&self, ready: bool) {
        self.inner.write().await.started = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let registry = self.inner.read().await;
        HealthResponse {
            status: overall(&registry.components),
            components: registry.components.clone(),
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let registry = self.inner.read().await;

        let reason = if !registry.started {
            Some("Pipeline not yet initialized".to_string())
        } else {
            let mut unhealthy: Vec<&str> = registry
                .components
                .iter()
                .filter(|(_, health)| health.status == ComponentStatus::Unhealthy)
                .map(|(name, _)| name.as_str())
                .collect();
            unhealthy.sort_unstable();
            (!unhealthy.is_empty())
                .then(|| format!("Unhealthy components: {}", unhealthy.join(", ")))
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }

    pub async fn set(&self, name: &str, health: ComponentHealth) {
        self.inner
            .write()
            .await
            .components
            .insert(name.to_string(), health);
    }
}

/// Worst status across components; healthy when none are registered
fn overall(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
    components
        .values()
        .map(|health| health.status)
        .max()
        .unwrap_or(ComponentStatus::Healthy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_registry_is_healthy() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_register_all_components() {
        let registry = HealthRegistry::new();
        registry.register_all().await;

        let health = registry.health().await;
        assert_eq!(health.components.len(), 3);
        for name in components::ALL {
            assert_eq!(health.components[name].status, ComponentStatus::Healthy);
        }
    }

    #[tokio::test]
    async fn test_degraded_catalog_degrades_overall() {
        let registry = HealthRegistry::new();
        registry.register_all().await;

        registry
            .set_degraded(components::CATALOG, "serving synthetic records")
            .await;

        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);
        let catalog = registry.component(components::CATALOG).await.unwrap();
        assert_eq!(catalog.message.as_deref(), Some("serving synthetic records"));
    }

    #[tokio::test]
    async fn test_unhealthy_wins_over_degraded() {
        let registry = HealthRegistry::new();
        registry.register_all().await;

        registry.set_degraded(components::CATALOG, "synthetic").await;
        registry.set_unhealthy(components::TRAINER, "worker panicked").await;

        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_recovery_clears_message() {
        let registry = HealthRegistry::new();
        registry.set_unhealthy(components::TRAINER, "worker panicked").await;
        registry.set_healthy(components::TRAINER).await;

        let trainer = registry.component(components::TRAINER).await.unwrap();
        assert_eq!(trainer.status, ComponentStatus::Healthy);
        assert!(trainer.message.is_none());
    }

    #[tokio::test]
    async fn test_unknown_component_is_none() {
        let registry = HealthRegistry::new();
        assert!(registry.component("warehouse").await.is_none());
    }

    #[tokio::test]
    async fn test_readiness_not_ready_initially() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;

        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Pipeline not yet initialized"));
    }

    #[tokio::test]
    async fn test_readiness_ready_when_degraded() {
        let registry = HealthRegistry::new();
        registry.register_all().await;
        registry.set_degraded(components::PREDICTOR, "no classifier").await;
        registry.set_ready(true).await;

        let readiness = registry.readiness().await;
        assert!(readiness.ready);
        assert!(readiness.reason.is_none());
    }

    #[tokio::test]
    async fn test_readiness_names_unhealthy_components() {
        let registry = HealthRegistry::new();
        registry.register_all().await;
        registry.set_ready(true).await;
        registry.set_unhealthy(components::TRAINER, "worker panicked").await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Unhealthy components: trainer"));
    }
}
