//! Health reporting for the OAuth engine.

use crate::config::Config;
use crate::registry::get_display_name;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub message: Option<String>,
    pub details: Option<serde_json::Value>,
}

impl HealthCheckResult {
    pub fn healthy_with_details(details: serde_json::Value) -> Self {
        Self {
            status: HealthStatus::Healthy,
            message: None,
            details: Some(details),
        }
    }

    pub fn degraded_with_details(message: String, details: serde_json::Value) -> Self {
        Self {
            status: HealthStatus::Degraded,
            message: Some(message),
            details: Some(details),
        }
    }
}

#[async_trait]
pub trait HealthChecker: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> HealthCheckResult;

    fn info(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Reports whether every configured provider carries usable credentials.
pub struct OAuthHealthChecker {
    config: Arc<Config>,
}

impl OAuthHealthChecker {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
        }
    }
}

#[async_trait]
impl HealthChecker for OAuthHealthChecker {
    fn name(&self) -> &str {
        "oauth"
    }

    async fn check(&self) -> HealthCheckResult {
        let provider_count = self.config.providers.len();

        if provider_count == 0 {
            return HealthCheckResult::degraded_with_details(
                "No OAuth providers configured".to_string(),
                serde_json::json!({
                    "provider_count": 0,
                    "configured_providers": []
                }),
            );
        }

        let mut configured_providers = vec![];
        let mut misconfigured_providers = vec![];
        for (name, settings) in &self.config.providers {
            if settings.client_id.is_empty() || settings.client_secret.is_empty() {
                misconfigured_providers.push(name.clone());
            } else {
                configured_providers.push(name.clone());
            }
        }
        configured_providers.sort();
        misconfigured_providers.sort();

        if misconfigured_providers.is_empty() {
            HealthCheckResult::healthy_with_details(serde_json::json!({
                "provider_count": provider_count,
                "configured_providers": configured_providers
            }))
        } else {
            HealthCheckResult::degraded_with_details(
                format!("Some OAuth providers are misconfigured: {misconfigured_providers:?}"),
                serde_json::json!({
                    "provider_count": provider_count,
                    "configured_providers": configured_providers,
                    "misconfigured_providers": misconfigured_providers
                }),
            )
        }
    }

    fn info(&self) -> Option<serde_json::Value> {
        let mut names: Vec<&String> = self.config.providers.keys().collect();
        names.sort();
        let providers: Vec<serde_json::Value> = names
            .into_iter()
            .map(|name| {
                serde_json::json!({
                    "name": name,
                    "display_name": get_display_name(name)
                })
            })
            .collect();

        Some(serde_json::json!({
            "service": "OAuth Client",
            "providers": providers
        }))
    }
}
