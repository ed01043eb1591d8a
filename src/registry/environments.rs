//! Named TDX environments, built once at startup.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{error, info, warn};

use crate::cache::token_manager::AuthTokenManager;
use crate::client::api::TdxClient;
use crate::config::environments::Connection;
use crate::config::types::ServiceConfig;
use crate::error::{ApiError, ToolError};
use crate::resilience::executor::RequestExecutor;
use crate::resilience::retry::RetryPolicy;
use crate::sources::auth::TdxAuthSource;
use crate::utils::constants::ENVIRONMENT_PREFERENCE;

/// Environment name to API client, plus the environments that failed to load.
///
/// Failed environments keep their configuration error so that calls naming
/// them get that error instead of a generic "not configured".
pub struct EnvironmentRegistry {
    clients: BTreeMap<String, TdxClient>,
    failures: BTreeMap<String, ApiError>,
    default_environment: String,
}

impl EnvironmentRegistry {
    pub fn from_config(service_config: &ServiceConfig) -> Result<Self> {
        let settings = &service_config.settings;
        let http = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .context("building HTTP client")?;
        let policy = RetryPolicy::from_config(settings.retry.as_ref());

        let mut clients = BTreeMap::new();
        let mut failures = BTreeMap::new();
        for (name, env_cfg) in &service_config.environments {
            if env_cfg.is_unset() {
                warn!(environment = %name, "no credentials configured, skipping");
                continue;
            }
            match env_cfg.resolve(name) {
                Ok(connection) => {
                    info!(environment = %name, base_url = %connection.base_url, "environment loaded");
                    clients.insert(name.clone(), build_client(connection, http.clone(), policy.clone()));
                }
                Err(err) => {
                    error!(environment = %name, "failed to load environment: {}", err);
                    failures.insert(name.clone(), err);
                }
            }
        }

        Ok(Self::new(clients, failures, &settings.default_environment))
    }

    pub fn new(
        clients: BTreeMap<String, TdxClient>,
        failures: BTreeMap<String, ApiError>,
        preferred_default: &str,
    ) -> Self {
        let default_environment = pick_default(preferred_default, &clients);
        if clients.is_empty() {
            warn!(
                default = %default_environment,
                "no environments configured; tools will fail until credentials are provided"
            );
        } else {
            if default_environment != preferred_default {
                warn!(
                    "default environment '{}' not available, falling back to '{}'",
                    preferred_default, default_environment
                );
            }
            info!(
                default = %default_environment,
                available = %clients.keys().cloned().collect::<Vec<_>>().join(", "),
                "environments ready"
            );
        }
        Self {
            clients,
            failures,
            default_environment,
        }
    }

    pub fn default_environment(&self) -> &str {
        &self.default_environment
    }

    pub fn available(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    /// Client for `environment`, or for the default one when absent or empty.
    pub fn resolve(&self, environment: Option<&str>) -> Result<&TdxClient, ToolError> {
        let name = environment
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(self.default_environment.as_str());

        if let Some(client) = self.clients.get(name) {
            return Ok(client);
        }
        if let Some(err) = self.failures.get(name) {
            return Err(ToolError::Api(err.clone()));
        }
        Err(ToolError::UnknownEnvironment {
            name: name.to_string(),
            available: self.available(),
        })
    }
}

pub fn build_client(connection: Connection, http: Client, policy: RetryPolicy) -> TdxClient {
    let source = TdxAuthSource::new(
        connection.environment.clone(),
        connection.base_url.clone(),
        connection.username,
        connection.password,
        http.clone(),
    );
    let auth = Arc::new(AuthTokenManager::new(connection.environment.clone(), source));
    let executor = RequestExecutor::new(connection.environment, connection.base_url, http, policy, auth);
    TdxClient::new(executor)
}

/// Configured name if loaded, else the first loaded of the well-known names,
/// else the alphabetically first loaded one.
fn pick_default(preferred: &str, clients: &BTreeMap<String, TdxClient>) -> String {
    if clients.contains_key(preferred) {
        return preferred.to_string();
    }
    ENVIRONMENT_PREFERENCE
        .iter()
        .find(|name| clients.contains_key(**name))
        .map(|name| name.to_string())
        .or_else(|| clients.keys().next().cloned())
        .unwrap_or_else(|| preferred.to_string())
}
