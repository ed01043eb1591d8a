use std::future::Future;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::token::AuthToken;
use crate::error::{ApiError, ApiResult};
use crate::observability::metrics::get_metrics;

pub const AUTH_PATH: &str = "/api/auth";

pub trait FetchToken: Send + Sync {
    fn fetch_token(&self) -> impl Future<Output = ApiResult<AuthToken>> + Send;
}

#[derive(Serialize)]
struct Credentials<'a> {
    #[serde(rename = "UserName")]
    username: &'a str,
    #[serde(rename = "Password")]
    password: &'a str,
}

/// Username/password login against `{base_url}/api/auth`.
#[derive(Debug, Clone)]
pub struct TdxAuthSource {
    pub environment: String,
    base_url: String,
    username: String,
    password: String,
    client: Client,
}

impl TdxAuthSource {
    pub fn new(
        environment: impl Into<String>,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            environment: environment.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            client,
        }
    }

    fn endpoint(&self) -> String {
        format!("POST {}", AUTH_PATH)
    }

    fn fail(&self, status: Option<u16>, message: impl Into<String>) -> ApiError {
        let metrics = get_metrics();
        metrics
            .auth_token_fetches
            .with_label_values(&[self.environment.as_str(), "error"])
            .inc();
        let message = message.into();
        warn!(environment = %self.environment, ?status, "token fetch failed: {}", message);
        ApiError::Auth {
            endpoint: self.endpoint(),
            status,
            message,
        }
    }
}

impl FetchToken for TdxAuthSource {
    async fn fetch_token(&self) -> ApiResult<AuthToken> {
        let url = format!("{}{}", self.base_url, AUTH_PATH);
        debug!(environment = %self.environment, "fetching auth token");

        let response = self
            .client
            .post(&url)
            .json(&Credentials {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await
            .map_err(|e| self.fail(None, format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.fail(Some(status.as_u16()), format!("reading token response: {e}")))?;

        if !status.is_success() {
            return Err(self.fail(
                Some(status.as_u16()),
                format!("auth endpoint rejected credentials: {}", body.trim()),
            ));
        }

        // the endpoint answers with the raw JWT, sometimes JSON-quoted
        let token = body.trim().trim_matches('"').trim();
        if token.is_empty() {
            return Err(self.fail(Some(status.as_u16()), "auth endpoint returned an empty token"));
        }

        get_metrics()
            .auth_token_fetches
            .with_label_values(&[self.environment.as_str(), "ok"])
            .inc();
        Ok(AuthToken::new(token))
    }
}
