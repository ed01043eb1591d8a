use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::token_manager::{auth_headers, AuthTokenManager};
use crate::error::{ApiError, ApiResult};
use crate::observability::metrics::get_metrics;
use crate::resilience::attempt::{
    classify, AttemptOutcome, Decision, Failure, RequestAttemptContext, TransportFailure,
};
use crate::resilience::retry::{Pause, RetryPolicy, TokioPause};

const MAX_ERROR_BODY_CHARS: usize = 500;

/// Runs one logical API call: auth headers, one reauthentication on 401,
/// and exponential backoff for transient statuses and network failures.
#[derive(Clone)]
pub struct RequestExecutor {
    environment: String,
    base_url: String,
    client: Client,
    policy: RetryPolicy,
    auth: Arc<AuthTokenManager>,
    pause: Arc<dyn Pause>,
}

impl RequestExecutor {
    pub fn new(
        environment: impl Into<String>,
        base_url: impl Into<String>,
        client: Client,
        policy: RetryPolicy,
        auth: Arc<AuthTokenManager>,
    ) -> Self {
        Self {
            environment: environment.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            policy,
            auth,
            pause: Arc::new(TokioPause),
        }
    }

    pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Self {
        self.pause = pause;
        self
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn auth(&self) -> &Arc<AuthTokenManager> {
        &self.auth
    }

    pub async fn get(&self, path: &str) -> ApiResult<Value> {
        self.execute(Method::GET, path, None::<&Value>).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Value> {
        self.execute(Method::POST, path, Some(body)).await
    }

    pub async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<Value> {
        let metrics = get_metrics();
        let start = Instant::now();
        metrics
            .api_requests
            .with_label_values(&[self.environment.as_str(), method.as_str()])
            .inc();

        let result = self.run(&method, path, body).await;

        metrics
            .api_request_duration
            .with_label_values(&[self.environment.as_str()])
            .observe(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            metrics
                .api_request_failures
                .with_label_values(&[self.environment.as_str(), err.kind()])
                .inc();
            error!(environment = %self.environment, kind = err.kind(), "{}", err);
        }
        result
    }

    async fn run<B: Serialize + ?Sized>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<Value> {
        let endpoint = format!("{} {}", method, path);
        let url = format!("{}{}", self.base_url, path);
        let mut ctx = RequestAttemptContext::new();
        let mut token = self.auth.current_token().await?;
        let mut headers = auth_headers(&token, &self.environment)?;

        loop {
            debug!(environment = %self.environment, %endpoint, attempt = ctx.attempts(), "sending request");
            let response = match self.send_once(method, &url, body, &headers).await {
                Ok(response) => response,
                Err(err) => {
                    let failure = TransportFailure::from_reqwest(&err);
                    warn!(environment = %self.environment, %endpoint, kind = failure.as_str(), "transport failure: {}", err);
                    if let Decision::Retry { delay } =
                        classify(AttemptOutcome::Transport(failure), ctx, &self.policy)
                    {
                        ctx = self.backoff(ctx, &endpoint, failure.as_str(), delay).await;
                        continue;
                    }
                    return Err(ApiError::Network {
                        endpoint,
                        message: err.to_string(),
                        attempts: ctx.attempts(),
                    });
                }
            };

            let status = response.status();
            match classify(AttemptOutcome::Status(status.as_u16()), ctx, &self.policy) {
                Decision::Success => return read_payload(response, &endpoint, ctx).await,
                Decision::Reauthenticate => {
                    warn!(environment = %self.environment, %endpoint, "received 401, refreshing token and retrying once");
                    get_metrics()
                        .api_reauthentications
                        .with_label_values(&[self.environment.as_str()])
                        .inc();
                    self.auth.invalidate_if_current(&token).await;
                    token = self.auth.current_token().await?;
                    headers = auth_headers(&token, &self.environment)?;
                    ctx = ctx.after_reauth();
                }
                Decision::Retry { delay } => {
                    // drain so the connection can be reused
                    let _ = response.bytes().await;
                    ctx = self.backoff(ctx, &endpoint, status.as_str(), delay).await;
                }
                Decision::Fail(failure) => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(failure_error(failure, endpoint, status.as_u16(), body, ctx));
                }
            }
        }
    }

    async fn send_once<B: Serialize + ?Sized>(
        &self,
        method: &Method,
        url: &str,
        body: Option<&B>,
        headers: &HeaderMap,
    ) -> Result<Response, reqwest::Error> {
        let mut request = self.client.request(method.clone(), url).headers(headers.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await
    }

    async fn backoff(
        &self,
        ctx: RequestAttemptContext,
        endpoint: &str,
        reason: &str,
        delay: std::time::Duration,
    ) -> RequestAttemptContext {
        let next = ctx.after_retry();
        info!(
            environment = %self.environment,
            %endpoint,
            "retrying request ({}/{}) after {}ms due to {}",
            next.retry_count,
            self.policy.max_retries,
            delay.as_millis(),
            reason
        );
        get_metrics()
            .api_retries
            .with_label_values(&[self.environment.as_str(), reason])
            .inc();
        self.pause.pause(delay).await;
        next
    }
}

/// Terminal error for a failed status response.
fn failure_error(
    failure: Failure,
    endpoint: String,
    status: u16,
    body: String,
    ctx: RequestAttemptContext,
) -> ApiError {
    match failure {
        Failure::Auth => ApiError::Auth {
            endpoint,
            status: Some(status),
            message: "request rejected again after reauthentication".to_string(),
        },
        Failure::Transient => ApiError::Transient {
            endpoint,
            status,
            body: truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS),
            attempts: ctx.attempts(),
        },
        Failure::Permanent => ApiError::Permanent {
            endpoint,
            status,
            message: error_message(status, &body),
        },
        Failure::Network => ApiError::Network {
            endpoint,
            message: error_message(status, &body),
            attempts: ctx.attempts(),
        },
    }
}

async fn read_payload(response: Response, endpoint: &str, ctx: RequestAttemptContext) -> ApiResult<Value> {
    let bytes = response.bytes().await.map_err(|e| ApiError::Network {
        endpoint: endpoint.to_string(),
        message: format!("reading response body: {e}"),
        attempts: ctx.attempts(),
    })?;
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
}

/// `Message` of a JSON error body, else the body text, else the reason phrase.
fn error_message(status: u16, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["Message", "message", "error"] {
            if let Some(Value::String(message)) = map.get(key) {
                return message.clone();
            }
        }
    }
    let body = body.trim();
    if !body.is_empty() {
        return truncate_chars(body, MAX_ERROR_BODY_CHARS);
    }
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("unknown error")
        .to_string()
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_api_message() {
        assert_eq!(error_message(400, r#"{"Message":"Invalid StatusID"}"#), "Invalid StatusID");
        assert_eq!(error_message(404, "  no such project "), "no such project");
        assert_eq!(error_message(404, ""), "Not Found");
    }

    #[test]
    fn long_bodies_are_cut() {
        let body = "x".repeat(MAX_ERROR_BODY_CHARS + 10);
        let message = error_message(400, &body);
        assert_eq!(message.chars().count(), MAX_ERROR_BODY_CHARS + 3);
        assert!(message.ends_with("..."));
    }

    #[test]
    fn failures_map_to_matching_error_kinds() {
        let ctx = RequestAttemptContext::new().after_retry();
        let endpoint = || "GET /api/projects/7".to_string();

        let network = failure_error(Failure::Network, endpoint(), 0, String::new(), ctx);
        assert!(matches!(network, ApiError::Network { attempts: 2, .. }), "{network:?}");

        let permanent = failure_error(Failure::Permanent, endpoint(), 404, r#"{"Message":"gone"}"#.into(), ctx);
        assert!(matches!(&permanent, ApiError::Permanent { status: 404, message, .. } if message == "gone"));

        let transient = failure_error(Failure::Transient, endpoint(), 503, " busy ".into(), ctx);
        assert!(matches!(&transient, ApiError::Transient { body, attempts: 2, .. } if body == "busy"));

        let auth = failure_error(Failure::Auth, endpoint(), 401, String::new(), ctx);
        assert_eq!(auth.status(), Some(401));
    }
}
