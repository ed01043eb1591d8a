// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::routing::post;
use reqwest::Client;

use crate::cache::token_manager::AuthTokenManager;
use crate::client::api::TdxClient;
use crate::resilience::executor::RequestExecutor;
use crate::resilience::retry::{Pause, RetryPolicy};
use crate::sources::auth::TdxAuthSource;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().expect("reqwest client")
}

/// `POST /api/auth` handing out `token-1`, `token-2`, ... and counting fetches.
pub fn auth_route(fetches: Arc<AtomicUsize>) -> Router {
    Router::new().route(
        "/api/auth",
        post(move || {
            let fetches = fetches.clone();
            async move {
                let n = fetches.fetch_add(1, Ordering::SeqCst) + 1;
                format!("\"token-{}\"", n)
            }
        }),
    )
}

/// Records requested backoff delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingPause {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingPause {
    pub fn recorded(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

impl Pause for RecordingPause {
    fn pause(&self, delay: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.delays.lock().unwrap().push(delay);
        Box::pin(async {})
    }
}

pub fn millis(values: &[u64]) -> Vec<Duration> {
    values.iter().copied().map(Duration::from_millis).collect()
}

/// Client for a local test server, wired the way the registry wires real ones
/// except for the recording pause.
pub fn test_client(base_url: &str, policy: RetryPolicy, timeout: Duration) -> (TdxClient, Arc<RecordingPause>) {
    let http = build_reqwest_client(timeout);
    let source = TdxAuthSource::new("test", base_url, "svc", "secret", http.clone());
    let auth = Arc::new(AuthTokenManager::new("test", source));
    let pause = Arc::new(RecordingPause::default());
    let executor = RequestExecutor::new("test", base_url, http, policy, auth).with_pause(pause.clone());
    (TdxClient::new(executor), pause)
}
