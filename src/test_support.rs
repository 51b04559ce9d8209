//! Recording mock of the Kubecost API for tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};

use crate::config::KubecostConfig;
use crate::kubecost::KubecostClient;

#[derive(Clone)]
struct CannedResponse {
    status: StatusCode,
    body: Value,
    delay: Option<Duration>,
}

/// A request seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Clone, Default)]
struct MockState {
    routes: Arc<Mutex<HashMap<(Method, String), CannedResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Mock Kubecost server bound to an ephemeral local port.
///
/// Unregistered routes answer 404.
pub struct MockKubecost {
    pub base_url: String,
    state: MockState,
}

impl MockKubecost {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new().fallback(record).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// A base URL nothing listens on
    pub async fn unreachable_base_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    pub fn on(&self, method: Method, path: &str, status: StatusCode, body: Value) {
        self.insert(method, path, CannedResponse { status, body, delay: None });
    }

    pub fn on_delayed(&self, method: Method, path: &str, status: StatusCode, body: Value, delay: Duration) {
        self.insert(method, path, CannedResponse { status, body, delay: Some(delay) });
    }

    fn insert(&self, method: Method, path: &str, response: CannedResponse) {
        self.state
            .routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Bearer-token config pointing at this mock
    pub fn config(&self) -> KubecostConfig {
        KubecostConfig::new(&self.base_url, Some("test-token"), None, None).unwrap()
    }

    pub fn client(&self) -> KubecostClient {
        KubecostClient::new(&self.config()).unwrap()
    }
}

async fn record(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    });

    let canned = state.routes.lock().unwrap().get(&(method, path)).cloned();
    match canned {
        Some(canned) => {
            if let Some(delay) = canned.delay {
                tokio::time::sleep(delay).await;
            }
            (canned.status, Json(canned.body)).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "no route" }))).into_response(),
    }
}
