//! # Mock Framework
//!
//! A stub OData gateway for exercising clients end to end.
//!
//! [`StubGateway::start`] binds an axum server to an ephemeral local port and
//! serves a `Products` entity set from memory. Every request it receives is
//! recorded with its headers and body so tests can assert on exactly what went
//! over the wire.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::GatewayConfig;

pub const STUB_AUTHORIZATION: &str = "Basic dGVzdDpzZWNyZXQ=";
pub const STUB_SUBSCRIPTION_KEY: &str = "stub-subscription-key";
pub const STUB_TRACE: &str = "true";

/// One request as seen by the stub.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    /// Query string exactly as received, before any decoding.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

/// Behaviour switches for the stub.
#[derive(Debug, Clone, Copy)]
pub struct StubOptions {
    /// Honour `$top`. When false the whole collection is returned.
    pub honour_top: bool,
    /// Answer PATCH with 200 and the record. When false answer 204.
    pub return_representation: bool,
    /// Answer every request with this status and a plain-text body.
    pub fail_with: Option<StatusCode>,
    /// Answer successful reads with a body that is not JSON.
    pub malformed: bool,
}

impl Default for StubOptions {
    fn default() -> Self {
        Self {
            honour_top: true,
            return_representation: true,
            fail_with: None,
            malformed: false,
        }
    }
}

#[derive(Default)]
struct StubState {
    records: Vec<Map<String, Value>>,
    requests: Vec<RecordedRequest>,
    options: StubOptions,
}

type Shared = Arc<Mutex<StubState>>;

pub struct StubGateway {
    addr: SocketAddr,
    state: Shared,
    handle: JoinHandle<()>,
}

impl StubGateway {
    pub async fn start(records: Vec<Value>) -> Self {
        Self::start_with(records, StubOptions::default()).await
    }

    pub async fn start_with(records: Vec<Value>, options: StubOptions) -> Self {
        let records = records
            .into_iter()
            .map(|record| match record {
                Value::Object(map) => map,
                other => panic!("stub records must be JSON objects, got {other}"),
            })
            .collect();
        let state: Shared = Arc::new(Mutex::new(StubState {
            records,
            requests: Vec::new(),
            options,
        }));

        let app = Router::new()
            .route("/odata/Products", get(list))
            .route("/odata/:entry", get(entry).patch(entry))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub gateway");
        let addr = listener.local_addr().expect("stub address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub gateway");
        });

        Self { addr, state, handle }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/odata/", self.addr)
    }

    /// Gateway settings carrying the stub credentials.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.base_url(),
            basic_auth: STUB_AUTHORIZATION.into(),
            subscription_key: STUB_SUBSCRIPTION_KEY.into(),
            trace: STUB_TRACE.into(),
            timeout: Some(std::time::Duration::from_secs(5)),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn record(&self, id: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        find(&state.records, id).map(|record| Value::Object(record.clone()))
    }
}

impl Drop for StubGateway {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Asserts that `request` carries exactly one of each gateway header with the stub values.
pub fn assert_gateway_headers(request: &RecordedRequest) {
    for (name, expected) in [
        ("authorization", STUB_AUTHORIZATION),
        ("ocp-apim-subscription-key", STUB_SUBSCRIPTION_KEY),
        ("ocp-apim-trace", STUB_TRACE),
    ] {
        let values: Vec<_> = request.headers.get_all(name).iter().collect();
        assert_eq!(values.len(), 1, "{name} on {} {}", request.method, request.path);
        assert_eq!(values[0], expected, "{name} on {} {}", request.method, request.path);
    }
}

fn find<'a>(records: &'a [Map<String, Value>], id: &str) -> Option<&'a Map<String, Value>> {
    records.iter().find(|record| record_id(record) == Some(id))
}

fn record_id(record: &Map<String, Value>) -> Option<&str> {
    record.get("Id").and_then(Value::as_str)
}

// `Products('it''s')` -> ("Products", "it's")
fn parse_entry(entry: &str) -> Option<(&str, String)> {
    let open = entry.find('(')?;
    let inner = entry[open + 1..].strip_suffix(')')?;
    let key = inner.strip_prefix('\'')?.strip_suffix('\'')?;
    Some((&entry[..open], key.replace("''", "'")))
}

fn record_request(state: &mut StubState, method: Method, path: String, uri: &Uri, headers: HeaderMap, body: &Bytes) {
    let body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice(body).ok()
    };
    let query = uri.query().map(String::from);
    state.requests.push(RecordedRequest { method, path, query, headers, body });
}

async fn list(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut state = state.lock().unwrap();
    record_request(&mut state, method, "/odata/Products".into(), &uri, headers, &Bytes::new());

    if let Some(status) = state.options.fail_with {
        return (status, "stub failure").into_response();
    }
    if state.options.malformed {
        return (StatusCode::OK, "<feed>not json</feed>").into_response();
    }

    let top = match params.get("$top") {
        Some(top) if state.options.honour_top => top.parse().unwrap_or(usize::MAX),
        _ => usize::MAX,
    };
    let value: Vec<Value> = state
        .records
        .iter()
        .take(top)
        .cloned()
        .map(Value::Object)
        .collect();

    Json(json!({ "@odata.context": "$metadata#Products", "value": value })).into_response()
}

async fn entry(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(entry): Path<String>,
    body: Bytes,
) -> Response {
    let mut state = state.lock().unwrap();
    record_request(&mut state, method.clone(), format!("/odata/{entry}"), &uri, headers, &body);

    if let Some(status) = state.options.fail_with {
        return (status, "stub failure").into_response();
    }
    let Some(("Products", key)) = parse_entry(&entry) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let Some(index) = state.records.iter().position(|record| record_id(record) == Some(key.as_str())) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": { "message": "not found" } }))).into_response();
    };

    if method == Method::PATCH {
        let Ok(Value::Object(patch)) = serde_json::from_slice::<Value>(&body) else {
            return (StatusCode::BAD_REQUEST, "patch must be a JSON object").into_response();
        };
        state.records[index].extend(patch);
        if !state.options.return_representation {
            return StatusCode::NO_CONTENT.into_response();
        }
    } else if state.options.malformed {
        return (StatusCode::OK, "{\"Id\":").into_response();
    }

    Json(Value::Object(state.records[index].clone())).into_response()
}

/// `count` products with ids `1..=count`, names `Product N` and price `N * 1.5`.
pub fn numbered_products(count: usize) -> Vec<Value> {
    (1..=count)
        .map(|n| json!({ "Id": n.to_string(), "Name": format!("Product {n}"), "Price": n as f64 * 1.5 }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry_unescapes_quotes() {
        assert_eq!(parse_entry("Products('42')"), Some(("Products", "42".to_string())));
        assert_eq!(parse_entry("Products('it''s')"), Some(("Products", "it's".to_string())));
        assert_eq!(parse_entry("Products"), None);
    }
}
