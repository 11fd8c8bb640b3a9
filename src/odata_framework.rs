use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Request, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::ODataError;

// =============================================================================
// 1. THE ABSTRACTION
// =============================================================================

/// Trait that any record served through an [`ODataClient`] must implement.
pub trait Entity: DeserializeOwned + Send + Sync + 'static {
    /// Partial field set sent by `update_by_key`.
    type Patch: Serialize + Send + Sync + fmt::Debug;

    /// Logical collection name on the service, e.g. `Products`.
    const ENTITY_SET: &'static str;
}

/// Hook run against every outbound request just before it is dispatched.
pub type RequestDecorator = Arc<dyn Fn(&mut Request) + Send + Sync>;

// =============================================================================
// 2. SETTINGS
// =============================================================================

/// Endpoint plus the decorators applied to each request.
#[derive(Clone)]
pub struct ClientSettings {
    base_url: Url,
    timeout: Option<Duration>,
    before_request: Vec<RequestDecorator>,
}

impl ClientSettings {
    /// Parses the service root. A trailing `/` is added so entity sets resolve
    /// beneath the root rather than replacing its last segment.
    pub fn new(base_url: &str) -> Result<Self, ODataError> {
        let mut url = Url::parse(base_url.trim())
            .map_err(|e| ODataError::Configuration(format!("base URL {base_url:?}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ODataError::Configuration(format!(
                "base URL {base_url:?} must be an absolute http(s) URL"
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(Self {
            base_url: url,
            timeout: None,
            before_request: Vec::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Registers a decorator. Decorators run in registration order.
    pub fn before_request(mut self, decorate: impl Fn(&mut Request) + Send + Sync + 'static) -> Self {
        self.before_request.push(Arc::new(decorate));
        self
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("before_request", &self.before_request.len())
            .finish()
    }
}

// =============================================================================
// 3. WIRE ENVELOPES
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Feed<T> {
    V4 { value: Vec<T> },
    V2 { d: FeedResults<T> },
}

#[derive(Deserialize)]
struct FeedResults<T> {
    results: Vec<T>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Entry<T> {
    V2 { d: T },
    Bare(T),
}

impl<T> Feed<T> {
    fn into_records(self) -> Vec<T> {
        match self {
            Feed::V4 { value } => value,
            Feed::V2 { d } => d.results,
        }
    }
}

impl<T> Entry<T> {
    fn into_record(self) -> T {
        match self {
            Entry::V2 { d } => d,
            Entry::Bare(record) => record,
        }
    }
}

/// Formats `key` as a quoted OData key literal safe to place in a path segment.
///
/// URL parsing treats `\` as a separator and drops tabs and line breaks, so
/// those are percent-encoded along with the other reserved characters.
pub fn key_literal(key: &str) -> String {
    let mut literal = String::with_capacity(key.len() + 2);
    literal.push('\'');
    for ch in key.chars() {
        match ch {
            '\'' => literal.push_str("''"),
            '%' => literal.push_str("%25"),
            '/' => literal.push_str("%2F"),
            '?' => literal.push_str("%3F"),
            '#' => literal.push_str("%23"),
            '\\' => literal.push_str("%5C"),
            ch if ch.is_control() => {
                let mut buf = [0; 4];
                for byte in ch.encode_utf8(&mut buf).bytes() {
                    literal.push_str(&format!("%{byte:02X}"));
                }
            }
            _ => literal.push(ch),
        }
    }
    literal.push('\'');
    literal
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

/// Typed client for one entity set. Cloning is cheap; the connection pool and
/// decorators are shared.
pub struct ODataClient<T: Entity> {
    http: reqwest::Client,
    settings: ClientSettings,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for ODataClient<T> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            settings: self.settings.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> ODataClient<T> {
    /// Binds settings to an existing connection pool. Performs no I/O.
    pub fn new(http: reqwest::Client, settings: ClientSettings) -> Self {
        Self {
            http,
            settings,
            _entity: PhantomData,
        }
    }

    /// Fetches at most `count` records in server order.
    #[instrument(skip(self))]
    pub async fn list_top(&self, entity_set: &str, count: usize) -> Result<Vec<T>, ODataError> {
        if count == 0 {
            return Err(ODataError::Validation("result limit must be at least 1".into()));
        }

        let url = self.top_url(entity_set, count)?;
        let request = self.build(self.http.get(url))?;
        let response = self.send(request).await?;
        let body = Self::success_body(response, None).await?;

        let mut records = serde_json::from_slice::<Feed<T>>(&body)
            .map_err(|e| ODataError::Query(format!("malformed {entity_set} feed: {e}")))?
            .into_records();

        if records.len() > count {
            warn!(received = records.len(), count, "Service ignored $top, truncating");
            records.truncate(count);
        }
        debug!(received = records.len(), "Feed received");
        Ok(records)
    }

    #[instrument(skip(self))]
    pub async fn get_by_key(&self, entity_set: &str, key: &str) -> Result<T, ODataError> {
        let url = self.entry_url(entity_set, key)?;
        let request = self.build(self.http.get(url))?;
        let response = self.send(request).await?;
        let body = Self::success_body(response, Some(key)).await?;
        Self::parse_entry(entity_set, &body)
    }

    /// Sends `patch` as a partial update and returns the record the service
    /// holds afterwards.
    #[instrument(skip(self))]
    pub async fn update_by_key(&self, entity_set: &str, key: &str, patch: &T::Patch) -> Result<T, ODataError> {
        let fields = serde_json::to_value(patch)
            .map_err(|e| ODataError::Validation(format!("patch is not serializable: {e}")))?;
        match &fields {
            Value::Object(map) if !map.is_empty() => {
                // Non-finite numbers serialize as null, which would clear the field remotely.
                if let Some((name, _)) = map.iter().find(|(_, value)| value.is_null()) {
                    return Err(ODataError::Validation(format!("patch field {name} has no value")));
                }
            }
            _ => return Err(ODataError::Validation("patch carries no fields".into())),
        }

        let url = self.entry_url(entity_set, key)?;
        let request = self.build(
            self.http
                .patch(url)
                .header("Prefer", "return=representation")
                .json(&fields),
        )?;
        let response = self.send(request).await?;

        if response.status() == StatusCode::NO_CONTENT {
            debug!("Update accepted without representation, re-reading");
            return self.get_by_key(entity_set, key).await;
        }

        let body = Self::success_body(response, Some(key)).await?;
        Self::parse_entry(entity_set, &body)
    }

    fn collection_url(&self, entity_set: &str) -> Result<Url, ODataError> {
        self.settings
            .base_url
            .join(entity_set)
            .map_err(|e| ODataError::Configuration(format!("entity set {entity_set:?}: {e}")))
    }

    // Query options go on the wire literally; form encoding would send `%24top`.
    fn top_url(&self, entity_set: &str, count: usize) -> Result<Url, ODataError> {
        let mut url = self.collection_url(entity_set)?;
        url.set_query(Some(&format!("$top={count}")));
        Ok(url)
    }

    fn entry_url(&self, entity_set: &str, key: &str) -> Result<Url, ODataError> {
        let segment = format!("{}({})", entity_set, key_literal(key));
        self.settings
            .base_url
            .join(&segment)
            .map_err(|e| ODataError::Configuration(format!("entry {segment:?}: {e}")))
    }

    fn build(&self, builder: reqwest::RequestBuilder) -> Result<Request, ODataError> {
        builder
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .build()
            .map_err(|e| ODataError::Query(e.to_string()))
    }

    async fn send(&self, mut request: Request) -> Result<Response, ODataError> {
        for decorate in &self.settings.before_request {
            decorate(&mut request);
        }
        if let Some(timeout) = self.settings.timeout {
            *request.timeout_mut() = Some(timeout);
        }

        debug!(method = %request.method(), url = %request.url(), "Sending request");
        self.http
            .execute(request)
            .await
            .map_err(|e| ODataError::Query(e.to_string()))
    }

    async fn success_body(response: Response, key: Option<&str>) -> Result<Vec<u8>, ODataError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(key) = key {
                return Err(ODataError::NotFound(key.to_string()));
            }
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ODataError::Query(format!("{status}: {}", detail.trim())));
        }

        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| ODataError::Query(e.to_string()))
    }

    fn parse_entry(entity_set: &str, body: &[u8]) -> Result<T, ODataError> {
        serde_json::from_slice::<Entry<T>>(body)
            .map(Entry::into_record)
            .map_err(|e| ODataError::Query(format!("malformed {entity_set} entry: {e}")))
    }
}
