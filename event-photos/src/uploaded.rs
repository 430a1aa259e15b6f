//! Fetches the ids already uploaded to an event gallery.
//!
//! Fail-open: when no source yields anything the result is the empty set, so
//! every candidate is treated as new. A duplicate upload is deduplicated
//! server-side, a skipped photo is lost.

use crate::page::{photo_id_of, uploaded_ids_from_page, PageSignals};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Endpoint templates tried in order; `{event_id}` is substituted
pub const DEFAULT_UPLOADED_ENDPOINTS: &[&str] = &[
    "/api/events/{event_id}/uploaded-photos",
    "/api/events/{event_id}/photos/uploaded",
    "/api/events/{event_id}/media/uploaded",
    "/events/{event_id}/uploaded-photos",
    "/mobile/events/{event_id}/uploaded-photos",
    "/functions/v1/api-events-uploaded-photos/{event_id}",
];

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for remote reads
#[derive(Debug)]
pub enum FetchError {
    Network(String),
    Status(u16),
    InvalidBody(String),
    Timeout,
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::Status(code) => write!(f, "Server returned status: {}", code),
            FetchError::InvalidBody(msg) => write!(f, "Invalid response body: {}", msg),
            FetchError::Timeout => write!(f, "Request timed out"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Headers attached to every uploaded-id read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthHeaders {
    pub bearer: Option<String>,
    pub csrf: Option<String>,
}

impl AuthHeaders {
    /// Resolves headers without waiting: the current token if one is already
    /// known, else stored tokens, else the `auth-token` meta tag. CSRF comes
    /// from the `csrf-token` meta tag or the `_token` input.
    pub fn resolve(current_token: Option<&str>, page: Option<&PageSignals>) -> Self {
        let non_empty = |s: &&str| !s.is_empty();

        let bearer = current_token
            .filter(non_empty)
            .or_else(|| {
                page.and_then(|p| p.stored_tokens.iter().map(String::as_str).find(non_empty))
            })
            .or_else(|| page.and_then(|p| p.meta("auth-token")))
            .map(str::to_string);

        let csrf = page
            .and_then(|p| {
                p.meta("csrf-token")
                    .or_else(|| p.csrf_input.as_deref().filter(non_empty))
            })
            .map(str::to_string);

        Self { bearer, csrf }
    }

    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(token) = &self.bearer {
            pairs.push(("Authorization", format!("Bearer {}", token)));
        }
        if let Some(csrf) = &self.csrf {
            pairs.push(("X-CSRF-Token", csrf.clone()));
        }
        pairs
    }
}

/// Reads a JSON document from a remote location
#[async_trait]
pub trait RemoteJsonSource: Send + Sync {
    async fn get_json(&self, url: &str, headers: &AuthHeaders) -> Result<Value, FetchError>;
}

/// Turns one response document into ids, or `None` if the shape doesn't match
pub type ShapeStrategy = fn(&Value) -> Option<HashSet<String>>;

fn ids_from_array(items: &[Value]) -> HashSet<String> {
    items.iter().filter_map(photo_id_of).collect()
}

/// `[ "id", {id|photoId|localIdentifier}, … ]`
pub fn bare_array(body: &Value) -> Option<HashSet<String>> {
    body.as_array().map(|items| ids_from_array(items))
}

/// `{ "photos": [ … ] }`
pub fn photos_field(body: &Value) -> Option<HashSet<String>> {
    body.get("photos")?.as_array().map(|items| ids_from_array(items))
}

/// `{ "uploadedPhotoIds": [ … ] }`
pub fn uploaded_photo_ids_field(body: &Value) -> Option<HashSet<String>> {
    body.get("uploadedPhotoIds")?
        .as_array()
        .map(|items| ids_from_array(items))
}

/// `{ "data": [ … ] }`
pub fn data_field(body: &Value) -> Option<HashSet<String>> {
    body.get("data")?.as_array().map(|items| ids_from_array(items))
}

/// `{ "uploadedHashes": [ "<hash>_<suffix>", … ], "count": n }`
pub fn uploaded_hashes_field(body: &Value) -> Option<HashSet<String>> {
    let items = body.get("uploadedHashes")?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|entry| entry.split('_').next())
            .filter(|hash| !hash.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

pub const DEFAULT_SHAPES: &[ShapeStrategy] = &[
    bare_array,
    photos_field,
    uploaded_photo_ids_field,
    data_field,
    uploaded_hashes_field,
];

/// Applies the strategies in order and takes the first match
pub fn normalize_response(body: &Value, shapes: &[ShapeStrategy]) -> Option<HashSet<String>> {
    shapes.iter().find_map(|shape| shape(body))
}

/// Tries the endpoint chain, then the page, then gives up with an empty set
pub struct UploadedSetFetcher {
    source: Arc<dyn RemoteJsonSource>,
    endpoints: Vec<String>,
    shapes: Vec<ShapeStrategy>,
    timeout: Duration,
}

impl UploadedSetFetcher {
    pub fn new(source: Arc<dyn RemoteJsonSource>) -> Self {
        Self {
            source,
            endpoints: DEFAULT_UPLOADED_ENDPOINTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            shapes: DEFAULT_SHAPES.to_vec(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Never fails; see module docs for the fallback order
    pub async fn fetch_uploaded_ids(
        &self,
        event_id: &str,
        headers: &AuthHeaders,
        page: Option<&PageSignals>,
    ) -> HashSet<String> {
        log::debug!("Fetching uploaded photo ids for event {}", event_id);

        for template in &self.endpoints {
            let url = template.replace("{event_id}", event_id);

            let request = self.source.get_json(&url, headers);
            let body = match tokio::time::timeout(self.timeout, request).await {
                Ok(Ok(body)) => body,
                Ok(Err(e)) => {
                    log::debug!("Endpoint {} failed: {}", url, e);
                    continue;
                }
                Err(_) => {
                    log::debug!("Endpoint {} failed: {}", url, FetchError::Timeout);
                    continue;
                }
            };

            match normalize_response(&body, &self.shapes) {
                Some(ids) if !ids.is_empty() => {
                    log::info!("Found {} uploaded photo ids via {}", ids.len(), url);
                    return ids;
                }
                Some(_) => log::debug!("Endpoint {} returned no ids", url),
                None => log::debug!("Endpoint {} returned an unrecognized shape", url),
            }
        }

        if let Some(page) = page {
            let ids = uploaded_ids_from_page(page);
            if !ids.is_empty() {
                log::info!("Extracted {} uploaded photo ids from page", ids.len());
                return ids;
            }
        }

        log::warn!(
            "No uploaded photo ids found for event {}, all photos count as new",
            event_id
        );
        HashSet::new()
    }
}

/// reqwest-backed source; relative endpoints are resolved against `base_url`
#[cfg(feature = "sync")]
pub struct HttpJsonSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[cfg(feature = "sync")]
impl HttpJsonSource {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .user_agent("PhotoShareAutoUpload/0.1.0")
            .build()
            .map_err(|e| FetchError::Network(format!("Client build failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }

    fn absolute(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.base_url.trim_end_matches('/'), url)
        }
    }
}

#[cfg(feature = "sync")]
#[async_trait]
impl RemoteJsonSource for HttpJsonSource {
    async fn get_json(&self, url: &str, headers: &AuthHeaders) -> Result<Value, FetchError> {
        let mut request = self
            .client
            .get(self.absolute(url))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json");

        for (name, value) in headers.pairs() {
            request = request.header(name, value);
        }
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::InvalidBody(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageElement;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies per URL and records which URLs were hit
    struct FakeSource {
        bodies: HashMap<String, Result<Value, u16>>,
        hits: Mutex<Vec<String>>,
        seen_headers: Mutex<Vec<AuthHeaders>>,
    }

    impl FakeSource {
        fn new(bodies: Vec<(&str, Result<Value, u16>)>) -> Self {
            Self {
                bodies: bodies
                    .into_iter()
                    .map(|(url, body)| (url.to_string(), body))
                    .collect(),
                hits: Mutex::new(Vec::new()),
                seen_headers: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RemoteJsonSource for FakeSource {
        async fn get_json(&self, url: &str, headers: &AuthHeaders) -> Result<Value, FetchError> {
            self.hits.lock().unwrap().push(url.to_string());
            self.seen_headers.lock().unwrap().push(headers.clone());
            match self.bodies.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(code)) => Err(FetchError::Status(*code)),
                None => Err(FetchError::Status(404)),
            }
        }
    }

    struct HangingSource;

    #[async_trait]
    impl RemoteJsonSource for HangingSource {
        async fn get_json(&self, _url: &str, _headers: &AuthHeaders) -> Result<Value, FetchError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(json!(["never"]))
        }
    }

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_shapes() {
        let shapes = DEFAULT_SHAPES;
        let bare = json!(["a", {"id": "b"}, {"photoId": "c"}]);
        assert_eq!(normalize_response(&bare, shapes), Some(set(&["a", "b", "c"])));

        let photos = json!({"photos": [{"localIdentifier": "x"}]});
        assert_eq!(normalize_response(&photos, shapes), Some(set(&["x"])));

        let ids = json!({"uploadedPhotoIds": ["u1", "", "u2"]});
        assert_eq!(normalize_response(&ids, shapes), Some(set(&["u1", "u2"])));

        let data = json!({"data": [{"id": "d"}]});
        assert_eq!(normalize_response(&data, shapes), Some(set(&["d"])));

        let hashes = json!({"uploadedHashes": ["abc_1700000000", "def_x", "_bad"], "count": 3});
        assert_eq!(normalize_response(&hashes, shapes), Some(set(&["abc", "def"])));
        assert_eq!(normalize_response(&json!({"status": "ok"}), shapes), None);
    }

    #[test]
    fn test_first_matching_shape_wins() {
        let body = json!({"photos": [{"id": "from-photos"}], "data": [{"id": "from-data"}]});
        assert_eq!(normalize_response(&body, DEFAULT_SHAPES), Some(set(&["from-photos"])));
    }

    #[test]
    fn test_auth_headers_resolution_order() {
        let page = PageSignals {
            stored_tokens: vec!["".to_string(), "stored".to_string()],
            meta: [
                ("auth-token".to_string(), "meta".to_string()),
                ("csrf-token".to_string(), "csrf-meta".to_string()),
            ]
            .into_iter()
            .collect(),
            csrf_input: Some("csrf-input".to_string()),
            ..Default::default()
        };

        let headers = AuthHeaders::resolve(Some("live"), Some(&page));
        assert_eq!(headers.bearer.as_deref(), Some("live"));
        assert_eq!(headers.csrf.as_deref(), Some("csrf-meta"));

        let headers = AuthHeaders::resolve(None, Some(&page));
        assert_eq!(headers.bearer.as_deref(), Some("stored"));

        let headers = AuthHeaders::resolve(None, None);
        assert_eq!(headers, AuthHeaders::default());
        assert!(headers.pairs().is_empty());
    }

    #[tokio::test]
    async fn test_stops_at_first_non_empty_endpoint() {
        let source = Arc::new(FakeSource::new(vec![
            ("/a/E1", Err(500)),
            ("/b/E1", Ok(json!({"photos": []}))),
            ("/c/E1", Ok(json!(["p1", "p2"]))),
            ("/d/E1", Ok(json!(["never"]))),
        ]));
        let fetcher = UploadedSetFetcher::new(source.clone()).with_endpoints(vec![
            "/a/{event_id}".to_string(),
            "/b/{event_id}".to_string(),
            "/c/{event_id}".to_string(),
            "/d/{event_id}".to_string(),
        ]);
        let headers = AuthHeaders {
            bearer: Some("tok".to_string()),
            csrf: None,
        };

        let ids = fetcher.fetch_uploaded_ids("E1", &headers, None).await;
        assert_eq!(ids, set(&["p1", "p2"]));
        assert_eq!(*source.hits.lock().unwrap(), vec!["/a/E1", "/b/E1", "/c/E1"]);
        assert!(source
            .seen_headers
            .lock()
            .unwrap()
            .iter()
            .all(|h| h.bearer.as_deref() == Some("tok")));
    }

    #[tokio::test]
    async fn test_falls_back_to_page_markers() {
        let source = Arc::new(FakeSource::new(vec![]));
        let fetcher = UploadedSetFetcher::new(source);
        let page = PageSignals {
            elements: vec![PageElement {
                dataset: [
                    ("uploaded".to_string(), "true".to_string()),
                    ("photoId".to_string(), "dom-1".to_string()),
                ]
                .into_iter()
                .collect(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let ids = fetcher
            .fetch_uploaded_ids("E1", &AuthHeaders::default(), Some(&page))
            .await;
        assert_eq!(ids, set(&["dom-1"]));
    }

    #[tokio::test]
    async fn test_fail_open_when_everything_fails() {
        let source = Arc::new(FakeSource::new(vec![
            ("/api/events/E1/uploaded-photos", Err(401)),
            ("/api/events/E1/photos/uploaded", Ok(json!({"unexpected": true}))),
            ("/events/E1/uploaded-photos", Ok(json!([]))),
        ]));
        let fetcher = UploadedSetFetcher::new(source.clone());

        let ids = fetcher
            .fetch_uploaded_ids("E1", &AuthHeaders::default(), Some(&PageSignals::default()))
            .await;
        assert!(ids.is_empty());
        assert_eq!(source.hits.lock().unwrap().len(), DEFAULT_UPLOADED_ENDPOINTS.len());
    }

    #[tokio::test]
    async fn test_slow_endpoint_is_abandoned() {
        let fetcher = UploadedSetFetcher::new(Arc::new(HangingSource))
            .with_endpoints(vec!["/slow/{event_id}".to_string()])
            .with_timeout(Duration::from_millis(50));

        let started = std::time::Instant::now();
        let ids = fetcher.fetch_uploaded_ids("E1", &AuthHeaders::default(), None).await;
        assert!(ids.is_empty());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
