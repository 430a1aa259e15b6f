//! Batched photo upload for one event.
//!
//! The dispatcher hands a whole batch to an `UploadTransport` and turns what
//! comes back into an `UploadBatchResult` whose counts always add up to the
//! number of photos submitted.

use crate::models::{PhotoCandidate, PhotoIdentifier, PhotoRef, UploadBatchResult, UploadOutcome};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Reason recorded for a photo the transport said nothing about
pub const NO_OUTCOME_REPORTED: &str = "no outcome reported";

/// Whole-batch transport failure
#[derive(Debug)]
pub enum TransportError {
    Connection(String),
    Unauthorized(String),
    Other(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Connection(msg) => write!(f, "Connection error: {}", msg),
            TransportError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            TransportError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// The event a batch belongs to and the credential it is uploaded with
#[derive(Debug, Clone, PartialEq)]
pub struct UploadScope {
    pub event_id: String,
    pub event_name: String,
    pub bearer_token: Option<String>,
}

impl UploadScope {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            event_name: "Event".to_string(),
            bearer_token: None,
        }
    }
}

/// Native or remote upload channel
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn upload_batch(
        &self,
        scope: &UploadScope,
        photos: &[PhotoRef],
    ) -> Result<Vec<(PhotoIdentifier, UploadOutcome)>, TransportError>;
}

/// Submits photos and aggregates per-photo outcomes
pub struct UploadDispatcher {
    transport: Arc<dyn UploadTransport>,
}

impl UploadDispatcher {
    pub fn new(transport: Arc<dyn UploadTransport>) -> Self {
        Self { transport }
    }

    pub async fn dispatch(
        &self,
        scope: &UploadScope,
        photos: &[PhotoCandidate],
    ) -> UploadBatchResult {
        let event_id = scope.event_id.as_str();
        if photos.is_empty() {
            return UploadBatchResult::empty();
        }

        let refs: Vec<PhotoRef> = photos.iter().map(PhotoRef::from).collect();
        log::info!("Dispatching {} photos for event {}", refs.len(), event_id);

        let reported = match self.transport.upload_batch(scope, &refs).await {
            Ok(reported) => reported,
            Err(e) => {
                log::error!("Upload batch for event {} failed: {}", event_id, e);
                return UploadBatchResult::all_failed(
                    photos.iter().map(|p| p.id.as_str()),
                    &e.to_string(),
                );
            }
        };

        let result = UploadBatchResult::from_outcomes(align_outcomes(photos, reported));
        log::info!("Event {}: {}", event_id, result.summary());
        result
    }
}

/// Orders reported outcomes by the submitted photos; missing ones count as failed.
/// Repeated ids consume their reported outcomes in order.
fn align_outcomes(
    photos: &[PhotoCandidate],
    reported: Vec<(PhotoIdentifier, UploadOutcome)>,
) -> Vec<(PhotoIdentifier, UploadOutcome)> {
    let mut by_id: HashMap<PhotoIdentifier, VecDeque<UploadOutcome>> =
        HashMap::with_capacity(reported.len());
    for (id, outcome) in reported {
        by_id.entry(id).or_default().push_back(outcome);
    }

    photos
        .iter()
        .map(|photo| {
            let next = by_id.get_mut(&photo.id).and_then(|queue| queue.pop_front());
            let outcome = next.unwrap_or_else(|| {
                log::warn!("Transport reported nothing for photo {}", photo.id);
                UploadOutcome::Failed(NO_OUTCOME_REPORTED.to_string())
            });
            (photo.id.clone(), outcome)
        })
        .collect()
}

/// Replaces characters that are unsafe in a remote file name
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "photo.jpg".to_string()
    } else {
        cleaned
    }
}

/// Settings for the HTTP upload transport
#[cfg(feature = "sync")]
#[derive(Debug, Clone)]
pub struct HttpUploadConfig {
    pub upload_url: String,
    pub api_key: Option<String>,
    pub device_id: String,
    pub pause_between: Duration,
}

/// Posts each photo as base64 JSON to the mobile upload endpoint
#[cfg(feature = "sync")]
pub struct HttpUploadTransport {
    client: reqwest::Client,
    config: HttpUploadConfig,
}

#[cfg(feature = "sync")]
impl HttpUploadTransport {
    pub fn new(config: HttpUploadConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(300))
            .user_agent("PhotoShareAutoUpload/0.1.0")
            .build()
            .map_err(|e| TransportError::Other(format!("Client build failed: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Request body for one photo
    pub fn request_body(
        &self,
        scope: &UploadScope,
        photo: &PhotoRef,
        data: &[u8],
    ) -> serde_json::Value {
        use base64::Engine as _;

        serde_json::json!({
            "eventId": scope.event_id,
            "fileName": sanitize_file_name(&photo.filename),
            "fileData": base64::engine::general_purpose::STANDARD.encode(data),
            "mediaType": photo.media_type.api_name(),
            "originalTimestamp": photo
                .creation_time
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string(),
            "deviceId": self.config.device_id,
            "metadata": {
                "source": "multi-event-auto-upload",
                "hash": photo.id,
                "eventName": scope.event_name,
            },
        })
    }

    async fn upload_one(
        &self,
        scope: &UploadScope,
        photo: &PhotoRef,
    ) -> Result<UploadOutcome, TransportError> {
        let data = match tokio::fs::read(&photo.source).await {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Failed to read photo {}: {}", photo.source, e);
                return Ok(UploadOutcome::Failed(format!("read failed: {}", e)));
            }
        };

        let mut request = self
            .client
            .post(&self.config.upload_url)
            .header("X-Client-Platform", std::env::consts::OS)
            .header("X-Upload-Source", "native-plugin")
            .header("X-Client-Version", env!("CARGO_PKG_VERSION"))
            .json(&self.request_body(scope, photo, &data));
        if let Some(token) = &scope.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(key) = &self.config.api_key {
            request = request.header("apikey", key);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if e.is_connect() || e.is_timeout() => {
                return Err(TransportError::Connection(e.to_string()));
            }
            Err(e) => return Ok(UploadOutcome::Failed(e.to_string())),
        };

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(TransportError::Unauthorized(format!(
                "upload rejected with {}",
                status
            )));
        }
        if status.as_u16() == 409 {
            return Ok(UploadOutcome::Duplicate);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Upload of {} failed: {} - {}", photo.filename, status, body);
            return Ok(UploadOutcome::Failed(format!("HTTP {}", status.as_u16())));
        }

        let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
        if body.get("duplicate").and_then(|v| v.as_bool()) == Some(true) {
            Ok(UploadOutcome::Duplicate)
        } else {
            Ok(UploadOutcome::Uploaded)
        }
    }
}

#[cfg(feature = "sync")]
#[async_trait]
impl UploadTransport for HttpUploadTransport {
    async fn upload_batch(
        &self,
        scope: &UploadScope,
        photos: &[PhotoRef],
    ) -> Result<Vec<(PhotoIdentifier, UploadOutcome)>, TransportError> {
        upload_in_order(photos, self.config.pause_between, |photo| {
            self.upload_one(scope, photo)
        })
        .await
    }
}

/// Uploads photos one after another.
///
/// A transport error on the first photo fails the batch. Later errors keep the
/// outcomes already earned and mark the current and remaining photos failed.
#[cfg_attr(not(feature = "sync"), allow(dead_code))]
async fn upload_in_order<'a, F, Fut>(
    photos: &'a [PhotoRef],
    pause_between: Duration,
    mut upload_one: F,
) -> Result<Vec<(PhotoIdentifier, UploadOutcome)>, TransportError>
where
    F: FnMut(&'a PhotoRef) -> Fut,
    Fut: Future<Output = Result<UploadOutcome, TransportError>>,
{
    let total = photos.len();
    let mut outcomes = Vec::with_capacity(total);

    for (index, photo) in photos.iter().enumerate() {
        let outcome = match upload_one(photo).await {
            Ok(outcome) => outcome,
            Err(e) if outcomes.is_empty() => return Err(e),
            Err(e) => {
                log::error!("Upload stopped at photo {}/{}: {}", index + 1, total, e);
                let reason = e.to_string();
                outcomes.extend(
                    photos[index..]
                        .iter()
                        .map(|p| (p.id.clone(), UploadOutcome::Failed(reason.clone()))),
                );
                return Ok(outcomes);
            }
        };
        log::debug!("Photo {}/{} ({}): {:?}", index + 1, total, photo.filename, outcome);
        outcomes.push((photo.id.clone(), outcome));

        if index + 1 < total && !pause_between.is_zero() {
            tokio::time::sleep(pause_between).await;
        }
    }

    Ok(outcomes)
}
