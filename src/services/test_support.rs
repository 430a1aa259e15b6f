//! In-memory collaborators shared by the service tests.

use crate::error::AppError;
use crate::models::SubscribedEvent;
use crate::services::session::SharedConnection;
use crate::services::auto_upload::{AutoUploadOrchestrator, SweepCancel};
use crate::services::subscribed_events::SubscribedEventsSource;
use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use event_photos::{
    AuthHeaders, FetchError, MediaType, PhotoCandidate, PhotoCandidateScanner, PhotoIdentifier,
    PhotoRef, RemoteJsonSource, ScanError, TransportError, UploadDispatcher, UploadOutcome,
    UploadScope, UploadTransport, UploadedSetFetcher,
};
use photoshare_auth::{FlagProbe, GateConfig, IdentityReadinessGate, StaticIdentity, UserIdentity};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn candidate(id: &str) -> PhotoCandidate {
    PhotoCandidate {
        id: id.to_string(),
        creation_time: Utc.with_ymd_and_hms(2024, 8, 18, 12, 0, 0).unwrap(),
        filename: format!("{}.jpg", id),
        width: 4000,
        height: 3000,
        media_type: MediaType::Image,
        duration_seconds: 0.0,
        source: format!("/media/{}.jpg", id),
    }
}

/// Per-event canned scan results; optionally cancels the sweep while scanning
#[derive(Default)]
pub struct FakeScanner {
    pub photos: HashMap<String, Vec<&'static str>>,
    pub failing: Vec<String>,
    pub windows: Mutex<Vec<(String, Option<DateTime<Utc>>)>>,
    pub cancel_on_scan: Mutex<Option<SweepCancel>>,
}

#[async_trait]
impl PhotoCandidateScanner for FakeScanner {
    async fn scan(
        &self,
        event_id: &str,
        start: Option<DateTime<Utc>>,
        _end: Option<DateTime<Utc>>,
    ) -> Result<Vec<PhotoCandidate>, ScanError> {
        self.windows
            .lock()
            .unwrap()
            .push((event_id.to_string(), start));
        if let Some(cancel) = self.cancel_on_scan.lock().unwrap().as_ref() {
            cancel.cancel();
        }
        if self.failing.iter().any(|id| id == event_id) {
            return Err(ScanError::PermissionDenied("photos".to_string()));
        }
        Ok(self
            .photos
            .get(event_id)
            .map(|ids| ids.iter().map(|id| candidate(id)).collect())
            .unwrap_or_default())
    }
}

pub fn scanner_with(photos: &[(&str, Vec<&'static str>)]) -> FakeScanner {
    FakeScanner {
        photos: photos
            .iter()
            .map(|(id, p)| (id.to_string(), p.clone()))
            .collect(),
        ..Default::default()
    }
}

/// Answers every endpoint with the same uploaded-id list
pub struct FixedUploaded(pub Vec<&'static str>);

#[async_trait]
impl RemoteJsonSource for FixedUploaded {
    async fn get_json(&self, _url: &str, _headers: &AuthHeaders) -> Result<Value, FetchError> {
        if self.0.is_empty() {
            Err(FetchError::Status(404))
        } else {
            Ok(json!({ "uploadedPhotoIds": self.0 }))
        }
    }
}

/// Reports nothing uploaded and remembers the bearer of every lookup
#[derive(Default)]
pub struct RecordingUploaded {
    pub bearers: Mutex<Vec<Option<String>>>,
}

#[async_trait]
impl RemoteJsonSource for RecordingUploaded {
    async fn get_json(&self, _url: &str, headers: &AuthHeaders) -> Result<Value, FetchError> {
        self.bearers.lock().unwrap().push(headers.bearer.clone());
        Ok(json!([]))
    }
}

/// Unexpired JWT for `sub`
pub fn live_jwt(sub: &str) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let exp = Utc::now().timestamp() + 3600;
    format!(
        "{}.{}.sig",
        engine.encode(br#"{"alg":"HS256"}"#),
        engine.encode(format!(r#"{{"sub":"{}","exp":{}}}"#, sub, exp))
    )
}

pub fn shared_db() -> SharedConnection {
    let conn = Connection::open_in_memory().unwrap();
    crate::database::schema::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

#[derive(Default)]
pub struct RecordingTransport {
    pub calls: AtomicUsize,
    pub scopes: Mutex<Vec<UploadScope>>,
    pub batches: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl UploadTransport for RecordingTransport {
    async fn upload_batch(
        &self,
        scope: &UploadScope,
        photos: &[PhotoRef],
    ) -> Result<Vec<(PhotoIdentifier, UploadOutcome)>, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scopes.lock().unwrap().push(scope.clone());
        self.batches
            .lock()
            .unwrap()
            .push(photos.iter().map(|p| p.id.clone()).collect());
        Ok(photos
            .iter()
            .map(|p| (p.id.clone(), UploadOutcome::Uploaded))
            .collect())
    }
}

/// Subscribed events; `None` makes the listing fail
pub struct FakeEvents(pub Option<Vec<SubscribedEvent>>);

#[async_trait]
impl SubscribedEventsSource for FakeEvents {
    async fn list_subscribed_events(&self) -> Result<Vec<SubscribedEvent>, AppError> {
        self.0
            .clone()
            .ok_or_else(|| AppError::Network("events API unreachable".to_string()))
    }
}

pub fn subscribed(id: &str, name: &str) -> SubscribedEvent {
    SubscribedEvent {
        event_id: id.to_string(),
        name: name.to_string(),
        start_time: Some("2024-08-18T10:00:00Z".to_string()),
        end_time: Some("2024-08-18T22:00:00Z".to_string()),
        timezone: None,
    }
}

pub struct Harness {
    pub orchestrator: AutoUploadOrchestrator,
    pub scanner: Arc<FakeScanner>,
    pub transport: Arc<RecordingTransport>,
}

pub fn harness(
    scanner: FakeScanner,
    uploaded: Vec<&'static str>,
    events: Option<Vec<SubscribedEvent>>,
    signed_in: bool,
) -> Harness {
    let scanner = Arc::new(scanner);
    let transport = Arc::new(RecordingTransport::default());

    let flag = FlagProbe::new();
    flag.set_ready(signed_in);
    let identity = signed_in.then(|| UserIdentity {
        user_id: "u1".to_string(),
        token: "bearer-1".to_string(),
        issued_context: None,
    });
    let gate = IdentityReadinessGate::new(GateConfig {
        max_attempts: 2,
        retry_delay: Duration::from_millis(1),
    })
    .with_probe(Arc::new(flag))
    .with_identity_provider(Arc::new(StaticIdentity(identity)));

    let fetcher = UploadedSetFetcher::new(Arc::new(FixedUploaded(uploaded)))
        .with_endpoints(vec!["/api/events/{event_id}/uploaded-photos".to_string()]);

    let orchestrator = AutoUploadOrchestrator::new(
        scanner.clone(),
        fetcher,
        UploadDispatcher::new(transport.clone()),
        Arc::new(gate),
        Arc::new(FakeEvents(events)),
    );

    Harness {
        orchestrator,
        scanner,
        transport,
    }
}
