//! Auto-upload orchestration.
//!
//! One event check: resolve context, scan the device and fetch the uploaded
//! ids concurrently, drop what is already uploaded, wait for the user's
//! identity, dispatch the rest. The sweep repeats that for every subscribed
//! event and never lets one event's failure stop the others.

use crate::error::AppError;
use crate::models::AutoUploadSettings;
use crate::services::event_context::resolve_event_context;
use crate::services::platform::{NetworkProbe, NetworkState, PageSignalsProvider, PageSlot};
use crate::services::subscribed_events::SubscribedEventsSource;
use event_photos::{
    partition, AuthHeaders, EventContext, PageSignals, PhotoCandidateScanner, UploadBatchResult,
    UploadDispatcher, UploadScope, UploadedSetFetcher,
};
use photoshare_auth::IdentityReadinessGate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

/// Failure reason recorded for every photo when no identity became available
pub const IDENTITY_NOT_READY: &str = "identity_not_ready";

pub type SweepResults = Vec<(String, Result<UploadBatchResult, AppError>)>;

/// Cancels an in-flight sweep between events
#[derive(Debug, Clone, Default)]
pub struct SweepCancel {
    flag: Arc<AtomicBool>,
}

impl SweepCancel {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

pub struct AutoUploadOrchestrator {
    scanner: Arc<dyn PhotoCandidateScanner>,
    fetcher: UploadedSetFetcher,
    dispatcher: UploadDispatcher,
    gate: Arc<IdentityReadinessGate>,
    events: Arc<dyn SubscribedEventsSource>,
    pages: Arc<dyn PageSignalsProvider>,
    network: Arc<dyn NetworkProbe>,
    settings: RwLock<AutoUploadSettings>,
    cancel: SweepCancel,
    progress: watch::Sender<(usize, usize)>,
}

impl AutoUploadOrchestrator {
    pub fn new(
        scanner: Arc<dyn PhotoCandidateScanner>,
        fetcher: UploadedSetFetcher,
        dispatcher: UploadDispatcher,
        gate: Arc<IdentityReadinessGate>,
        events: Arc<dyn SubscribedEventsSource>,
    ) -> Self {
        let (progress, _rx) = watch::channel((0, 0));
        Self {
            scanner,
            fetcher,
            dispatcher,
            gate,
            events,
            pages: Arc::new(PageSlot::new()),
            network: Arc::new(NetworkState::new(true)),
            settings: RwLock::new(AutoUploadSettings {
                auto_upload_enabled: true,
                ..Default::default()
            }),
            cancel: SweepCancel::default(),
            progress,
        }
    }

    pub fn with_page_provider(mut self, pages: Arc<dyn PageSignalsProvider>) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_network_probe(mut self, network: Arc<dyn NetworkProbe>) -> Self {
        self.network = network;
        self
    }

    pub fn with_settings(self, settings: AutoUploadSettings) -> Self {
        self.update_settings(settings);
        self
    }

    pub fn update_settings(&self, settings: AutoUploadSettings) {
        if let Ok(mut guard) = self.settings.write() {
            *guard = settings;
        }
    }

    pub fn settings(&self) -> AutoUploadSettings {
        self.settings
            .read()
            .map(|guard| *guard)
            .unwrap_or_default()
    }

    /// Event context of the page the host is currently showing
    pub fn resolve_current_event_context(&self) -> Option<EventContext> {
        self.pages
            .current_page()
            .and_then(|page| resolve_event_context(&page))
    }

    /// Scans and uploads new photos for one event
    pub async fn check_event(&self, event_id: &str) -> Result<UploadBatchResult, AppError> {
        if event_id.trim().is_empty() {
            return Err(AppError::Validation("event id must not be empty".to_string()));
        }

        let page = self.pages.current_page();
        let context = self.context_for(event_id, page.as_ref()).await;
        self.check_context(&context, page.as_ref()).await
    }

    /// Checks every subscribed event in turn. Per-event failures are recorded
    /// in the result list; only the event listing itself can fail the sweep.
    pub async fn check_all_subscribed_events(&self) -> Result<SweepResults, AppError> {
        self.cancel.reset();

        let settings = self.settings();
        if !settings.auto_upload_enabled {
            log::info!("Auto-upload disabled, skipping sweep");
            return Ok(Vec::new());
        }
        if settings.wifi_only_upload && !self.network.is_wifi().await {
            log::info!("Wi-Fi only upload enabled and not on Wi-Fi, skipping sweep");
            return Ok(Vec::new());
        }

        let events = self.events.list_subscribed_events().await?;
        let total = events.len();
        log::info!("Checking {} subscribed events", total);
        self.progress.send_replace((0, total));

        let mut results = Vec::with_capacity(total);
        for (index, event) in events.iter().enumerate() {
            if self.cancel.is_cancelled() {
                log::info!("Sweep cancelled after {} of {} events", index, total);
                break;
            }

            let context = event.to_context();
            let result = self.check_context(&context, None).await;
            match &result {
                Ok(batch) => log::info!("Event {}: {}", event.event_id, batch.summary()),
                Err(e) => log::error!("Event {} failed: {}", event.event_id, e),
            }
            results.push((event.event_id.clone(), result));
            self.progress.send_replace((index + 1, total));
        }

        Ok(results)
    }

    /// Stops the running sweep before its next event
    pub fn cancel_sweep(&self) {
        log::info!("Sweep cancellation requested");
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> SweepCancel {
        self.cancel.clone()
    }

    /// Sweep progress as (events done, events total)
    pub fn subscribe_progress(&self) -> watch::Receiver<(usize, usize)> {
        self.progress.subscribe()
    }

    async fn context_for(&self, event_id: &str, page: Option<&PageSignals>) -> EventContext {
        if let Some(context) = page
            .and_then(resolve_event_context)
            .filter(|context| context.event_id == event_id)
        {
            return context;
        }

        match self.events.list_subscribed_events().await {
            Ok(events) => {
                if let Some(event) = events.iter().find(|e| e.event_id == event_id) {
                    return event.to_context();
                }
            }
            Err(e) => log::warn!("Could not list subscribed events: {}", e),
        }

        log::warn!("No metadata for event {}, scanning without a time window", event_id);
        EventContext::new(event_id)
    }

    async fn check_context(
        &self,
        context: &EventContext,
        page: Option<&PageSignals>,
    ) -> Result<UploadBatchResult, AppError> {
        let bearer = self.gate.current_identity().await.map(|identity| identity.token);
        let headers = AuthHeaders::resolve(bearer.as_deref(), page);

        let (scanned, uploaded) = tokio::join!(
            self.scanner
                .scan(&context.event_id, context.start_time, context.end_time),
            self.fetcher
                .fetch_uploaded_ids(&context.event_id, &headers, page),
        );
        let candidates = scanned?;

        let (fresh, already_uploaded) = partition(&candidates, &uploaded);
        log::info!(
            "Event {}: {} photos found, {} already uploaded, {} new",
            context.event_id,
            candidates.len(),
            already_uploaded.len(),
            fresh.len()
        );

        if fresh.is_empty() {
            return Ok(UploadBatchResult::empty());
        }

        let Some(identity) = self.gate.await_identity().await else {
            log::warn!(
                "Event {}: no signed-in user, {} photos not uploaded",
                context.event_id,
                fresh.len()
            );
            return Ok(UploadBatchResult::all_failed(
                fresh.iter().map(|photo| photo.id.as_str()),
                IDENTITY_NOT_READY,
            ));
        };

        let scope = UploadScope {
            event_id: context.event_id.clone(),
            event_name: context.event_name.clone(),
            bearer_token: Some(identity.token),
        };
        Ok(self.dispatcher.dispatch(&scope, &fresh).await)
    }
}
