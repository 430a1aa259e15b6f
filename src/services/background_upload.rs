use crate::services::auto_upload::{AutoUploadOrchestrator, SweepResults};
use chrono::Utc;
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

const SESSION_LOG_CAP: usize = 500;

/// In-memory session log entry (volatile, lost on app restart)
#[derive(Debug, Clone, PartialEq)]
pub struct SweepLogEntry {
    pub ts_ms: i64,
    pub events_checked: usize,
    pub events_failed: usize,
    pub photos_uploaded: usize,
    pub photos_duplicate: usize,
    pub photos_failed: usize,
}

impl SweepLogEntry {
    fn from_results(results: &SweepResults) -> Self {
        let mut entry = SweepLogEntry {
            ts_ms: Utc::now().timestamp_millis(),
            events_checked: results.len(),
            events_failed: 0,
            photos_uploaded: 0,
            photos_duplicate: 0,
            photos_failed: 0,
        };
        for (_, result) in results {
            match result {
                Ok(batch) => {
                    entry.photos_uploaded += batch.uploaded_count;
                    entry.photos_duplicate += batch.duplicate_count;
                    entry.photos_failed += batch.failed_count;
                }
                Err(_) => entry.events_failed += 1,
            }
        }
        entry
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Runs the subscribed-events sweep on a fixed interval
pub struct BackgroundUploader {
    orchestrator: Arc<AutoUploadOrchestrator>,
    interval: Duration,
    retry_delay: Duration,
    running: Arc<AtomicBool>,
    next_sweep_at: Arc<AtomicU64>, // epoch ms of next planned sweep
    log: Arc<Mutex<Vec<SweepLogEntry>>>,
    wake: Arc<Notify>,
}

impl BackgroundUploader {
    pub fn new(
        orchestrator: Arc<AutoUploadOrchestrator>,
        interval: Duration,
        retry_delay: Duration,
    ) -> Self {
        Self {
            orchestrator,
            interval,
            retry_delay,
            running: Arc::new(AtomicBool::new(false)),
            next_sweep_at: Arc::new(AtomicU64::new(0)),
            log: Arc::new(Mutex::new(Vec::new())),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Starts the sweep loop on the current tokio runtime.
    /// Returns `None` when the loop is already running.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if self.running.swap(true, Ordering::SeqCst) {
            log::warn!("Background upload already running");
            return None;
        }

        log::info!(
            "Starting background upload with {} second interval",
            self.interval.as_secs()
        );

        let orchestrator = self.orchestrator.clone();
        let running = self.running.clone();
        let next_sweep_at = self.next_sweep_at.clone();
        let session_log = self.log.clone();
        let wake = self.wake.clone();
        let interval = self.interval;
        let retry_delay = self.retry_delay;

        Some(tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                let delay = match orchestrator.check_all_subscribed_events().await {
                    Ok(results) => {
                        let entry = SweepLogEntry::from_results(&results);
                        log::info!("Background sweep completed: {:?}", entry);
                        append_log(&session_log, entry);
                        interval
                    }
                    Err(e) => {
                        log::error!("Background sweep error: {}", e);
                        with_jitter(retry_delay)
                    }
                };

                if !running.load(Ordering::SeqCst) {
                    break;
                }
                next_sweep_at.store(now_ms() + delay.as_millis() as u64, Ordering::SeqCst);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = wake.notified() => {}
                }
            }

            next_sweep_at.store(0, Ordering::SeqCst);
            log::info!("Background upload stopped");
        }))
    }

    /// Stops the loop; a running sweep is cancelled before its next event
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            log::info!("Stopping background upload");
            self.orchestrator.cancel_sweep();
            self.wake.notify_one();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn next_sweep_eta_seconds(&self) -> Option<u64> {
        if !self.is_running() {
            return None;
        }
        let now = now_ms();
        let target = self.next_sweep_at.load(Ordering::SeqCst);
        if target == 0 || target <= now {
            Some(0)
        } else {
            Some((target - now) / 1000)
        }
    }

    pub fn interval_seconds(&self) -> u64 {
        self.interval.as_secs()
    }

    pub fn session_log(&self) -> Vec<SweepLogEntry> {
        match self.log.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => Vec::new(),
        }
    }
}

fn append_log(store: &Mutex<Vec<SweepLogEntry>>, entry: SweepLogEntry) {
    if let Ok(mut guard) = store.lock() {
        guard.push(entry);
        let len = guard.len();
        if len > SESSION_LOG_CAP {
            guard.drain(0..len - SESSION_LOG_CAP);
        }
    }
}

/// Retry delay plus up to 10% random jitter
fn with_jitter(delay: Duration) -> Duration {
    let max_jitter = delay.as_millis() as u64 / 10;
    if max_jitter == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::rng().random_range(0..=max_jitter))
}
