//! Host-side collaborators the orchestrator reads from.

use async_trait::async_trait;
use event_photos::PageSignals;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Connectivity check used by the wifi-only guard
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn is_wifi(&self) -> bool;
}

/// The page currently shown by the host, if any
pub trait PageSignalsProvider: Send + Sync {
    fn current_page(&self) -> Option<PageSignals>;
}

/// Network state pushed in by the host
#[derive(Debug, Clone)]
pub struct NetworkState {
    wifi: Arc<AtomicBool>,
}

impl NetworkState {
    pub fn new(wifi: bool) -> Self {
        Self {
            wifi: Arc::new(AtomicBool::new(wifi)),
        }
    }

    pub fn set_wifi(&self, wifi: bool) {
        self.wifi.store(wifi, Ordering::SeqCst);
    }
}

#[async_trait]
impl NetworkProbe for NetworkState {
    async fn is_wifi(&self) -> bool {
        self.wifi.load(Ordering::SeqCst)
    }
}

/// Latest page snapshot pushed in by the host
#[derive(Debug, Clone, Default)]
pub struct PageSlot {
    page: Arc<RwLock<Option<PageSignals>>>,
}

impl PageSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, page: Option<PageSignals>) {
        if let Ok(mut guard) = self.page.write() {
            *guard = page;
        }
    }
}

impl PageSignalsProvider for PageSlot {
    fn current_page(&self) -> Option<PageSignals> {
        self.page.read().ok().and_then(|guard| guard.clone())
    }
}
