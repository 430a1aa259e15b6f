//! Single-assignment token value.
//!
//! The push token arrives once, at an unpredictable time. Consumers either
//! read it synchronously (`get`) or await it (`wait`); nobody registers
//! listeners.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct TokenSlot {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl Default for TokenSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Stores the token. Only the first non-empty value is kept; returns
    /// whether this call assigned it.
    pub fn set(&self, token: impl Into<String>) -> bool {
        let token = token.into();
        if token.is_empty() {
            return false;
        }
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                false
            } else {
                *current = Some(token);
                true
            }
        })
    }

    /// Current value without waiting
    pub fn get(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    pub fn is_set(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Resolves once a token has been assigned
    pub async fn wait(&self) -> String {
        let mut rx = self.tx.subscribe();
        // The sender is owned by self, so the channel cannot close while we wait.
        let token = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone().unwrap_or_default(),
            Err(_) => String::new(),
        };
        token
    }
}
