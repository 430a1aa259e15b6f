//! Token registration handlers.
//!
//! The application installs whatever handler it currently has; the gate tries
//! handlers in order (primary first, then the legacy name).

use crate::models::Availability;
use async_trait::async_trait;
use event_photos::EventContext;
use std::sync::{Arc, RwLock};

/// Error type for a single registration attempt
#[derive(Debug)]
pub enum RegistrationError {
    HandlerUnavailable(String),
    Rejected(String),
}

impl std::fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationError::HandlerUnavailable(name) => {
                write!(f, "Token handler '{}' is not available", name)
            }
            RegistrationError::Rejected(msg) => write!(f, "Token registration rejected: {}", msg),
        }
    }
}

impl std::error::Error for RegistrationError {}

#[async_trait]
pub trait TokenRegistrar: Send + Sync {
    fn name(&self) -> &str;

    fn availability(&self) -> Availability {
        Availability::Available
    }

    async fn register_token(
        &self,
        token: &str,
        context: Option<&EventContext>,
    ) -> Result<(), RegistrationError>;
}

pub type TokenHandler =
    Arc<dyn Fn(&str, Option<&EventContext>) -> Result<(), String> + Send + Sync>;

/// A named slot the application can install a handler into at any time
pub struct HandlerSlot {
    name: String,
    handler: RwLock<Option<TokenHandler>>,
}

impl HandlerSlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler: RwLock::new(None),
        }
    }

    pub fn install(&self, handler: TokenHandler) {
        if let Ok(mut guard) = self.handler.write() {
            *guard = Some(handler);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.handler.write() {
            *guard = None;
        }
    }

    fn current(&self) -> Option<TokenHandler> {
        self.handler.read().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl TokenRegistrar for HandlerSlot {
    fn name(&self) -> &str {
        &self.name
    }

    fn availability(&self) -> Availability {
        if self.current().is_some() {
            Availability::Available
        } else {
            Availability::Unavailable
        }
    }

    async fn register_token(
        &self,
        token: &str,
        context: Option<&EventContext>,
    ) -> Result<(), RegistrationError> {
        let handler = self
            .current()
            .ok_or_else(|| RegistrationError::HandlerUnavailable(self.name.clone()))?;
        handler(token, context).map_err(RegistrationError::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_handler_slot_lifecycle() {
        let slot = HandlerSlot::new("registerPushToken");
        assert_eq!(slot.availability(), Availability::Unavailable);
        assert!(matches!(
            slot.register_token("t", None).await,
            Err(RegistrationError::HandlerUnavailable(_))
        ));

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        slot.install(Arc::new(move |token, context| {
            sink.lock().unwrap().push((token.to_string(), context.map(|c| c.event_id.clone())));
            Ok(())
        }));
        assert_eq!(slot.availability(), Availability::Available);

        let context = EventContext::new("E7");
        slot.register_token("fcm-token", Some(&context)).await.unwrap();
        assert_eq!(
            *received.lock().unwrap(),
            vec![("fcm-token".to_string(), Some("E7".to_string()))]
        );

        slot.clear();
        assert_eq!(slot.availability(), Availability::Unavailable);
    }

    #[tokio::test]
    async fn test_handler_rejection_is_reported() {
        let slot = HandlerSlot::new("registerFCMToken");
        slot.install(Arc::new(|_, _| Err("user not signed in".to_string())));

        let err = slot.register_token("t", None).await.unwrap_err();
        assert!(err.to_string().contains("user not signed in"));
    }
}
