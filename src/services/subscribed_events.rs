//! Lists the events the signed-in user has joined.

use crate::error::AppError;
use crate::models::{SubscribedEvent, SubscribedEventsResponse};
use async_trait::async_trait;
use photoshare_auth::{IdentityProvider, UserIdentity};
use std::sync::Arc;
use std::time::Duration;

const USER_EVENTS_ENDPOINT: &str = "/functions/v1/api-auto-upload-user-events";

#[async_trait]
pub trait SubscribedEventsSource: Send + Sync {
    async fn list_subscribed_events(&self) -> Result<Vec<SubscribedEvent>, AppError>;
}

/// User-events API client; credentials come from the identity provider on
/// every call
pub struct HttpEventsSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    identity: Arc<dyn IdentityProvider>,
}

impl HttpEventsSource {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        identity: Arc<dyn IdentityProvider>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("PhotoShareAutoUpload/0.1.0")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            identity,
        })
    }

    fn events_request(&self, identity: &UserIdentity) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), USER_EVENTS_ENDPOINT);
        let mut request = self
            .client
            .get(url)
            .query(&[("user_id", identity.user_id.as_str())])
            .bearer_auth(&identity.token)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        request
    }
}

#[async_trait]
impl SubscribedEventsSource for HttpEventsSource {
    async fn list_subscribed_events(&self) -> Result<Vec<SubscribedEvent>, AppError> {
        let identity = self
            .identity
            .current_identity()
            .await
            .ok_or_else(|| AppError::Validation("No signed-in user".to_string()))?;

        log::debug!("Fetching subscribed events for {}", identity.user_id);
        let response = self.events_request(&identity).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Network(format!(
                "Failed to fetch events: HTTP {} - {}",
                status.as_u16(),
                body
            )));
        }

        let body: SubscribedEventsResponse = response.json().await?;
        log::info!(
            "User {} has {} subscribed events",
            identity.user_id,
            body.events.len()
        );
        Ok(body.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photoshare_auth::StaticIdentity;

    fn identity(user_id: &str) -> UserIdentity {
        UserIdentity {
            user_id: user_id.to_string(),
            token: "jwt".to_string(),
            issued_context: None,
        }
    }

    #[test]
    fn test_events_request() {
        let source = HttpEventsSource::new(
            "https://photos.example.com/",
            Some("anon".to_string()),
            Arc::new(StaticIdentity(None)),
            Duration::from_secs(5),
        )
        .unwrap();

        let request = source.events_request(&identity("u-42")).build().unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://photos.example.com/functions/v1/api-auto-upload-user-events?user_id=u-42"
        );
        assert_eq!(request.headers()["authorization"], "Bearer jwt");
        assert_eq!(request.headers()["apikey"], "anon");

        let request = source.events_request(&identity("a&b=c d")).build().unwrap();
        assert_eq!(request.url().query(), Some("user_id=a%26b%3Dc+d"));
    }

    #[tokio::test]
    async fn test_signed_out_is_an_error() {
        let source = HttpEventsSource::new(
            "http://localhost:1",
            None,
            Arc::new(StaticIdentity(None)),
            Duration::from_secs(1),
        )
        .unwrap();

        let result = source.list_subscribed_events().await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
