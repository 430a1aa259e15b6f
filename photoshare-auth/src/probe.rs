//! Authentication state probes.
//!
//! Each probe answers "is the user signed in right now" from one source. The
//! gate ORs them in order.

use crate::jwt;
use crate::models::UserIdentity;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Non-blocking, side-effect-free readiness check
#[async_trait]
pub trait AuthProbe: Send + Sync {
    fn name(&self) -> &str;
    async fn is_ready(&self) -> bool;
}

/// Source of the signed-in user
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_identity(&self) -> Option<UserIdentity>;
}

/// Primary probe: the identity provider has a session with a live token
pub struct ProviderSessionProbe {
    provider: Arc<dyn IdentityProvider>,
}

impl ProviderSessionProbe {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl AuthProbe for ProviderSessionProbe {
    fn name(&self) -> &str {
        "identity-provider-session"
    }

    async fn is_ready(&self) -> bool {
        match self.provider.current_identity().await {
            Some(identity) if !identity.token.is_empty() => {
                // Opaque (non-JWT) tokens are accepted as-is.
                jwt::decode_payload(&identity.token).is_err()
                    || !jwt::is_expired(&identity.token, chrono::Utc::now())
            }
            _ => false,
        }
    }
}

/// Application-level "auth bridge ready" flag, flipped by the host
#[derive(Debug, Clone, Default)]
pub struct FlagProbe {
    ready: Arc<AtomicBool>,
}

impl FlagProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthProbe for FlagProbe {
    fn name(&self) -> &str {
        "auth-bridge-ready"
    }

    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Fixed identity, for hosts that hand over a token once
#[derive(Debug, Clone)]
pub struct StaticIdentity(pub Option<UserIdentity>);

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_identity(&self) -> Option<UserIdentity> {
        self.0.clone()
    }
}
