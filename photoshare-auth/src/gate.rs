//! Identity readiness gate.
//!
//! Polls the auth probes and, once one reports ready, runs the gated action
//! (token registration or identity lookup). Bounded: at most `max_attempts`
//! attempts with `retry_delay` between them. Progress is an explicit
//! `GateState` so the loop cannot re-enter itself or run unbounded.

use crate::models::{Availability, GateState, UserIdentity};
use crate::probe::{AuthProbe, IdentityProvider};
use crate::registrar::TokenRegistrar;
use crate::token::TokenSlot;
use async_trait::async_trait;
use event_photos::EventContext;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(5000);

/// Sleeps between attempts. Injected so tests control time.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// What a single attempt observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    NotReady,
    ActionFailed,
    Succeeded,
}

impl GateState {
    pub fn initial() -> Self {
        GateState::Polling { attempt: 0 }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, GateState::Polling { .. })
    }

    /// Pure transition. Terminal states absorb every outcome.
    pub fn next(self, outcome: AttemptOutcome, max_attempts: u32) -> GateState {
        match self {
            GateState::Polling { attempt } => {
                let attempt = attempt.saturating_add(1);
                match outcome {
                    AttemptOutcome::Succeeded => GateState::Ready,
                    _ if attempt >= max_attempts => GateState::Exhausted,
                    _ => GateState::Polling { attempt },
                }
            }
            terminal => terminal,
        }
    }
}

pub struct IdentityReadinessGate {
    probes: Vec<Arc<dyn AuthProbe>>,
    registrars: Vec<Arc<dyn TokenRegistrar>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    scheduler: Arc<dyn Scheduler>,
    config: GateConfig,
}

impl IdentityReadinessGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            probes: Vec::new(),
            registrars: Vec::new(),
            identity: None,
            scheduler: Arc::new(TokioScheduler),
            config,
        }
    }

    /// Probes are ORed in the order they are added
    pub fn with_probe(mut self, probe: Arc<dyn AuthProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    /// Registrars are tried in the order they are added
    pub fn with_registrar(mut self, registrar: Arc<dyn TokenRegistrar>) -> Self {
        self.registrars.push(registrar);
        self
    }

    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(provider);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// True when any probe reports ready. Stops at the first ready probe.
    pub async fn probe_ready(&self) -> bool {
        for probe in &self.probes {
            if probe.is_ready().await {
                log::debug!("Auth probe '{}' reports ready", probe.name());
                return true;
            }
        }
        false
    }

    /// Waits for auth, then hands the token to the first available registrar.
    /// Returns false when the attempt budget is exhausted.
    pub async fn await_ready(&self, token: &str, context: Option<&EventContext>) -> bool {
        self.drive("Token registration", || self.register_once(token, context))
            .await
            .is_some()
    }

    /// Signed-in identity right now, without waiting
    pub async fn current_identity(&self) -> Option<UserIdentity> {
        let provider = self.identity.as_ref()?;
        provider
            .current_identity()
            .await
            .filter(|identity| !identity.token.is_empty())
    }

    /// Waits for auth, then returns the signed-in identity
    pub async fn await_identity(&self) -> Option<UserIdentity> {
        let Some(provider) = &self.identity else {
            log::warn!("No identity provider configured");
            return None;
        };

        self.drive("Identity lookup", || async move {
            provider
                .current_identity()
                .await
                .filter(|identity| !identity.token.is_empty())
                .ok_or_else(|| "identity not available yet".to_string())
        })
        .await
    }

    /// One registration attempt outside the polling loop, for auth-state
    /// change notifications. Never starts a new loop.
    pub async fn on_auth_state_changed(
        &self,
        token: &str,
        context: Option<&EventContext>,
    ) -> bool {
        if !self.probe_ready().await {
            log::debug!("Auth state changed but no probe is ready");
            return false;
        }
        match self.register_once(token, context).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Re-registration after auth change failed: {}", e);
                false
            }
        }
    }

    async fn register_once(
        &self,
        token: &str,
        context: Option<&EventContext>,
    ) -> Result<(), String> {
        let mut last_error = "no token handler available".to_string();

        for registrar in &self.registrars {
            if registrar.availability() == Availability::Unavailable {
                log::debug!("Token handler '{}' not available", registrar.name());
                continue;
            }
            match registrar.register_token(token, context).await {
                Ok(()) => {
                    log::info!("Push token registered via '{}'", registrar.name());
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("Token handler '{}' failed: {}", registrar.name(), e);
                    last_error = e.to_string();
                }
            }
        }

        Err(last_error)
    }

    async fn drive<T, F, Fut>(&self, label: &str, mut action: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, String>>,
    {
        let mut state = GateState::initial();
        let mut result = None;

        loop {
            let GateState::Polling { attempt } = state else {
                break;
            };

            let outcome = if !self.probe_ready().await {
                log::debug!(
                    "{}: not authenticated yet (attempt {}/{})",
                    label,
                    attempt + 1,
                    self.config.max_attempts
                );
                AttemptOutcome::NotReady
            } else {
                match action().await {
                    Ok(value) => {
                        result = Some(value);
                        AttemptOutcome::Succeeded
                    }
                    Err(e) => {
                        log::warn!("{}: attempt {} failed: {}", label, attempt + 1, e);
                        AttemptOutcome::ActionFailed
                    }
                }
            };

            state = state.next(outcome, self.config.max_attempts);
            if !state.is_terminal() {
                self.scheduler.sleep(self.config.retry_delay).await;
            }
        }

        match state {
            GateState::Ready => log::info!("{}: ready", label),
            _ => log::warn!(
                "{}: gave up after {} attempts",
                label,
                self.config.max_attempts
            ),
        }
        result
    }
}

/// Waits for the push token, then registers it through the gate.
/// The token stays in the slot when the gate gives up, so a later
/// auth-state change can still register it.
pub struct PushTokenRegistration {
    slot: TokenSlot,
    gate: Arc<IdentityReadinessGate>,
}

impl PushTokenRegistration {
    pub fn new(slot: TokenSlot, gate: Arc<IdentityReadinessGate>) -> Self {
        Self { slot, gate }
    }

    pub fn token(&self) -> Option<String> {
        self.slot.get()
    }

    pub async fn run(&self, context: Option<EventContext>) -> bool {
        let token = self.slot.wait().await;
        log::info!("Push token received, waiting for authentication");
        self.gate.await_ready(&token, context.as_ref()).await
    }

    pub async fn on_auth_state_changed(&self, context: Option<&EventContext>) -> bool {
        match self.slot.get() {
            Some(token) => self.gate.on_auth_state_changed(&token, context).await,
            None => false,
        }
    }
}
