//! # PhotoShare Auth
//!
//! Identity readiness for the PhotoShare auto-upload pipeline.
//!
//! This crate provides:
//! - A bounded readiness gate that polls authentication probes
//! - Push token registration once the user is signed in
//! - A single-assignment token slot awaited by any number of consumers
//! - Lightweight JWT inspection (expiry and subject)
//!
//! ## Separation of Concerns
//!
//! This crate does **not** sign users in or store credentials. The
//! application supplies probes, identity providers and token handlers.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use photoshare_auth::{FlagProbe, GateConfig, HandlerSlot, IdentityReadinessGate};
//!
//! let bridge = FlagProbe::new();
//! let gate = IdentityReadinessGate::new(GateConfig::default())
//!     .with_probe(Arc::new(bridge.clone()))
//!     .with_registrar(Arc::new(HandlerSlot::new("registerFCMToken")));
//!
//! let registered = gate.await_ready(&token, Some(&event)).await;
//! ```

pub mod gate;
pub mod jwt;
pub mod models;
pub mod probe;
pub mod registrar;
pub mod token;

pub use gate::{
    AttemptOutcome, GateConfig, IdentityReadinessGate, PushTokenRegistration, Scheduler,
    TokioScheduler, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY,
};
pub use jwt::AuthError;
pub use models::{Availability, GateState, UserIdentity};
pub use probe::{AuthProbe, FlagProbe, IdentityProvider, ProviderSessionProbe, StaticIdentity};
pub use registrar::{HandlerSlot, RegistrationError, TokenHandler, TokenRegistrar};
pub use token::TokenSlot;
