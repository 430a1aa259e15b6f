//! # PhotoShare Auto-Upload
//!
//! Event-scoped photo reconciliation and upload for the PhotoShare app.
//!
//! Given an event (from the current page or the user's subscriptions), the
//! pipeline scans the device, drops photos already in the event gallery,
//! waits until the user is signed in and uploads the rest. A background
//! sweep repeats this for every subscribed event.
//!
//! The photo side lives in `event_photos`, the identity side in
//! `photoshare_auth`; this crate wires them to configuration, persistence
//! and the PhotoShare API.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod services;

pub use app::App;
pub use config::AppConfig;
pub use error::AppError;
