pub mod auto_upload;
pub mod background_upload;
pub mod event_context;
pub mod platform;
pub mod session;
pub mod subscribed_events;
pub mod user_context_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use auto_upload::{AutoUploadOrchestrator, SweepCancel, SweepResults, IDENTITY_NOT_READY};
pub use background_upload::{BackgroundUploader, SweepLogEntry};
pub use event_context::{event_id_from_path, resolve_event_context};
pub use platform::{NetworkProbe, NetworkState, PageSignalsProvider, PageSlot};
pub use session::{SharedConnection, StoredIdentityProvider, StoredSessionProbe};
pub use subscribed_events::{HttpEventsSource, SubscribedEventsSource};
