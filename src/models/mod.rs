pub mod subscribed_event;
pub mod user_context;

pub use subscribed_event::{SubscribedEvent, SubscribedEventsResponse};
pub use user_context::{AutoUploadSettings, UserContext};
