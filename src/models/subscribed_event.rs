use event_photos::{parse_event_time, EventContext};
use serde::{Deserialize, Serialize};

/// An event the user joined, as listed by the user-events API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscribedEvent {
    pub event_id: String,
    #[serde(default)]
    pub name: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Response body of the user-events API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscribedEventsResponse {
    #[serde(default)]
    pub events: Vec<SubscribedEvent>,
}

impl SubscribedEvent {
    pub fn to_context(&self) -> EventContext {
        let parse = |field: &str, value: &Option<String>| {
            let raw = value.as_deref()?;
            let parsed = parse_event_time(raw);
            if parsed.is_none() {
                log::warn!("Event {}: unparseable {} '{}'", self.event_id, field, raw);
            }
            parsed
        };

        EventContext {
            event_id: self.event_id.clone(),
            event_name: if self.name.is_empty() {
                "Event".to_string()
            } else {
                self.name.clone()
            },
            start_time: parse("start_time", &self.start_time),
            end_time: parse("end_time", &self.end_time),
            timezone: self.timezone.clone().filter(|tz| !tz.is_empty()),
        }
    }
}
