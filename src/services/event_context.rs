//! Works out which event the current page belongs to.
//!
//! Only the URL path decides whether there is an event at all. The other
//! page signals just fill in name, window and timezone, later sources
//! overriding earlier ones: page-global object, meta tags, stored event,
//! DOM datasets.

use event_photos::{parse_event_time, EventContext, PageSignals};
use serde_json::Value;

/// Event fields as raw strings, before time parsing
#[derive(Debug, Default)]
struct EventFields {
    name: Option<String>,
    start: Option<String>,
    end: Option<String>,
    timezone: Option<String>,
}

impl EventFields {
    fn overlay(&mut self, other: EventFields) {
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.start.is_some() {
            self.start = other.start;
        }
        if other.end.is_some() {
            self.end = other.end;
        }
        if other.timezone.is_some() {
            self.timezone = other.timezone;
        }
    }

    fn from_json(value: &Value) -> EventFields {
        let field = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| value.get(*key))
                .find_map(|v| v.as_str().filter(|s| !s.is_empty()).map(str::to_string))
        };
        EventFields {
            name: field(&["eventName", "name"]),
            start: field(&["startTime", "start_time"]),
            end: field(&["endTime", "end_time"]),
            timezone: field(&["timezone"]),
        }
    }
}

/// Extracts `{id}` from a `/event/{id}` segment; query and fragment are ignored
pub fn event_id_from_path(path: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').collect();

    segments
        .windows(2)
        .find(|pair| pair[0] == "event" && !pair[1].is_empty())
        .map(|pair| pair[1].to_string())
}

/// Resolves the event context of a page, or `None` when the page is not an
/// event page
pub fn resolve_event_context(page: &PageSignals) -> Option<EventContext> {
    let Some(event_id) = event_id_from_path(&page.url_path) else {
        log::debug!("No event context on {}", page.url_path);
        return None;
    };

    let mut fields = EventFields {
        name: page.title.clone().filter(|t| !t.is_empty()),
        ..Default::default()
    };

    if let Some(global) = page.page_event.as_ref().filter(|v| v.is_object()) {
        fields.overlay(EventFields::from_json(global));
    }

    fields.overlay(EventFields {
        name: page.meta("event-name").map(str::to_string),
        start: page.meta("event-start").map(str::to_string),
        end: page.meta("event-end").map(str::to_string),
        timezone: page.meta("event-timezone").map(str::to_string),
    });

    if let Some(raw) = &page.stored_event {
        match serde_json::from_str::<Value>(raw) {
            Ok(stored)
                if stored.get("eventId").and_then(Value::as_str) == Some(event_id.as_str()) =>
            {
                log::debug!("Using stored event data for {}", event_id);
                fields.overlay(EventFields::from_json(&stored));
            }
            Ok(_) => {}
            Err(e) => log::warn!("Ignoring invalid stored event data: {}", e),
        }
    }

    for element in page
        .elements
        .iter()
        .filter(|el| el.data("eventId") == Some(event_id.as_str()))
    {
        fields.overlay(EventFields {
            name: element.data("eventName").map(str::to_string),
            start: element.data("startTime").map(str::to_string),
            end: element.data("endTime").map(str::to_string),
            timezone: element.data("timezone").map(str::to_string),
        });
    }

    let parse = |label: &str, raw: Option<String>| {
        let raw = raw?;
        let parsed = parse_event_time(&raw);
        if parsed.is_none() {
            log::warn!("Event {}: unparseable {} '{}'", event_id, label, raw);
        }
        parsed
    };

    let context = EventContext {
        event_id: event_id.clone(),
        event_name: fields.name.unwrap_or_else(|| "Event".to_string()),
        start_time: parse("start time", fields.start),
        end_time: parse("end time", fields.end),
        timezone: fields.timezone,
    };
    log::info!("Resolved event context {} ({})", context.event_id, context.event_name);

    Some(context)
}
