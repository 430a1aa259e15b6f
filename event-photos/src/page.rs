//! Snapshot of the web page the app is showing.
//!
//! The host serialises what it can see (URL, meta tags, stored state, DOM
//! datasets) into a `PageSignals` value; nothing here touches a live DOM.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// A DOM element reduced to the attributes the pipeline reads
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PageElement {
    pub id: Option<String>,
    pub classes: Vec<String>,
    /// `data-*` attributes keyed like `HTMLElement.dataset` (camelCase)
    pub dataset: HashMap<String, String>,
    /// Element contains an uploaded badge / checkmark child
    pub has_uploaded_badge: bool,
}

impl PageElement {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Non-empty dataset value
    pub fn data(&self, key: &str) -> Option<&str> {
        self.dataset
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSignals {
    pub url_path: String,
    pub title: Option<String>,
    /// Page-global event object
    pub page_event: Option<Value>,
    /// `<meta name=… content=…>` pairs
    pub meta: HashMap<String, String>,
    /// Raw JSON blob of the locally stored current event
    pub stored_event: Option<String>,
    pub elements: Vec<PageElement>,
    /// Page-global list of uploaded photos
    pub uploaded_photos: Option<Value>,
    /// Bearer token candidates from local/session storage, in lookup order
    pub stored_tokens: Vec<String>,
    /// Value of a hidden `_token` form input
    pub csrf_input: Option<String>,
}

impl PageSignals {
    pub fn meta(&self, name: &str) -> Option<&str> {
        self.meta
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Reads a photo id from a JSON value: a string, or an object carrying
/// `id`, `photoId` or `localIdentifier` (first one present wins).
pub fn photo_id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => ["id", "photoId", "localIdentifier"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
        _ => None,
    }
}

/// Collects ids of photos the page marks as uploaded
pub fn uploaded_ids_from_page(page: &PageSignals) -> HashSet<String> {
    let mut ids = HashSet::new();

    for element in &page.elements {
        let flagged = element.data("uploaded") == Some("true")
            || element.has_class("uploaded-photo")
            || element.has_class("photo-uploaded");
        if flagged {
            let id = element
                .data("photoId")
                .or_else(|| element.data("id"))
                .or(element.id.as_deref().filter(|v| !v.is_empty()));
            if let Some(id) = id {
                ids.insert(id.to_string());
            }
        }

        let is_photo = element.has_class("photo")
            || element.has_class("image")
            || element.data("photoId").is_some();
        if is_photo && (element.has_class("uploaded") || element.has_uploaded_badge) {
            if let Some(id) = element.data("photoId").or_else(|| element.data("id")) {
                ids.insert(id.to_string());
            }
        }
    }

    if let Some(Value::Array(items)) = &page.uploaded_photos {
        ids.extend(items.iter().filter_map(photo_id_of));
    }

    ids
}
