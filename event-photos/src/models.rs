use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque device-local photo identifier, compared by exact string equality
pub type PhotoIdentifier = String;

/// The event a reconciliation pass works on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventContext {
    pub event_id: String,
    pub event_name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub timezone: Option<String>,
}

impl EventContext {
    /// Context that only knows the event id (no name, open time window)
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            event_name: "Event".to_string(),
            start_time: None,
            end_time: None,
            timezone: None,
        }
    }

    /// True when both window bounds are known
    pub fn has_window(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Value of the `mediaType` field the upload API expects
    pub fn api_name(&self) -> &'static str {
        match self {
            MediaType::Image => "photo",
            MediaType::Video => "video",
        }
    }
}

/// A photo discovered on the device, before duplicate checking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoCandidate {
    pub id: PhotoIdentifier,
    pub creation_time: DateTime<Utc>,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub media_type: MediaType,
    pub duration_seconds: f64,
    /// Local reference (file path or content URI) the binary is read from
    pub source: String,
}

/// Transport-ready representation of a photo
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRef {
    pub id: PhotoIdentifier,
    pub source: String,
    pub filename: String,
    pub media_type: MediaType,
    pub creation_time: DateTime<Utc>,
}

impl From<&PhotoCandidate> for PhotoRef {
    fn from(photo: &PhotoCandidate) -> Self {
        Self {
            id: photo.id.clone(),
            source: photo.source.clone(),
            filename: photo.filename.clone(),
            media_type: photo.media_type,
            creation_time: photo.creation_time,
        }
    }
}

/// Per-photo result of an upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum UploadOutcome {
    Uploaded,
    Duplicate,
    Failed(String),
}

/// Aggregated result of one dispatch (or one short-circuited check)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadBatchResult {
    pub uploaded_count: usize,
    pub duplicate_count: usize,
    pub failed_count: usize,
    pub per_photo: Vec<(PhotoIdentifier, UploadOutcome)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UploadBatchResult {
    /// Zero-filled result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the tallies from ordered per-photo outcomes
    pub fn from_outcomes(per_photo: Vec<(PhotoIdentifier, UploadOutcome)>) -> Self {
        let mut result = Self::default();
        for (_, outcome) in &per_photo {
            match outcome {
                UploadOutcome::Uploaded => result.uploaded_count += 1,
                UploadOutcome::Duplicate => result.duplicate_count += 1,
                UploadOutcome::Failed(_) => result.failed_count += 1,
            }
        }
        result.per_photo = per_photo;
        result
    }

    /// Every photo failed for the same reason
    pub fn all_failed<'a, I>(ids: I, reason: &str) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let per_photo = ids
            .into_iter()
            .map(|id| (id.to_string(), UploadOutcome::Failed(reason.to_string())))
            .collect();
        let mut result = Self::from_outcomes(per_photo);
        result.message = Some(reason.to_string());
        result
    }

    pub fn total(&self) -> usize {
        self.uploaded_count + self.duplicate_count + self.failed_count
    }

    /// Human-readable one-line summary
    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} uploaded, {} duplicate, {} failed",
            self.uploaded_count, self.duplicate_count, self.failed_count
        );
        if let Some(msg) = &self.message {
            text.push_str(&format!(" ({})", msg));
        }
        text
    }
}

/// Parses an event timestamp.
///
/// Accepts RFC 3339 with any offset, plus naive `YYYY-MM-DDTHH:MM:SS[.fff]`
/// and `YYYY-MM-DD HH:MM:SS` wall-clock values which are taken as UTC.
/// A bare date means midnight UTC.
pub fn parse_event_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    log::warn!("Could not parse event time: {}", value);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_event_time_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 8, 18, 10, 0, 0).unwrap();

        assert_eq!(parse_event_time("2024-08-18T10:00:00Z"), Some(expected));
        assert_eq!(parse_event_time("2024-08-18T10:00:00+00:00"), Some(expected));
        assert_eq!(parse_event_time("2024-08-18T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_event_time("2024-08-18T10:00:00"), Some(expected));
        assert_eq!(parse_event_time("2024-08-18 10:00:00"), Some(expected));
        assert_eq!(
            parse_event_time("2024-08-18"),
            Some(Utc.with_ymd_and_hms(2024, 8, 18, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_event_time_rejects_garbage() {
        assert_eq!(parse_event_time(""), None);
        assert_eq!(parse_event_time("   "), None);
        assert_eq!(parse_event_time("next tuesday"), None);
    }

    #[test]
    fn test_batch_result_tallies() {
        let result = UploadBatchResult::from_outcomes(vec![
            ("a".to_string(), UploadOutcome::Uploaded),
            ("b".to_string(), UploadOutcome::Duplicate),
            ("c".to_string(), UploadOutcome::Failed("timeout".to_string())),
            ("d".to_string(), UploadOutcome::Uploaded),
        ]);

        assert_eq!(result.uploaded_count, 2);
        assert_eq!(result.duplicate_count, 1);
        assert_eq!(result.failed_count, 1);
        assert_eq!(result.total(), 4);
        assert_eq!(result.per_photo[2].0, "c");
    }

    #[test]
    fn test_all_failed_shares_reason() {
        let result = UploadBatchResult::all_failed(["x", "y"], "identity_not_ready");

        assert_eq!(result.failed_count, 2);
        assert_eq!(result.total(), 2);
        assert_eq!(result.message.as_deref(), Some("identity_not_ready"));
        assert!(result
            .per_photo
            .iter()
            .all(|(_, o)| *o == UploadOutcome::Failed("identity_not_ready".to_string())));
    }
}
