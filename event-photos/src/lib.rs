//! # Event Photos
//!
//! Photo side of the PhotoShare auto-upload pipeline.
//!
//! This crate provides:
//! - Event, photo and upload result models
//! - Duplicate prevention (candidates minus already uploaded ids)
//! - Device photo discovery behind the `PhotoCandidateScanner` trait
//! - Fail-open lookup of the ids already uploaded to an event
//! - Batched upload dispatch with per-photo outcome accounting
//!
//! ## Platform Separation
//!
//! Native gallery access and the native upload bridge stay in the platform
//! layer; they plug in through `PhotoCandidateScanner` and `UploadTransport`.
//! The `sync` feature adds reqwest-backed implementations of the remote
//! collaborators.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use event_photos::{reconcile, DirectoryScanner, PhotoCandidateScanner};
//!
//! let scanner = DirectoryScanner::new("/sdcard/DCIM");
//! let candidates = scanner.scan("E1", Some(start), Some(end)).await?;
//! let fresh = reconcile(&candidates, &uploaded_ids);
//! ```

pub mod models;
pub mod page;
pub mod reconcile;
pub mod scanner;
pub mod upload;
pub mod uploaded;

pub use models::{
    parse_event_time, EventContext, MediaType, PhotoCandidate, PhotoIdentifier, PhotoRef,
    UploadBatchResult, UploadOutcome,
};
pub use page::{photo_id_of, uploaded_ids_from_page, PageElement, PageSignals};
pub use reconcile::{partition, reconcile};
pub use scanner::{photo_hash, DirectoryScanner, PhotoCandidateScanner, ScanError};
pub use upload::{
    sanitize_file_name, TransportError, UploadDispatcher, UploadScope, UploadTransport,
};
pub use uploaded::{
    normalize_response, AuthHeaders, FetchError, RemoteJsonSource, ShapeStrategy,
    UploadedSetFetcher, DEFAULT_SHAPES, DEFAULT_UPLOADED_ENDPOINTS,
};

#[cfg(feature = "sync")]
pub use upload::{HttpUploadConfig, HttpUploadTransport};

#[cfg(feature = "sync")]
pub use uploaded::HttpJsonSource;
