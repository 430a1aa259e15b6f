use event_photos::{FetchError, ScanError, TransportError};
use std::fmt;

/// Central error type for the auto-upload app layer
#[derive(Debug)]
pub enum AppError {
    /// Database error (rusqlite)
    Database(rusqlite::Error),
    /// Filesystem error
    Filesystem(std::io::Error),
    /// Configuration file could not be parsed
    Config(String),
    /// Network or HTTP error
    Network(String),
    /// Device photo scan failed
    Scan(ScanError),
    /// Resource not found
    NotFound(String),
    /// Validation error (e.g. invalid inputs)
    Validation(String),
    /// General error
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Filesystem(e) => write!(f, "Filesystem error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::Scan(e) => write!(f, "Scan error: {}", e),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

// Conversions from other error types
impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Database(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Filesystem(e)
    }
}

impl From<toml::de::Error> for AppError {
    fn from(e: toml::de::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e.to_string())
    }
}

impl From<ScanError> for AppError {
    fn from(e: ScanError) -> Self {
        AppError::Scan(e)
    }
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        AppError::Network(e.to_string())
    }
}

impl From<TransportError> for AppError {
    fn from(e: TransportError) -> Self {
        AppError::Network(e.to_string())
    }
}

/// User-friendly error messages for the host UI
impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            AppError::Database(_) => "A database error occurred. Please try again.".to_string(),
            AppError::Filesystem(_) => {
                "Error accessing files. Please check app permissions.".to_string()
            }
            AppError::Config(_) => "The app configuration is invalid.".to_string(),
            AppError::Network(_) => {
                "Could not reach PhotoShare. Please check your connection.".to_string()
            }
            AppError::Scan(ScanError::PermissionDenied(_)) => {
                "Photo access is required for auto-upload.".to_string()
            }
            AppError::Scan(_) => "Error reading photos from this device.".to_string(),
            AppError::NotFound(msg) => format!("{} was not found.", msg),
            AppError::Validation(msg) => msg.clone(),
            AppError::Other(msg) => msg.clone(),
        }
    }
}
