//! Error types for the describe-then-synthesize pipeline.

use std::fmt;

/// Maximum characters of a service error body kept for display.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Which external service produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    /// Vision chat completion that describes the source image.
    Description,
    /// Image generation from the composed prompt.
    Synthesis,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Description => write!(f, "description"),
            Self::Synthesis => write!(f, "image synthesis"),
        }
    }
}

/// Errors that can occur while generating or saving an image.
#[derive(Debug, thiserror::Error)]
pub enum ReimagineError {
    /// Credential or other configuration missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// A contacted service returned a non-success status or an error payload.
    #[error("{service} service error{}: {message}", status_suffix(.status))]
    Service {
        /// Stage that failed.
        service: ServiceKind,
        /// HTTP status, when the failure came with one.
        status: Option<u16>,
        /// Service-provided detail, or a generic fallback.
        message: String,
    },

    /// A service answered successfully but without the expected payload.
    #[error("missing data: {0}")]
    MissingData(String),

    /// Required input absent or not acceptable (no image, empty prompt, non-image file).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A generation is already in flight.
    #[error("a generation is already in progress")]
    Busy,

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., reading the upload or saving the download).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Background task failed to complete.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ReimagineError {
    /// Builds a service error, sanitizing the message for display.
    pub fn service(service: ServiceKind, status: Option<u16>, message: &str) -> Self {
        Self::Service {
            service,
            status,
            message: sanitize_error_message(message),
        }
    }

    /// Returns true for errors reported by a contacted service.
    pub fn is_service_error(&self) -> bool {
        matches!(self, Self::Service { .. })
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// Result type alias for reimagine operations.
pub type Result<T> = std::result::Result<T, ReimagineError>;

/// Strips control characters and truncates overly long service messages.
pub(crate) fn sanitize_error_message(message: &str) -> String {
    let cleaned: String = message
        .trim()
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    if cleaned.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return cleaned;
    }

    let truncated: String = cleaned.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReimagineError::service(ServiceKind::Description, Some(401), "bad key");
        assert_eq!(err.to_string(), "description service error (401): bad key");

        let err = ReimagineError::service(ServiceKind::Synthesis, None, "quota exceeded");
        assert_eq!(
            err.to_string(),
            "image synthesis service error: quota exceeded"
        );

        let err = ReimagineError::MissingData("no image data received".into());
        assert_eq!(err.to_string(), "missing data: no image data received");
    }

    #[test]
    fn test_is_service_error() {
        assert!(ReimagineError::service(ServiceKind::Synthesis, Some(500), "boom").is_service_error());
        assert!(!ReimagineError::Config("missing key".into()).is_service_error());
        assert!(!ReimagineError::Busy.is_service_error());
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_error_message("  bad\nkey\t "), "bad key");
    }

    #[test]
    fn test_sanitize_truncates_long_messages() {
        let long = "x".repeat(MAX_ERROR_MESSAGE_LEN + 20);
        let sanitized = sanitize_error_message(&long);
        assert!(sanitized.ends_with("..."));
        assert_eq!(sanitized.chars().count(), MAX_ERROR_MESSAGE_LEN + 3);
    }
}
