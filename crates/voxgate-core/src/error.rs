//! Error taxonomy shared by every component.
//!
//! Each variant carries the loggable detail in its `Display` output;
//! [`Error::user_message`] is the short, non-technical text that may be
//! surfaced to callers. Provider detail is never shown verbatim except for
//! transcription failure reasons, which the transcribe route surfaces by
//! design.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or undecodable request fields. Maps to HTTP 400.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A component is unconfigured or its backing resource is missing.
    /// Soft failure: callers answer with a JSON error body.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The provider rejected our credentials.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The provider reported any other failure.
    #[error("provider error: {0}")]
    Provider(String),

    /// A bounded wait was exhausted.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Anything else. Maps to HTTP 500 with a generic body.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Short text safe to return to end users.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidInput(detail) => detail.clone(),
            Error::Unavailable(_) => "Sorry, this service is currently unavailable.".to_string(),
            Error::AccessDenied(_) => {
                "Sorry, the assistant does not have permission to access this service.".to_string()
            }
            Error::Provider(_) => {
                "Sorry, I encountered an error while processing your request.".to_string()
            }
            Error::Timeout(_) => "The request timed out before the service finished.".to_string(),
            Error::Unexpected(_) => "An unexpected error occurred.".to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else {
            Error::Provider(format!("http transport: {err}"))
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Unexpected(format!("serialization: {err}"))
    }
}

/// Translate a non-success provider response into an [`Error`], consuming the
/// body for the logged detail.
pub(crate) async fn response_failure(context: &str, resp: reqwest::Response) -> Error {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            Error::AccessDenied(format!("{context}: {status} {body}"))
        }
        _ => Error::Provider(format!("{context}: {status} {body}")),
    }
}
