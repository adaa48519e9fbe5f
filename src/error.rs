//! Error taxonomy for portal sessions and report parsing.

use crate::ticketera::Ticketera;
use thiserror::Error;

/// Errors raised while talking to a ticketera back-office.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("network error: {0}")]
    Network(#[from] wreq::Error),

    #[error("request to {url} failed with status: {status}")]
    HttpStatus { status: u16, url: String },

    #[error("rate limited (status {status}). Try increasing --delay or using a proxy.")]
    RateLimited { status: u16 },

    #[error("login to {ticketera} failed: {reason}")]
    LoginFailed { ticketera: Ticketera, reason: String },

    #[error("no credentials configured for {0}. Set them in the config file or via TICKETERA_<CODE>_USERNAME/PASSWORD")]
    MissingCredentials(Ticketera),

    #[error("{0} login page shows a CAPTCHA and no solver API key is configured")]
    CaptchaRequired(Ticketera),

    #[error("captcha solver error: {0}")]
    Captcha(String),

    #[error("failed to parse {what}: {reason}")]
    Parse { what: &'static str, reason: String },

    #[error("{ticketera} requires {access} access: {hint}")]
    UnsupportedAccess { ticketera: Ticketera, access: &'static str, hint: &'static str },

    #[error("session expired or redirected to login at {0}")]
    SessionExpired(String),

    #[error("browser automation error: {0}")]
    Browser(String),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Shorthand for a parse failure.
    pub fn parse(what: &'static str, reason: impl Into<String>) -> Self {
        ScrapeError::Parse { what, reason: reason.into() }
    }

    /// Whether retrying the same request can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScrapeError::Network(_) | ScrapeError::RateLimited { .. } => true,
            ScrapeError::HttpStatus { status, .. } => *status >= 500,
            ScrapeError::Browser(_) => true,
            _ => false,
        }
    }
}
