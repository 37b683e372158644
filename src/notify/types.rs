//! Notification types

use thiserror::Error;

/// An alert rendered for humans
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedAlert {
    pub symbol: String,
    pub subject: String,
    pub body: String,
}

/// Channel send failures
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Channel answered with a non-success status
    #[error("{channel} rejected alert with {status}: {body}")]
    Rejected {
        channel: &'static str,
        status: u16,
        body: String,
    },
    /// Token, webhook or key not configured
    #[error("{channel} credential missing: {detail}")]
    MissingCredential {
        channel: &'static str,
        detail: String,
    },
}

/// Per-channel result of dispatching one alert
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub delivered: Vec<&'static str>,
    pub failed: Vec<(&'static str, DispatchError)>,
}

impl DispatchOutcome {
    /// No channel accepted the alert
    pub fn is_failure(&self) -> bool {
        self.delivered.is_empty() && !self.failed.is_empty()
    }
}
