use debrid_providers::ProviderClientError;
use thiserror::Error;

/// Transport failure class, used to pick how loudly an error is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkKind {
    Offline,
    TimedOut,
    Other,
}

#[derive(Error, Debug)]
pub enum DebridError {
    #[error("Invalid URL")]
    InvalidUrl,

    #[error("Invalid response from the service")]
    InvalidResponse,

    #[error("Invalid or missing token")]
    InvalidToken,

    #[error("The service returned no data")]
    EmptyData,

    #[error("The remote job has no files or no longer exists")]
    EmptyRemoteJob,

    #[error("The content is still being cached")]
    IsCaching,

    #[error("Authentication failed: {0}")]
    AuthQuery(String),

    #[error("{0}")]
    FailedRequest(String),

    #[error("Not implemented for this service")]
    NotImplemented,

    #[error("The magnet has no usable link")]
    InvalidMagnet,

    #[error("Cancelled")]
    Cancelled,

    #[error("Network error: {message}")]
    Network { kind: NetworkKind, message: String },
}

/// How a failure should reach the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    /// Log only
    Silent,
    /// Informational message
    Notice(String),
    /// User-visible failure
    Alert(String),
}

impl DebridError {
    /// Classify the error for display.
    ///
    /// `prefix` names the service and operation ("RealDebrid download").
    /// Cancellation is only announced when `cancel_notice` is given.
    #[must_use]
    pub fn presentation(&self, prefix: &str, cancel_notice: Option<&str>) -> Presentation {
        match self {
            Self::Network { kind: NetworkKind::Offline, .. } => {
                Presentation::Notice("The connection is offline".to_string())
            }
            Self::Network { kind: NetworkKind::TimedOut, .. } => {
                Presentation::Notice(format!("{prefix}: the request timed out"))
            }
            Self::Cancelled => cancel_notice.map_or(Presentation::Silent, |notice| Presentation::Notice(notice.to_string())),
            other => Presentation::Alert(format!("{prefix} error: {other}")),
        }
    }

    #[must_use]
    pub const fn is_caching(&self) -> bool {
        matches!(self, Self::IsCaching)
    }
}

impl From<ProviderClientError> for DebridError {
    fn from(err: ProviderClientError) -> Self {
        match err {
            ProviderClientError::Connect(message) => Self::Network {
                kind: NetworkKind::Offline,
                message,
            },
            ProviderClientError::Timeout(message) => Self::Network {
                kind: NetworkKind::TimedOut,
                message,
            },
            ProviderClientError::Network(message) => Self::Network {
                kind: NetworkKind::Other,
                message,
            },
            ProviderClientError::Http { status, url } => {
                Self::FailedRequest(format!("The request to {url} failed with status code {}", status.as_u16()))
            }
            ProviderClientError::Unauthorized { url } => {
                Self::FailedRequest(format!("The request to {url} was unauthorized"))
            }
            ProviderClientError::Api { code, message } => {
                Self::FailedRequest(format!("The service rejected the request ({code}): {message}"))
            }
            ProviderClientError::Parse(message) => {
                tracing::debug!(%message, "Discarding unparseable provider response");
                Self::InvalidResponse
            }
            ProviderClientError::ResponseTooLarge { size } => {
                tracing::debug!(size, "Discarding oversized provider response");
                Self::InvalidResponse
            }
            ProviderClientError::InvalidUrl(_) => Self::InvalidUrl,
        }
    }
}

impl From<url::ParseError> for DebridError {
    fn from(_: url::ParseError) -> Self {
        Self::InvalidUrl
    }
}

pub type Result<T> = std::result::Result<T, DebridError>;
