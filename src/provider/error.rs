//! Classification of failures when talking to the bank-data provider.

use reqwest::StatusCode;

/// The ways a call to the upstream provider can fail.
///
/// The variants drive how a sync pass reacts, so new failure modes should be
/// mapped onto one of these rather than added ad hoc.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ProviderError {
    /// The credential is invalid, expired or revoked.
    ///
    /// The connection must be deactivated and never retried automatically.
    #[error("the provider rejected the access credential")]
    Unauthorized,

    /// A network error, timeout, throttling or server-side failure.
    ///
    /// Treated as transient: the next externally-triggered sync may succeed.
    #[error("the provider is unavailable: {0}")]
    Unavailable(String),

    /// The requested resource does not exist (yet) on the provider side.
    #[error("the provider could not find the requested resource")]
    NotFound,

    /// The provider refused the request for a reason other than the above.
    #[error("the provider rejected the request with status {0}")]
    Rejected(u16),

    /// The provider answered with a body that could not be decoded.
    #[error("could not decode the provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized,
            StatusCode::NOT_FOUND => ProviderError::NotFound,
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
                ProviderError::Unavailable(format!("status {status}"))
            }
            status if status.is_server_error() => {
                ProviderError::Unavailable(format!("status {status}"))
            }
            status => ProviderError::Rejected(status.as_u16()),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return ProviderError::InvalidResponse(error.to_string());
        }

        match error.status() {
            Some(status) => ProviderError::from_status(status),
            // Connect errors, timeouts and broken bodies all end up here.
            None => ProviderError::Unavailable(error.to_string()),
        }
    }
}
