//! OAuth 1.0a error types.

use thiserror::Error;

pub type Oauth1Result<T> = Result<T, Oauth1Error>;

#[derive(Debug, Error)]
pub enum Oauth1Error {
    #[error("Request token acquisition failed: {0}")]
    RequestTokenFailed(String),

    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Backchannel call timed out")]
    BackchannelTimeout,

    #[error("Backchannel error: {0}")]
    BackchannelError(String),

    #[error("Invalid handshake state")]
    InvalidState,

    #[error("Handshake state expired")]
    ExpiredState,

    #[error("Hook aborted the handshake: {0}")]
    HookAborted(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("User identity request failed: {0}")]
    UserIdentityFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Identity error: {0}")]
    IdentityError(#[from] signin_core::IdentityError),
}

impl From<reqwest::Error> for Oauth1Error {
    fn from(err: reqwest::Error) -> Self {
        // Transport-level timeouts get their own variant so callers can
        // alert differently from protocol failures.
        if err.is_timeout() {
            Oauth1Error::BackchannelTimeout
        } else {
            Oauth1Error::BackchannelError(err.to_string())
        }
    }
}

/// Terminal outcome reported to the failure hook when a handshake aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    RequestTokenFailed,
    InvalidCallback,
    TokenExchangeFailed,
    BackchannelTimeout,
    BackchannelError,
    HookAborted,
    Other,
}

impl Oauth1Error {
    /// Collapse the error taxonomy into the abort reason surfaced to hooks
    /// and the host pipeline. Forged, mismatched and expired state all read
    /// as an invalid callback.
    pub fn abort_reason(&self) -> AbortReason {
        match self {
            Oauth1Error::RequestTokenFailed(_) => AbortReason::RequestTokenFailed,
            Oauth1Error::InvalidCallback(_)
            | Oauth1Error::InvalidState
            | Oauth1Error::ExpiredState => AbortReason::InvalidCallback,
            Oauth1Error::TokenExchangeFailed(_) => AbortReason::TokenExchangeFailed,
            Oauth1Error::BackchannelTimeout => AbortReason::BackchannelTimeout,
            Oauth1Error::BackchannelError(_) | Oauth1Error::UserIdentityFailed(_) => {
                AbortReason::BackchannelError
            }
            Oauth1Error::HookAborted(_) => AbortReason::HookAborted,
            _ => AbortReason::Other,
        }
    }
}
