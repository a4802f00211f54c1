//! Broker API error types

use thiserror::Error;

/// Failures at the broker boundary.
///
/// None of these reach the HTTP façade as a crash: the fetcher degrades every
/// variant to "no data this cycle".
#[derive(Error, Debug)]
pub enum BrokerError {
    /// A credential environment variable is unset.
    #[error("missing broker credential: {0}")]
    MissingCredentials(&'static str),

    /// Bad credentials/OTP or a login response without a token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Connection failure, timeout, or undecodable body.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    /// The response parsed but lacks an expected field.
    #[error("unexpected response shape: {0}")]
    DataShape(String),

    #[error("TOTP secret is not valid base32")]
    InvalidTotpSecret,
}

impl BrokerError {
    /// True when the cached session should be discarded.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_) | Self::Status { status: 401 | 403, .. }
        )
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;
