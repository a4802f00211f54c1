// =============================================================================
// Broker Module
// =============================================================================
//
// Client for the brokerage REST API: TOTP login, batched quotes, the
// put-call-ratio listing and historical open interest.

pub mod client;
pub mod error;
pub mod totp;

pub use client::{BrokerClient, QuoteBatch, RawResponse};
pub use error::{BrokerError, BrokerResult};
pub use totp::TotpAlgorithm;
