// =============================================================================
// Shared types used across the sentiment meter service
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::catalog;

/// Which market an instrument trades on. Determines the exchange segment sent
/// to the broker and whether open interest is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    /// Cash equities (NSE segment). Open interest is always 0.
    Cash,
    /// Futures contracts (NFO segment).
    Derivative,
}

impl Venue {
    /// Exchange segment code used by the broker API.
    pub fn exchange_code(self) -> &'static str {
        match self {
            Self::Cash => "NSE",
            Self::Derivative => "NFO",
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.exchange_code())
    }
}

/// Static catalog entry for one instrument.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct InstrumentInfo {
    /// Broker trading symbol, e.g. `HDFCBANK-EQ` or `HDFCBANK28OCT25FUT`.
    pub symbol: &'static str,
    /// Short display name.
    pub name: &'static str,
    /// Issuer name.
    pub company: &'static str,
    /// Index weight in percent. Relative only; need not sum to 100.
    pub weight: f64,
}

/// One of the four instrument baskets the service tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Basket {
    Nifty50,
    BankNifty,
    NiftyFutures,
    BankFutures,
}

impl Basket {
    /// All baskets, in refresh order.
    pub const ALL: [Basket; 4] = [
        Basket::Nifty50,
        Basket::BankNifty,
        Basket::NiftyFutures,
        Basket::BankFutures,
    ];

    /// URL slug used by `/api/data/:kind`.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Nifty50 => "nifty50",
            Self::BankNifty => "banknifty",
            Self::NiftyFutures => "nifty-futures",
            Self::BankFutures => "bank-futures",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.slug() == slug)
    }

    pub fn venue(self) -> Venue {
        match self {
            Self::Nifty50 | Self::BankNifty => Venue::Cash,
            Self::NiftyFutures | Self::BankFutures => Venue::Derivative,
        }
    }

    /// Static identifier → instrument table for this basket.
    pub fn catalog(self) -> &'static [(&'static str, InstrumentInfo)] {
        match self {
            Self::Nifty50 => catalog::NIFTY_50_STOCKS,
            Self::BankNifty => catalog::BANK_NIFTY_STOCKS,
            Self::NiftyFutures => catalog::NIFTY_50_FUTURES,
            Self::BankFutures => catalog::BANK_NIFTY_FUTURES,
        }
    }

    /// Only futures baskets carry a sentiment meter.
    pub fn has_meter(self) -> bool {
        self.venue() == Venue::Derivative
    }
}

impl std::fmt::Display for Basket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Where a record's net open-interest change came from.
///
/// `Synthetic` values are a random perturbation of current OI and carry no
/// market information; the dashboard shows them as such.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OiChangeSource {
    /// Not applicable (cash equities) or no open interest reported.
    #[default]
    None,
    /// Current OI minus the previous session's OI from the broker.
    Historical,
    /// Produced by an [`OiChangeFallback`](crate::market_data::OiChangeFallback).
    Synthetic,
}

/// One processed quote: the scorer's input and the dashboard's table row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentRecord {
    /// Broker symbol token, unique within a basket.
    pub token: String,
    pub symbol: String,
    pub name: String,
    pub company: String,
    pub weight: f64,
    pub ltp: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub net_change: f64,
    /// Percent price change versus previous close.
    pub percent_change: f64,
    pub trade_volume: u64,
    /// 0 means not applicable.
    pub open_interest: u64,
    /// Change in OI since the previous session, 0 when unavailable.
    pub net_open_interest_change: i64,
    pub oi_change_source: OiChangeSource,
    pub trading_symbol: String,
    /// Put-call ratio for the instrument, when supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcr: Option<f64>,
}
