// =============================================================================
// Central Application State: Sentiment Meter Service
// =============================================================================
//
// The single source of truth for the service. Handlers and the optional
// auto-refresh task share it as `Arc<AppState>`.
//
// Thread safety:
//   - parking_lot::RwLock around each basket slot map, the PCR map, the last
//     update stamp, the history store and the error ring.
//   - A tokio Mutex serialises refresh cycles: at most one is in flight, and
//     readers never observe a half-written history point.
//   - The broker client guards its own session token.
// =============================================================================

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, FixedOffset};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::broker::{BrokerClient, BrokerError};
use crate::config::{AppConfig, BrokerCredentials};
use crate::market_data::session::{format_ist, ist_now};
use crate::market_data::{attach_pcr, FetchReport, MarketDataFetcher};
use crate::sentiment::{self, HistoryPoint, MeterHistory, StatusClassification};
use crate::types::{Basket, InstrumentRecord};

// =============================================================================
// Error Record
// =============================================================================

/// A recorded failure for the diagnostics endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// IST timestamp.
    pub at: String,
}

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

// =============================================================================
// Readings
// =============================================================================

/// Current meter value (3 dp) with its status metadata, as the dashboard
/// consumes it.
#[derive(Debug, Clone, Serialize)]
pub struct MeterReading {
    pub value: f64,
    #[serde(flatten)]
    pub classification: StatusClassification,
}

impl MeterReading {
    pub fn from_score(score: f64) -> Self {
        Self {
            value: round3(score),
            classification: sentiment::classify(score),
        }
    }
}

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    /// Records cached per basket slug.
    pub data_counts: BTreeMap<&'static str, usize>,
    pub pcr_count: usize,
    pub history_points: usize,
    pub failures: Vec<String>,
    pub timestamp: String,
}

pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

// =============================================================================
// AppState
// =============================================================================

pub struct AppState {
    // ── Configuration ───────────────────────────────────────────────────
    pub config: AppConfig,
    /// Bearer token for the diagnostic endpoints. `None` disables them.
    pub admin_token: Option<String>,

    // ── Collaborators ───────────────────────────────────────────────────
    pub broker: Arc<BrokerClient>,
    pub fetcher: MarketDataFetcher,

    // ── Cached market data ──────────────────────────────────────────────
    pub baskets: RwLock<HashMap<Basket, Vec<InstrumentRecord>>>,
    /// `tradingSymbol → pcr` from the last listing.
    pub pcr_data: RwLock<HashMap<String, f64>>,
    pub last_update: RwLock<Option<DateTime<FixedOffset>>>,

    // ── History ─────────────────────────────────────────────────────────
    pub history: RwLock<MeterHistory>,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    refresh_lock: tokio::sync::Mutex<()>,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: Instant,
}

impl AppState {
    /// Build the state, broker client and fetcher from configuration.
    pub fn new(
        config: AppConfig,
        credentials: BrokerCredentials,
        admin_token: Option<String>,
    ) -> anyhow::Result<Self> {
        let broker = Arc::new(BrokerClient::new(&config, credentials)?);
        let fetcher = MarketDataFetcher::from_config(broker.clone(), &config);
        Ok(Self::with_parts(config, broker, fetcher, admin_token))
    }

    pub fn with_parts(
        config: AppConfig,
        broker: Arc<BrokerClient>,
        fetcher: MarketDataFetcher,
        admin_token: Option<String>,
    ) -> Self {
        let history = MeterHistory::new(config.history_capacity);
        let admin_token = admin_token.filter(|t| !t.trim().is_empty());
        Self {
            config,
            admin_token,
            broker,
            fetcher,
            baskets: RwLock::new(HashMap::new()),
            pcr_data: RwLock::new(HashMap::new()),
            last_update: RwLock::new(None),
            history: RwLock::new(history),
            recent_errors: RwLock::new(Vec::new()),
            refresh_lock: tokio::sync::Mutex::new(()),
            start_time: Instant::now(),
        }
    }

    // ── Refresh ─────────────────────────────────────────────────────────

    /// Fetch all four baskets and the PCR listing, then record a history
    /// point.
    ///
    /// A failed login aborts before any cached data changes. Every later
    /// failure degrades to an empty basket and is logged.
    #[instrument(skip(self), name = "app::refresh")]
    pub async fn refresh(&self) -> Result<RefreshSummary, BrokerError> {
        let _guard = self.refresh_lock.lock().await;

        if let Err(e) = self.broker.ensure_session().await {
            self.push_error(format!("login: {e}"));
            return Err(e);
        }

        let mut failures = Vec::new();

        for basket in [Basket::Nifty50, Basket::BankNifty] {
            let report = self.fetcher.fetch_basket(basket).await;
            self.store_basket(basket, report, &mut failures);
        }

        match self.broker.put_call_ratios().await {
            Ok(ratios) => *self.pcr_data.write() = ratios,
            Err(e) => {
                warn!(error = %e, "PCR listing unavailable");
                self.push_error(format!("putCallRatio: {e}"));
                failures.push(format!("putCallRatio: {e}"));
            }
        }

        for basket in [Basket::NiftyFutures, Basket::BankFutures] {
            let mut report = self.fetcher.fetch_basket(basket).await;
            if self.config.attach_pcr {
                let attached = attach_pcr(&mut report.records, &self.pcr_data.read());
                info!(basket = %basket, attached, "PCR attached to futures records");
            }
            self.store_basket(basket, report, &mut failures);
        }

        let now = ist_now();
        *self.last_update.write() = Some(now);
        self.record_history(now);

        let summary = RefreshSummary {
            data_counts: self.data_counts(),
            pcr_count: self.pcr_data.read().len(),
            history_points: self.history.read().len(),
            failures,
            timestamp: format_ist(&now),
        };

        info!(
            counts = ?summary.data_counts,
            pcr = summary.pcr_count,
            history = summary.history_points,
            "refresh complete"
        );
        Ok(summary)
    }

    fn store_basket(&self, basket: Basket, report: FetchReport, failures: &mut Vec<String>) {
        for failure in &report.failures {
            self.push_error(failure.clone());
        }
        failures.extend(report.failures);
        self.baskets.write().insert(basket, report.records);
    }

    /// Append a history point when both futures baskets hold data.
    pub fn record_history(&self, at: DateTime<FixedOffset>) -> bool {
        let (nifty, bank) = {
            let baskets = self.baskets.read();
            let nifty = baskets.get(&Basket::NiftyFutures).filter(|r| !r.is_empty());
            let bank = baskets.get(&Basket::BankFutures).filter(|r| !r.is_empty());
            match (nifty, bank) {
                (Some(n), Some(b)) => (sentiment::score(n), sentiment::score(b)),
                _ => return false,
            }
        };

        let point = HistoryPoint {
            timestamp: at.format("%H:%M").to_string(),
            time_full: at.format("%Y-%m-%d %H:%M:%S").to_string(),
            nifty_meter: round3(nifty),
            bank_meter: round3(bank),
            nifty_impact: sentiment::classify(nifty),
            bank_impact: sentiment::classify(bank),
        };
        self.history.write().append(point);
        true
    }

    // ── Readers ─────────────────────────────────────────────────────────

    pub fn records(&self, basket: Basket) -> Vec<InstrumentRecord> {
        self.baskets.read().get(&basket).cloned().unwrap_or_default()
    }

    /// Meter reading for a futures basket; `None` for cash baskets.
    pub fn meter(&self, basket: Basket) -> Option<MeterReading> {
        if !basket.has_meter() {
            return None;
        }
        let baskets = self.baskets.read();
        let records = baskets.get(&basket).map(Vec::as_slice).unwrap_or(&[]);
        Some(MeterReading::from_score(sentiment::score(records)))
    }

    pub fn data_counts(&self) -> BTreeMap<&'static str, usize> {
        let baskets = self.baskets.read();
        Basket::ALL
            .into_iter()
            .map(|b| (b.slug(), baskets.get(&b).map_or(0, Vec::len)))
            .collect()
    }

    pub fn has_data(&self) -> bool {
        self.baskets.read().values().any(|r| !r.is_empty())
    }

    pub fn last_update_display(&self) -> Option<String> {
        self.last_update.read().as_ref().map(format_ist)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message. The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted first.
    pub fn push_error(&self, message: String) {
        let record = ErrorRecord {
            message,
            at: format_ist(&ist_now()),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
