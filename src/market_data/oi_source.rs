// =============================================================================
// OI Change Sources: historical lookup and placeholder fallback strategies
// =============================================================================
//
// Net OI change for a futures record is current OI minus the previous
// session's OI. Two strategies feed that calculation:
//
//   HistoricalOiProvider  previous-session OI, when the broker can supply it
//   OiChangeFallback      used when it cannot
//
// The random fallback is a heuristic placeholder. Its output is tagged
// `OiChangeSource::Synthetic` on every record and must not be read as market
// data.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::session;
use crate::broker::BrokerClient;

// =============================================================================
// Historical OI
// =============================================================================

/// Supplies the previous session's open interest for a futures token.
#[async_trait]
pub trait HistoricalOiProvider: Send + Sync {
    /// `None` when unavailable.
    async fn previous_oi(&self, token: &str) -> Option<u64>;

    fn name(&self) -> &'static str;
}

/// Never supplies historical OI.
#[derive(Debug, Default)]
pub struct DisabledHistoricalOi;

#[async_trait]
impl HistoricalOiProvider for DisabledHistoricalOi {
    async fn previous_oi(&self, _token: &str) -> Option<u64> {
        None
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Queries the broker's OI history for the previous trading day, once per
/// token per IST calendar day.
pub struct BrokerHistoricalOi {
    client: Arc<BrokerClient>,
    delay: Duration,
    cache: RwLock<HashMap<String, (NaiveDate, Option<u64>)>>,
}

impl BrokerHistoricalOi {
    pub fn new(client: Arc<BrokerClient>, delay: Duration) -> Self {
        Self {
            client,
            delay,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn cached(&self, token: &str, today: NaiveDate) -> Option<Option<u64>> {
        self.cache
            .read()
            .get(token)
            .filter(|(day, _)| *day == today)
            .map(|(_, oi)| *oi)
    }
}

#[async_trait]
impl HistoricalOiProvider for BrokerHistoricalOi {
    async fn previous_oi(&self, token: &str) -> Option<u64> {
        let today = session::ist_now().date_naive();
        if let Some(hit) = self.cached(token, today) {
            return hit;
        }

        if let Err(e) = self.client.ensure_session().await {
            warn!(token, error = %e, "historical OI skipped: no broker session");
            return None;
        }

        tokio::time::sleep(self.delay).await;

        let (from, to) = session::session_window(session::previous_trading_day(today));
        match self.client.historical_oi(token, &from, &to).await {
            Ok(oi) => {
                debug!(token, ?oi, "historical OI fetched");
                self.cache.write().insert(token.to_string(), (today, oi));
                oi
            }
            Err(e) => {
                warn!(token, error = %e, "historical OI lookup failed");
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "broker"
    }
}

// =============================================================================
// Fallback
// =============================================================================

/// Produces a net OI change when no historical OI exists.
pub trait OiChangeFallback: Send + Sync {
    /// `None` means "no change available".
    fn synthesize(&self, current_oi: u64) -> Option<i64>;

    fn name(&self) -> &'static str;
}

/// Reports no change.
#[derive(Debug, Default)]
pub struct ZeroFallback;

impl OiChangeFallback for ZeroFallback {
    fn synthesize(&self, _current_oi: u64) -> Option<i64> {
        None
    }

    fn name(&self) -> &'static str {
        "zero"
    }
}

/// Uniform random fraction of current OI in `[-max_fraction, max_fraction]`,
/// truncated toward zero. Placeholder only.
pub struct RandomPerturbation {
    rng: Mutex<StdRng>,
    max_fraction: f64,
}

impl RandomPerturbation {
    pub const DEFAULT_MAX_FRACTION: f64 = 0.05;

    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible sequence for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            max_fraction: Self::DEFAULT_MAX_FRACTION,
        }
    }
}

impl OiChangeFallback for RandomPerturbation {
    fn synthesize(&self, current_oi: u64) -> Option<i64> {
        let fraction = self
            .rng
            .lock()
            .gen_range(-self.max_fraction..=self.max_fraction);
        Some((current_oi as f64 * fraction) as i64)
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

// =============================================================================
// Tests
// =============================================================================
