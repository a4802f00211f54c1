// =============================================================================
// Market Data Fetcher: batched quote retrieval into InstrumentRecords
// =============================================================================
//
// For one catalog and venue:
//   - ensure a broker session (failure => empty result),
//   - split tokens into batches of at most `batch_size` (broker cap 50),
//   - POST one quote call per batch with a fixed pause between batches,
//   - parse each returned item against the catalog, skipping unknown or
//     malformed items,
//   - for futures, derive net OI change from historical OI or the fallback.
//
// Nothing here returns an error to the caller. Failures are logged and
// reported in `FetchReport::failures`; an empty record list means "no data
// this cycle".
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::oi_source::{
    BrokerHistoricalOi, DisabledHistoricalOi, HistoricalOiProvider, OiChangeFallback,
    RandomPerturbation, ZeroFallback,
};
use crate::broker::client::json_f64;
use crate::broker::{BrokerClient, BrokerError};
use crate::catalog;
use crate::config::{AppConfig, OiFallbackMode, MAX_BATCH_SIZE};
use crate::types::{Basket, InstrumentInfo, InstrumentRecord, OiChangeSource, Venue};

/// Records from one fetch plus any failures worth surfacing.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub records: Vec<InstrumentRecord>,
    pub failures: Vec<String>,
}

pub struct MarketDataFetcher {
    client: Arc<BrokerClient>,
    historical_oi: Arc<dyn HistoricalOiProvider>,
    oi_fallback: Arc<dyn OiChangeFallback>,
    batch_size: usize,
    batch_delay: Duration,
}

impl MarketDataFetcher {
    pub fn new(
        client: Arc<BrokerClient>,
        historical_oi: Arc<dyn HistoricalOiProvider>,
        oi_fallback: Arc<dyn OiChangeFallback>,
        batch_size: usize,
        batch_delay: Duration,
    ) -> Self {
        Self {
            client,
            historical_oi,
            oi_fallback,
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            batch_delay,
        }
    }

    /// Build the fetcher and its OI strategies from configuration.
    pub fn from_config(client: Arc<BrokerClient>, config: &AppConfig) -> Self {
        let historical_oi: Arc<dyn HistoricalOiProvider> = if config.historical_oi_enabled {
            Arc::new(BrokerHistoricalOi::new(
                client.clone(),
                config.historical_oi_delay(),
            ))
        } else {
            Arc::new(DisabledHistoricalOi)
        };

        let oi_fallback: Arc<dyn OiChangeFallback> = match (config.oi_fallback, config.oi_fallback_seed) {
            (OiFallbackMode::Zero, _) => Arc::new(ZeroFallback),
            (OiFallbackMode::Random, Some(seed)) => Arc::new(RandomPerturbation::seeded(seed)),
            (OiFallbackMode::Random, None) => Arc::new(RandomPerturbation::from_entropy()),
        };

        info!(
            historical_oi = historical_oi.name(),
            oi_fallback = oi_fallback.name(),
            batch_size = config.batch_size,
            "market data fetcher configured"
        );

        Self::new(
            client,
            historical_oi,
            oi_fallback,
            config.batch_size,
            config.batch_delay(),
        )
    }

    pub async fn fetch_basket(&self, basket: Basket) -> FetchReport {
        let report = self.fetch(basket.catalog(), basket.venue()).await;
        info!(
            basket = %basket,
            records = report.records.len(),
            failures = report.failures.len(),
            "basket fetched"
        );
        report
    }

    /// Fetch every instrument of `catalog` on `venue`.
    pub async fn fetch(
        &self,
        catalog: &[(&'static str, InstrumentInfo)],
        venue: Venue,
    ) -> FetchReport {
        let mut report = FetchReport::default();

        if let Err(e) = self.client.ensure_session().await {
            error!(venue = %venue, error = %e, "fetch aborted: broker authentication failed");
            report.failures.push(format!("{venue}: {e}"));
            return report;
        }

        let batches = token_batches(catalog, self.batch_size);
        let batch_count = batches.len();

        for (i, batch) in batches.iter().enumerate() {
            match self.client.quote(venue, batch).await {
                Ok(quotes) => {
                    for item in &quotes.unfetched {
                        debug!(venue = %venue, ?item, "token not served by broker");
                    }
                    for item in &quotes.fetched {
                        if let Some(record) = self.process_item(item, catalog, venue).await {
                            report.records.push(record);
                        }
                    }
                }
                Err(e) if e.is_auth() => {
                    self.client.clear_session();
                    warn!(venue = %venue, error = %e, "session rejected; dropping cycle");
                    report.failures.push(format!("{venue}: {e}"));
                    report.records.clear();
                    return report;
                }
                Err(e @ BrokerError::Network(_)) => {
                    warn!(venue = %venue, error = %e, "network failure; dropping cycle");
                    report.failures.push(format!("{venue}: {e}"));
                    report.records.clear();
                    return report;
                }
                Err(e) => {
                    warn!(venue = %venue, batch = i, error = %e, "quote batch skipped");
                    report.failures.push(format!("{venue} batch {i}: {e}"));
                }
            }

            if i + 1 < batch_count {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        report
    }

    async fn process_item(
        &self,
        item: &Value,
        catalog: &[(&'static str, InstrumentInfo)],
        venue: Venue,
    ) -> Option<InstrumentRecord> {
        let mut record = match parse_quote_item(item, catalog) {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                warn!(venue = %venue, error = %e, "quote item skipped");
                return None;
            }
        };

        if venue == Venue::Derivative && record.open_interest > 0 {
            let (change, source) = self.net_oi_change(&record.token, record.open_interest).await;
            record.net_open_interest_change = change;
            record.oi_change_source = source;
        }

        Some(record)
    }

    async fn net_oi_change(&self, token: &str, current_oi: u64) -> (i64, OiChangeSource) {
        match self.historical_oi.previous_oi(token).await {
            Some(previous) if previous > 0 => (
                current_oi as i64 - previous as i64,
                OiChangeSource::Historical,
            ),
            _ => match self.oi_fallback.synthesize(current_oi) {
                Some(change) => (change, OiChangeSource::Synthetic),
                None => (0, OiChangeSource::None),
            },
        }
    }
}

// =============================================================================
// Pure helpers
// =============================================================================

/// Split catalog tokens into request-sized groups, preserving catalog order.
pub fn token_batches(
    catalog: &[(&'static str, InstrumentInfo)],
    batch_size: usize,
) -> Vec<Vec<&'static str>> {
    let size = batch_size.clamp(1, MAX_BATCH_SIZE);
    catalog
        .chunks(size)
        .map(|chunk| chunk.iter().map(|(token, _)| *token).collect())
        .collect()
}

/// Parse one broker quote object into a record with zero OI change.
///
/// `Ok(None)` for tokens outside `catalog`; `Err` when `symbolToken` is
/// missing.
pub fn parse_quote_item(
    item: &Value,
    catalog: &[(&'static str, InstrumentInfo)],
) -> Result<Option<InstrumentRecord>, BrokerError> {
    let token = match item.get("symbolToken") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            return Err(BrokerError::DataShape(
                "quote item missing 'symbolToken'".into(),
            ))
        }
    };

    let Some(info) = catalog::lookup(catalog, &token) else {
        debug!(token = %token, "quote for token outside catalog ignored");
        return Ok(None);
    };

    let num = |key: &str| item.get(key).and_then(json_f64).unwrap_or(0.0);
    let count = |key: &str| num(key).max(0.0) as u64;

    Ok(Some(InstrumentRecord {
        token,
        symbol: info.symbol.to_string(),
        name: info.name.to_string(),
        company: info.company.to_string(),
        weight: info.weight,
        ltp: num("ltp"),
        open: num("open"),
        high: num("high"),
        low: num("low"),
        close: num("close"),
        net_change: num("netChange"),
        percent_change: num("percentChange"),
        trade_volume: count("tradeVolume"),
        open_interest: count("opnInterest"),
        net_open_interest_change: 0,
        oi_change_source: OiChangeSource::None,
        trading_symbol: item
            .get("tradingSymbol")
            .and_then(Value::as_str)
            .unwrap_or(info.symbol)
            .to_string(),
        pcr: None,
    }))
}

/// Give futures records the PCR listed for their trading symbol.
pub fn attach_pcr(records: &mut [InstrumentRecord], ratios: &HashMap<String, f64>) -> usize {
    let mut attached = 0;
    for record in records.iter_mut() {
        if let Some(pcr) = ratios.get(&record.trading_symbol) {
            if *pcr > 0.0 {
                record.pcr = Some(*pcr);
                attached += 1;
            }
        }
    }
    attached
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BANK_NIFTY_FUTURES, NIFTY_50_STOCKS};
    use crate::config::BrokerCredentials;
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedHistory(Option<u64>);

    #[async_trait]
    impl HistoricalOiProvider for FixedHistory {
        async fn previous_oi(&self, _token: &str) -> Option<u64> {
            self.0
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn fetcher(history: Option<u64>, fallback: Arc<dyn OiChangeFallback>) -> MarketDataFetcher {
        let client = Arc::new(
            BrokerClient::new(&AppConfig::default(), BrokerCredentials::default()).unwrap(),
        );
        MarketDataFetcher::new(
            client,
            Arc::new(FixedHistory(history)),
            fallback,
            50,
            Duration::ZERO,
        )
    }

    #[test]
    fn batches_never_exceed_fifty() {
        let batches = token_batches(NIFTY_50_STOCKS, 50);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 48);

        let batches = token_batches(NIFTY_50_STOCKS, 10);
        assert_eq!(batches.len(), 5);
        assert_eq!(batches[4].len(), 8);
        assert_eq!(batches[0][0], NIFTY_50_STOCKS[0].0);

        let batches = token_batches(NIFTY_50_STOCKS, 500);
        assert!(batches.iter().all(|b| b.len() <= MAX_BATCH_SIZE));
    }

    #[test]
    fn parse_quote_item_fills_catalog_fields() {
        let item = json!({
            "symbolToken": "52223",
            "tradingSymbol": "AXISBANK28OCT25FUT",
            "ltp": 1180.5,
            "open": "1170",
            "high": 1185.0,
            "low": 1165.25,
            "close": 1172.0,
            "netChange": 8.5,
            "percentChange": 0.73,
            "tradeVolume": 2_500_000,
            "opnInterest": 48_000_000,
        });
        let rec = parse_quote_item(&item, BANK_NIFTY_FUTURES).unwrap().unwrap();
        assert_eq!(rec.name, "AXISBANK");
        assert!((rec.weight - 8.97).abs() < 1e-9);
        assert!((rec.open - 1170.0).abs() < 1e-9);
        assert_eq!(rec.trade_volume, 2_500_000);
        assert_eq!(rec.open_interest, 48_000_000);
        assert_eq!(rec.net_open_interest_change, 0);
        assert_eq!(rec.trading_symbol, "AXISBANK28OCT25FUT");
    }

    #[test]
    fn parse_quote_item_accepts_numeric_token_and_defaults_fields() {
        let item = json!({ "symbolToken": 1333 });
        let rec = parse_quote_item(&item, NIFTY_50_STOCKS).unwrap().unwrap();
        assert_eq!(rec.token, "1333");
        assert_eq!(rec.ltp, 0.0);
        assert_eq!(rec.trading_symbol, "HDFCBANK-EQ");
    }

    #[test]
    fn parse_quote_item_zeroes_non_finite_fields() {
        let item = json!({
            "symbolToken": "52223",
            "percentChange": "inf",
            "ltp": "NaN",
            "opnInterest": 1000,
        });
        let rec = parse_quote_item(&item, BANK_NIFTY_FUTURES).unwrap().unwrap();
        assert_eq!(rec.percent_change, 0.0);
        assert_eq!(rec.ltp, 0.0);
        assert_eq!(rec.open_interest, 1000);
    }

    #[test]
    fn parse_quote_item_skips_unknown_and_rejects_malformed() {
        assert!(parse_quote_item(&json!({ "symbolToken": "999999" }), NIFTY_50_STOCKS)
            .unwrap()
            .is_none());
        assert!(matches!(
            parse_quote_item(&json!({ "exchToken": "1333" }), NIFTY_50_STOCKS),
            Err(BrokerError::DataShape(_))
        ));
    }

    #[test]
    fn attach_pcr_matches_trading_symbol() {
        let mut records = vec![
            InstrumentRecord {
                trading_symbol: "SBIN28OCT25FUT".into(),
                ..Default::default()
            },
            InstrumentRecord {
                trading_symbol: "PNB28OCT25FUT".into(),
                ..Default::default()
            },
        ];
        let ratios = HashMap::from([("SBIN28OCT25FUT".to_string(), 1.3)]);
        assert_eq!(attach_pcr(&mut records, &ratios), 1);
        assert_eq!(records[0].pcr, Some(1.3));
        assert_eq!(records[1].pcr, None);
    }

    #[tokio::test]
    async fn historical_oi_wins_over_fallback() {
        let f = fetcher(Some(900), Arc::new(RandomPerturbation::seeded(1)));
        assert_eq!(f.net_oi_change("52223", 1000).await, (100, OiChangeSource::Historical));
    }

    #[tokio::test]
    async fn missing_history_uses_flagged_fallback() {
        let f = fetcher(None, Arc::new(RandomPerturbation::seeded(1)));
        let (change, source) = f.net_oi_change("52223", 100_000).await;
        assert_eq!(source, OiChangeSource::Synthetic);
        assert!(change.abs() <= 5000);

        let f = fetcher(Some(0), Arc::new(ZeroFallback));
        assert_eq!(f.net_oi_change("52223", 100_000).await, (0, OiChangeSource::None));
    }

    #[tokio::test]
    async fn cash_items_keep_zero_oi_change() {
        let f = fetcher(Some(1), Arc::new(RandomPerturbation::seeded(1)));
        let item = json!({ "symbolToken": "1333", "opnInterest": 0, "percentChange": 1.0 });
        let rec = f.process_item(&item, NIFTY_50_STOCKS, Venue::Cash).await.unwrap();
        assert_eq!(rec.net_open_interest_change, 0);
        assert_eq!(rec.oi_change_source, OiChangeSource::None);
    }

    #[tokio::test]
    async fn fetch_without_credentials_returns_empty() {
        let f = fetcher(None, Arc::new(ZeroFallback));
        let report = f.fetch(NIFTY_50_STOCKS, Venue::Cash).await;
        assert!(report.records.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("BROKER_API_KEY"));
    }

    // -------------------------------------------------------------------------
    // Against an in-process fake broker
    // -------------------------------------------------------------------------

    use std::time::Instant;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use axum::{Json, Router};
    use parking_lot::Mutex;

    use crate::catalog::NIFTY_50_FUTURES;

    #[derive(Clone, Copy)]
    enum Reply {
        Serve,
        Status(u16),
        NotJson,
    }

    #[derive(Default)]
    struct FakeBroker {
        /// Reply for the n-th quote call; later calls are served.
        script: Vec<Reply>,
        /// Tokens reported under `unfetched`.
        missing: Vec<&'static str>,
        logins: Mutex<usize>,
        calls: Mutex<Vec<(Vec<String>, Instant)>>,
    }

    async fn fake_login(State(fake): State<Arc<FakeBroker>>) -> Json<Value> {
        *fake.logins.lock() += 1;
        Json(json!({ "status": true, "message": "SUCCESS", "data": { "jwtToken": "jwt" } }))
    }

    async fn fake_quote(State(fake): State<Arc<FakeBroker>>, Json(body): Json<Value>) -> Response {
        let tokens: Vec<String> = body["exchangeTokens"]
            .as_object()
            .and_then(|m| m.values().next())
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|t| t.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        let index = {
            let mut calls = fake.calls.lock();
            calls.push((tokens.clone(), Instant::now()));
            calls.len() - 1
        };

        match fake.script.get(index).copied().unwrap_or(Reply::Serve) {
            Reply::Status(code) => (
                StatusCode::from_u16(code).unwrap(),
                Json(json!({ "status": false, "message": "rejected" })),
            )
                .into_response(),
            Reply::NotJson => (StatusCode::OK, "<html>maintenance</html>").into_response(),
            Reply::Serve => {
                let (unfetched, fetched): (Vec<_>, Vec<_>) = tokens
                    .iter()
                    .partition(|t| fake.missing.iter().any(|m| *m == t.as_str()));
                let fetched: Vec<Value> = fetched
                    .iter()
                    .map(|t| json!({ "symbolToken": t, "ltp": 100.0, "percentChange": 1.0 }))
                    .collect();
                let unfetched: Vec<Value> = unfetched
                    .iter()
                    .map(|t| json!({ "symbolToken": t, "message": "not found" }))
                    .collect();
                Json(json!({
                    "status": true,
                    "data": { "fetched": fetched, "unfetched": unfetched },
                }))
                .into_response()
            }
        }
    }

    async fn spawn_fake_broker(fake: Arc<FakeBroker>) -> String {
        let app = Router::new()
            .route("/rest/auth/angelbroking/user/v1/loginByPassword", post(fake_login))
            .route("/rest/secure/angelbroking/market/v1/quote/", post(fake_quote))
            .with_state(fake);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn live_fetcher(
        fake: Arc<FakeBroker>,
        batch_size: usize,
        batch_delay: Duration,
    ) -> (MarketDataFetcher, Arc<BrokerClient>) {
        let config = AppConfig {
            base_url: spawn_fake_broker(fake).await,
            ..AppConfig::default()
        };
        let creds = BrokerCredentials {
            api_key: "key".into(),
            client_code: "C123".into(),
            password: "1234".into(),
            totp_secret: "JBSWY3DPEHPK3PXP".into(),
        };
        let client = Arc::new(BrokerClient::new(&config, creds).unwrap());
        let fetcher = MarketDataFetcher::new(
            client.clone(),
            Arc::new(DisabledHistoricalOi),
            Arc::new(ZeroFallback),
            batch_size,
            batch_delay,
        );
        (fetcher, client)
    }

    #[tokio::test]
    async fn live_fetch_caps_each_call_at_fifty_tokens() {
        let fake = Arc::new(FakeBroker::default());
        let (f, client) = live_fetcher(fake.clone(), 500, Duration::ZERO).await;
        let catalog: Vec<_> = NIFTY_50_STOCKS.iter().chain(NIFTY_50_FUTURES).copied().collect();

        let report = f.fetch(&catalog, Venue::Cash).await;

        let sizes: Vec<usize> = fake.calls.lock().iter().map(|(t, _)| t.len()).collect();
        assert_eq!(sizes, vec![50, 45]);
        assert_eq!(report.records.len(), 95);
        assert!(report.failures.is_empty());
        assert_eq!(*fake.logins.lock(), 1);
        assert!(client.has_session());
    }

    #[tokio::test]
    async fn live_fetch_skips_unserved_tokens_and_failed_batches() {
        let fake = Arc::new(FakeBroker {
            script: vec![Reply::Serve, Reply::Status(500), Reply::NotJson],
            missing: vec![NIFTY_50_STOCKS[0].0, NIFTY_50_STOCKS[45].0],
            ..FakeBroker::default()
        });
        let (f, client) = live_fetcher(fake.clone(), 10, Duration::ZERO).await;

        let report = f.fetch(NIFTY_50_STOCKS, Venue::Cash).await;

        // Batches 1 and 2 are lost; the rest minus two unserved tokens survive.
        assert_eq!(fake.calls.lock().len(), 5);
        assert_eq!(report.records.len(), 48 - 20 - 2);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures[0].contains("batch 1"));
        assert!(report.failures[1].contains("batch 2"));
        assert!(report.records.iter().all(|r| r.token != NIFTY_50_STOCKS[0].0));
        assert!(report.records.iter().any(|r| r.token == NIFTY_50_STOCKS[30].0));
        assert!(client.has_session());
    }

    #[tokio::test]
    async fn live_fetch_rejected_session_empties_basket() {
        for code in [401, 403] {
            let fake = Arc::new(FakeBroker {
                script: vec![Reply::Serve, Reply::Status(code)],
                ..FakeBroker::default()
            });
            let (f, client) = live_fetcher(fake.clone(), 10, Duration::ZERO).await;

            let report = f.fetch(NIFTY_50_STOCKS, Venue::Cash).await;

            assert!(report.records.is_empty(), "status {code}");
            assert_eq!(report.failures.len(), 1);
            assert_eq!(fake.calls.lock().len(), 2);
            assert!(!client.has_session());

            // The next cycle logs in again.
            let report = f.fetch(NIFTY_50_STOCKS, Venue::Cash).await;
            assert_eq!(report.records.len(), 48);
            assert_eq!(*fake.logins.lock(), 2);
        }
    }

    #[tokio::test]
    async fn live_fetch_pauses_between_batches_only() {
        let delay = Duration::from_millis(150);
        let fake = Arc::new(FakeBroker::default());
        let (f, _client) = live_fetcher(fake.clone(), 10, delay).await;

        let report = f.fetch(NIFTY_50_STOCKS, Venue::Cash).await;
        let finished = Instant::now();
        assert_eq!(report.records.len(), 48);

        let calls = fake.calls.lock();
        assert_eq!(calls.len(), 5);
        for pair in calls.windows(2) {
            assert!(pair[1].1.duration_since(pair[0].1) >= delay);
        }
        let last_call = calls[calls.len() - 1].1;
        assert!(finished.duration_since(last_call) < delay);
    }
}
