// =============================================================================
// Broker REST API Client: TOTP login + bearer-token requests
// =============================================================================
//
// SECURITY: The password, TOTP secret and session token are never logged or
// serialized. Every request carries the broker's fixed client-identification
// headers and the API key as `X-PrivateKey`; authenticated calls add the JWT
// from the last successful login as a bearer token.
// =============================================================================

use std::collections::HashMap;

use anyhow::Context;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::error::{BrokerError, BrokerResult};
use super::totp::{self, TotpAlgorithm};
use crate::config::{AppConfig, BrokerCredentials};
use crate::types::Venue;

const LOGIN_PATH: &str = "/rest/auth/angelbroking/user/v1/loginByPassword";
const QUOTE_PATH: &str = "/rest/secure/angelbroking/market/v1/quote/";
const PCR_PATH: &str = "/rest/secure/angelbroking/marketData/v1/putCallRatio";
const OI_HISTORY_PATH: &str = "/rest/secure/angelbroking/historical/v1/getOIData";

/// Result of one batched quote call.
#[derive(Debug, Clone, Default)]
pub struct QuoteBatch {
    /// Raw per-instrument quote objects.
    pub fetched: Vec<Value>,
    /// Identifiers the broker could not serve.
    pub unfetched: Vec<Value>,
}

/// Raw HTTP exchange, kept for the diagnostic endpoints.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Broker API client holding the current session token.
pub struct BrokerClient {
    credentials: BrokerCredentials,
    base_url: String,
    totp_algorithm: TotpAlgorithm,
    client: reqwest::Client,
    session: RwLock<Option<String>>,
}

impl BrokerClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn new(config: &AppConfig, credentials: BrokerCredentials) -> anyhow::Result<Self> {
        let mut default_headers = HeaderMap::new();
        let fixed = [
            ("content-type", "application/json"),
            ("accept", "application/json"),
            ("x-usertype", "USER"),
            ("x-sourceid", "WEB"),
            ("x-clientlocalip", "192.168.1.1"),
            ("x-clientpublicip", "192.168.1.1"),
            ("x-macaddress", "00:00:00:00:00:00"),
        ];
        for (name, value) in fixed {
            default_headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        if let Ok(val) = HeaderValue::from_str(&credentials.api_key) {
            default_headers.insert(HeaderName::from_static("x-privatekey"), val);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(config.request_timeout())
            .build()
            .context("failed to build broker HTTP client")?;

        debug!(base_url = %config.base_url, "BrokerClient initialised");

        Ok(Self {
            credentials,
            base_url: config.base_url.clone(),
            totp_algorithm: config.totp_algorithm,
            client,
            session: RwLock::new(None),
        })
    }

    // -------------------------------------------------------------------------
    // Session
    // -------------------------------------------------------------------------

    pub fn has_session(&self) -> bool {
        self.session.read().is_some()
    }

    /// Length of the cached token (0 when logged out). Diagnostics only.
    pub fn session_token_len(&self) -> usize {
        self.session.read().as_ref().map_or(0, String::len)
    }

    pub fn clear_session(&self) {
        *self.session.write() = None;
    }

    pub fn credentials_present(&self) -> bool {
        self.credentials.missing().is_none()
    }

    /// POST loginByPassword with a fresh TOTP code and cache the JWT.
    #[instrument(skip(self), name = "broker::login")]
    pub async fn login(&self) -> BrokerResult<()> {
        if let Some(missing) = self.credentials.missing() {
            return Err(BrokerError::MissingCredentials(missing));
        }

        let code = totp::generate_now(&self.credentials.totp_secret, self.totp_algorithm)?;
        let body = json!({
            "clientcode": self.credentials.client_code,
            "password": self.credentials.password,
            "totp": code,
        });

        let resp = self
            .client
            .post(format!("{}{}", self.base_url, LOGIN_PATH))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "login rejected");
            return Err(BrokerError::Status {
                endpoint: "login",
                status: status.as_u16(),
            });
        }

        let body = decode_body("login", &resp.text().await?)?;
        let token = parse_login(&body)?;
        *self.session.write() = Some(token);
        info!("broker authentication successful");
        Ok(())
    }

    /// Log in only when no token is cached.
    pub async fn ensure_session(&self) -> BrokerResult<()> {
        if self.has_session() {
            return Ok(());
        }
        self.login().await
    }

    fn bearer(&self) -> BrokerResult<String> {
        self.session
            .read()
            .clone()
            .ok_or_else(|| BrokerError::Authentication("no active session".into()))
    }

    // -------------------------------------------------------------------------
    // Market data
    // -------------------------------------------------------------------------

    /// POST quote (mode FULL) for up to one batch of tokens on `venue`.
    #[instrument(skip(self, tokens), fields(count = tokens.len()), name = "broker::quote")]
    pub async fn quote(&self, venue: Venue, tokens: &[&str]) -> BrokerResult<QuoteBatch> {
        let body = self.post_authed("quote", QUOTE_PATH, &quote_request(venue, tokens)).await?;
        let data = parse_envelope(&body)?;

        let fetched = data
            .get("fetched")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| BrokerError::DataShape("quote data missing 'fetched' array".into()))?;
        let unfetched = data
            .get("unfetched")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        debug!(fetched = fetched.len(), unfetched = unfetched.len(), "quote batch received");
        Ok(QuoteBatch { fetched, unfetched })
    }

    /// Same request as [`quote`](Self::quote) without interpretation.
    #[instrument(skip(self, tokens), name = "broker::quote_raw")]
    pub async fn quote_raw(&self, venue: Venue, tokens: &[&str]) -> BrokerResult<RawResponse> {
        let token = self.bearer()?;
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, QUOTE_PATH))
            .bearer_auth(token)
            .json(&quote_request(venue, tokens))
            .send()
            .await?;
        Ok(RawResponse {
            status: resp.status().as_u16(),
            body: resp.text().await?,
        })
    }

    /// GET the put-call-ratio listing as `tradingSymbol → pcr`.
    #[instrument(skip(self), name = "broker::put_call_ratios")]
    pub async fn put_call_ratios(&self) -> BrokerResult<HashMap<String, f64>> {
        let raw = self.pcr_raw().await?;
        if raw.status == 401 || raw.status == 403 {
            self.clear_session();
        }
        if !(200..300).contains(&raw.status) {
            return Err(BrokerError::Status {
                endpoint: "putCallRatio",
                status: raw.status,
            });
        }
        let body: Value = serde_json::from_str(&raw.body)
            .map_err(|e| BrokerError::DataShape(format!("putCallRatio body: {e}")))?;
        let data = parse_envelope(&body)?;
        let ratios = parse_pcr_listing(data);
        debug!(count = ratios.len(), "put-call ratios received");
        Ok(ratios)
    }

    #[instrument(skip(self), name = "broker::pcr_raw")]
    pub async fn pcr_raw(&self) -> BrokerResult<RawResponse> {
        let token = self.bearer()?;
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, PCR_PATH))
            .bearer_auth(token)
            .send()
            .await?;
        Ok(RawResponse {
            status: resp.status().as_u16(),
            body: resp.text().await?,
        })
    }

    /// POST getOIData for one futures token over a date-time window
    /// (`YYYY-MM-DD HH:MM`). Returns the last reported OI, if positive.
    #[instrument(skip(self), name = "broker::historical_oi")]
    pub async fn historical_oi(
        &self,
        symbol_token: &str,
        from: &str,
        to: &str,
    ) -> BrokerResult<Option<u64>> {
        let request = json!({
            "exchange": Venue::Derivative.exchange_code(),
            "symboltoken": symbol_token,
            "interval": "ONE_DAY",
            "fromdate": from,
            "todate": to,
        });
        let body = self.post_authed("getOIData", OI_HISTORY_PATH, &request).await?;
        let data = parse_envelope(&body)?;
        Ok(parse_last_oi(data))
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    async fn post_authed(
        &self,
        endpoint: &'static str,
        path: &str,
        body: &Value,
    ) -> BrokerResult<Value> {
        let token = self.bearer()?;
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            if status.as_u16() == 401 || status.as_u16() == 403 {
                self.clear_session();
            }
            return Err(BrokerError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        decode_body(endpoint, &resp.text().await?)
    }
}

impl std::fmt::Debug for BrokerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerClient")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .field("has_session", &self.has_session())
            .finish()
    }
}

// =============================================================================
// Response parsing (pure)
// =============================================================================

fn quote_request(venue: Venue, tokens: &[&str]) -> Value {
    json!({
        "mode": "FULL",
        "exchangeTokens": { (venue.exchange_code()): tokens },
    })
}

/// Parse a response body; a 200 with a non-JSON body is a shape error, not a
/// transport failure.
fn decode_body(endpoint: &'static str, body: &str) -> BrokerResult<Value> {
    serde_json::from_str(body)
        .map_err(|e| BrokerError::DataShape(format!("{endpoint} body is not JSON: {e}")))
}

/// Unwrap the broker's `{status, message, data}` envelope.
pub(crate) fn parse_envelope(body: &Value) -> BrokerResult<&Value> {
    let ok = body.get("status").and_then(Value::as_bool).unwrap_or(false);
    if !ok {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no message");
        return Err(BrokerError::DataShape(format!("status=false: {message}")));
    }
    match body.get("data") {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(BrokerError::DataShape("response missing 'data'".into())),
    }
}

fn parse_login(body: &Value) -> BrokerResult<String> {
    let data = parse_envelope(body).map_err(|e| BrokerError::Authentication(e.to_string()))?;
    data.get("jwtToken")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| BrokerError::Authentication("login response missing jwtToken".into()))
}

fn parse_pcr_listing(data: &Value) -> HashMap<String, f64> {
    data.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let symbol = item.get("tradingSymbol")?.as_str()?;
                    let pcr = item.get("pcr").and_then(json_f64).unwrap_or(0.0);
                    Some((symbol.to_string(), pcr))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_last_oi(data: &Value) -> Option<u64> {
    let last = data.as_array()?.last()?;
    let oi = last.get("oi").and_then(json_f64)?;
    (oi > 0.0).then_some(oi as u64)
}

/// Read a JSON value that may be either a number or a numeric string.
/// Non-finite values ("inf", "NaN", overflowing literals) are rejected.
pub(crate) fn json_f64(val: &Value) -> Option<f64> {
    let parsed = match val {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

// =============================================================================
// Tests
// =============================================================================
