// =============================================================================
// Sentiment Meter: weighted price / OI / PCR aggregation into [-1, +1]
// =============================================================================
//
// Per basket:
//   1. Weighted averages of price change %, OI change % and PCR.
//   2. The (price, OI) sign pair selects a positioning pattern; PCR gates the
//      strong vs. mixed variant when both move up or price falls on rising OI.
//   3. A PCR modifier amplifies extreme PCR and dampens neutral PCR.
//   4. Clamp to [-1, +1].
//
// The constants below are empirical and kept verbatim; they form a versioned
// table, not a calibrated model.
// =============================================================================

use serde::Serialize;
use tracing::debug;

use crate::types::InstrumentRecord;

/// A supplied PCR equal to this value is treated as "not supplied".
pub const SENTINEL_PCR: f64 = 1.0;

/// Volume normaliser for the cash-equity OI proxy.
const VOLUME_SCALE: f64 = 100_000.0;

/// PCR above which rising price + rising OI counts as a long buildup.
const LONG_BUILDUP_PCR: f64 = 1.1;
/// PCR below which falling price + rising OI counts as a short buildup.
const SHORT_BUILDUP_PCR: f64 = 0.9;

/// Positioning pattern read from the (price, OI) sign pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Positioning {
    /// Price ↑, OI ↑, PCR > 1.1.
    LongBuildup,
    /// Price ↑, OI ↑, PCR ≤ 1.1.
    MixedBullish,
    /// Price ↓, OI ↑, PCR < 0.9.
    ShortBuildup,
    /// Price ↓, OI ↑, PCR ≥ 0.9.
    MixedBearish,
    /// Price ↑, OI ↓.
    ShortCovering,
    /// Price ↓, OI ↓.
    LongUnwinding,
    /// Either average is exactly zero.
    LowConviction,
}

/// Full trace of one meter evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct MeterBreakdown {
    pub avg_price_change: f64,
    pub avg_oi_change: f64,
    pub avg_pcr: f64,
    pub positioning: Positioning,
    pub raw_sentiment: f64,
    pub pcr_modifier: f64,
    /// Final clamped score in [-1, +1].
    pub score: f64,
    pub instruments: usize,
    pub total_weight: f64,
}

impl MeterBreakdown {
    fn neutral(instruments: usize, total_weight: f64) -> Self {
        Self {
            avg_price_change: 0.0,
            avg_oi_change: 0.0,
            avg_pcr: 0.0,
            positioning: Positioning::LowConviction,
            raw_sentiment: 0.0,
            pcr_modifier: 1.0,
            score: 0.0,
            instruments,
            total_weight,
        }
    }
}

/// Effective OI change in percent for one record.
///
/// Uses the reported net change against current OI when both are present;
/// otherwise a volume × price proxy (meaningful mostly for cash equities).
pub fn effective_oi_change(record: &InstrumentRecord) -> f64 {
    if record.open_interest > 0 && record.net_open_interest_change != 0 {
        return record.net_open_interest_change as f64 / record.open_interest as f64 * 100.0;
    }
    if record.trade_volume > 0 && record.percent_change != 0.0 {
        (record.trade_volume as f64 / VOLUME_SCALE) * (record.percent_change / 10.0)
    } else {
        0.0
    }
}

/// Effective PCR for one record: the supplied value, or a price-derived proxy.
pub fn effective_pcr(record: &InstrumentRecord) -> f64 {
    match record.pcr {
        Some(pcr) if pcr != SENTINEL_PCR => pcr,
        _ if record.percent_change > 0.0 => 1.1 + record.percent_change / 100.0,
        _ => 0.9 + record.percent_change / 100.0,
    }
}

/// Raw sentiment from basket averages, before the PCR modifier and clamp.
pub fn raw_sentiment(avg_price: f64, avg_oi: f64, avg_pcr: f64) -> (Positioning, f64) {
    if avg_price > 0.0 && avg_oi > 0.0 {
        if avg_pcr > LONG_BUILDUP_PCR {
            (
                Positioning::LongBuildup,
                0.6 + avg_price / 200.0 + avg_oi / 500.0,
            )
        } else {
            (Positioning::MixedBullish, 0.3 + avg_price / 300.0)
        }
    } else if avg_price < 0.0 && avg_oi > 0.0 {
        if avg_pcr < SHORT_BUILDUP_PCR {
            (
                Positioning::ShortBuildup,
                -0.6 + avg_price / 200.0 - avg_oi / 500.0,
            )
        } else {
            (Positioning::MixedBearish, -0.3 + avg_price / 300.0)
        }
    } else if avg_price > 0.0 && avg_oi < 0.0 {
        (Positioning::ShortCovering, 0.4 + avg_price / 250.0)
    } else if avg_price < 0.0 && avg_oi < 0.0 {
        (Positioning::LongUnwinding, -0.4 + avg_price / 250.0)
    } else {
        (Positioning::LowConviction, avg_price / 400.0)
    }
}

/// Extreme PCR amplifies, neutral PCR dampens.
pub fn pcr_modifier(avg_pcr: f64) -> f64 {
    if avg_pcr > 1.2 || avg_pcr < 0.8 {
        1.15
    } else if (0.9..=1.1).contains(&avg_pcr) {
        0.85
    } else {
        1.0
    }
}

/// Evaluate the meter with its full breakdown.
///
/// Total function: empty input, zero total weight, or a NaN result yield the
/// neutral score 0.0; infinite results clamp to ±1. Negative weights are
/// treated as 0.
pub fn evaluate(records: &[InstrumentRecord]) -> MeterBreakdown {
    if records.is_empty() {
        return MeterBreakdown::neutral(0, 0.0);
    }

    let mut weighted_price = 0.0;
    let mut weighted_oi = 0.0;
    let mut weighted_pcr = 0.0;
    let mut total_weight = 0.0;

    for record in records {
        let weight = record.weight.max(0.0);
        weighted_price += weight * record.percent_change;
        weighted_oi += weight * effective_oi_change(record);
        weighted_pcr += weight * effective_pcr(record);
        total_weight += weight;
    }

    if total_weight <= 0.0 || !total_weight.is_finite() {
        return MeterBreakdown::neutral(records.len(), total_weight);
    }

    let avg_price_change = weighted_price / total_weight;
    let avg_oi_change = weighted_oi / total_weight;
    let avg_pcr = weighted_pcr / total_weight;

    let (positioning, raw) = raw_sentiment(avg_price_change, avg_oi_change, avg_pcr);
    let modifier = pcr_modifier(avg_pcr);
    let product = raw * modifier;
    let score = if product.is_nan() {
        0.0
    } else {
        product.clamp(-1.0, 1.0)
    };

    debug!(
        avg_price_change,
        avg_oi_change,
        avg_pcr,
        raw_sentiment = raw,
        pcr_modifier = modifier,
        score,
        instruments = records.len(),
        total_weight,
        ?positioning,
        "sentiment meter evaluated"
    );

    MeterBreakdown {
        avg_price_change,
        avg_oi_change,
        avg_pcr,
        positioning,
        raw_sentiment: raw,
        pcr_modifier: modifier,
        score,
        instruments: records.len(),
        total_weight,
    }
}

/// Sentiment score in [-1, +1] for one basket.
pub fn score(records: &[InstrumentRecord]) -> f64 {
    evaluate(records).score
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(weight: f64, pct: f64, oi: u64, net_oi: i64, volume: u64) -> InstrumentRecord {
        InstrumentRecord {
            token: "t".into(),
            weight,
            percent_change: pct,
            open_interest: oi,
            net_open_interest_change: net_oi,
            trade_volume: volume,
            ..Default::default()
        }
    }

    #[test]
    fn empty_input_is_neutral() {
        assert_eq!(score(&[]), 0.0);
    }

    #[test]
    fn zero_total_weight_is_neutral() {
        let records = vec![rec(0.0, 5.0, 1000, 100, 0), rec(0.0, -3.0, 0, 0, 10)];
        let b = evaluate(&records);
        assert_eq!(b.score, 0.0);
        assert_eq!(b.instruments, 2);
    }

    #[test]
    fn worked_example_single_long_buildup_record() {
        let records = vec![rec(50.0, 2.0, 1000, 100, 0)];
        let b = evaluate(&records);
        assert!((b.avg_price_change - 2.0).abs() < 1e-12);
        assert!((b.avg_oi_change - 10.0).abs() < 1e-12);
        assert!((b.avg_pcr - 1.12).abs() < 1e-12);
        assert_eq!(b.positioning, Positioning::LongBuildup);
        assert!((b.raw_sentiment - 0.63).abs() < 1e-9);
        assert_eq!(b.pcr_modifier, 1.0);
        assert!((b.score - 0.63).abs() < 1e-9);
    }

    #[test]
    fn sentinel_pcr_is_replaced_by_proxy() {
        let mut r = rec(1.0, -4.0, 0, 0, 0);
        r.pcr = Some(1.0);
        assert!((effective_pcr(&r) - 0.86).abs() < 1e-12);
        r.pcr = Some(1.4);
        assert!((effective_pcr(&r) - 1.4).abs() < 1e-12);
        r.pcr = None;
        r.percent_change = 0.0;
        assert!((effective_pcr(&r) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn oi_change_prefers_reported_net_change() {
        assert!((effective_oi_change(&rec(1.0, 1.0, 2000, -100, 500_000)) + 5.0).abs() < 1e-12);
    }

    #[test]
    fn oi_change_falls_back_to_volume_proxy() {
        // 300k volume, +2 % => 3 * 0.2 = 0.6
        assert!((effective_oi_change(&rec(1.0, 2.0, 0, 0, 300_000)) - 0.6).abs() < 1e-12);
        // OI present but unchanged also falls back.
        assert!((effective_oi_change(&rec(1.0, -1.0, 5000, 0, 100_000)) + 0.1).abs() < 1e-12);
        assert_eq!(effective_oi_change(&rec(1.0, 0.0, 0, 0, 300_000)), 0.0);
        assert_eq!(effective_oi_change(&rec(1.0, 2.0, 0, 0, 0)), 0.0);
    }

    #[test]
    fn each_quadrant_selects_its_formula() {
        assert_eq!(raw_sentiment(1.0, 1.0, 1.2).0, Positioning::LongBuildup);
        assert_eq!(raw_sentiment(1.0, 1.0, 1.1).0, Positioning::MixedBullish);
        assert_eq!(raw_sentiment(-1.0, 1.0, 0.85).0, Positioning::ShortBuildup);
        assert_eq!(raw_sentiment(-1.0, 1.0, 0.9).0, Positioning::MixedBearish);
        assert_eq!(raw_sentiment(1.0, -1.0, 1.0).0, Positioning::ShortCovering);
        assert_eq!(raw_sentiment(-1.0, -1.0, 1.0).0, Positioning::LongUnwinding);
        assert_eq!(raw_sentiment(0.0, 5.0, 1.0).0, Positioning::LowConviction);
        assert_eq!(raw_sentiment(2.0, 0.0, 1.0).0, Positioning::LowConviction);

        let (_, v) = raw_sentiment(-5.0, -2.0, 1.0);
        assert!((v - (-0.4 - 0.02)).abs() < 1e-12);
        let (_, v) = raw_sentiment(4.0, 0.0, 1.0);
        assert!((v - 0.01).abs() < 1e-12);
    }

    #[test]
    fn pcr_modifier_bands() {
        assert_eq!(pcr_modifier(1.21), 1.15);
        assert_eq!(pcr_modifier(0.79), 1.15);
        assert_eq!(pcr_modifier(0.9), 0.85);
        assert_eq!(pcr_modifier(1.1), 0.85);
        assert_eq!(pcr_modifier(1.0), 0.85);
        assert_eq!(pcr_modifier(1.15), 1.0);
        assert_eq!(pcr_modifier(0.85), 1.0);
        assert_eq!(pcr_modifier(1.2), 1.0);
        assert_eq!(pcr_modifier(0.8), 1.0);
    }

    #[test]
    fn raw_sentiment_is_monotone_in_price_within_a_quadrant() {
        let cases = [(1.0, 1.5), (1.0, 1.0), (1.0, 0.5), (-1.0, 1.0)];
        for (oi, pcr) in cases {
            let mut prev = f64::NEG_INFINITY;
            for step in 1..=50 {
                let price = step as f64 * 0.2;
                let (_, v) = raw_sentiment(price, oi, pcr);
                assert!(v >= prev, "price {price} oi {oi} pcr {pcr}");
                prev = v;
            }
            let mut prev = f64::NEG_INFINITY;
            for step in (1..=50).rev() {
                let price = -(step as f64) * 0.2;
                let (_, v) = raw_sentiment(price, oi, pcr);
                assert!(v >= prev, "price {price} oi {oi} pcr {pcr}");
                prev = v;
            }
        }
    }

    #[test]
    fn extreme_inputs_clamp_to_unit_bounds() {
        // +50 %, OI +50 %: raw 0.95, pcr 1.6 => x1.15 => 1.0925 -> 1.0
        let up = vec![rec(10.0, 50.0, 1000, 500, 0)];
        assert_eq!(score(&up), 1.0);
        // -50 %, OI +50 %: pcr 0.4 => short buildup -0.95 x1.15 -> -1.0
        let down = vec![rec(10.0, -50.0, 1000, 500, 0)];
        assert_eq!(score(&down), -1.0);
    }

    #[test]
    fn infinite_price_change_clamps_instead_of_neutralising() {
        let up = vec![rec(50.0, f64::INFINITY, 1000, 100, 0)];
        assert_eq!(score(&up), 1.0);
        let down = vec![rec(50.0, f64::NEG_INFINITY, 1000, 100, 0)];
        assert_eq!(score(&down), -1.0);
        let nan = vec![rec(50.0, f64::NAN, 1000, 100, 0)];
        assert_eq!(score(&nan), 0.0);
    }

    #[test]
    fn score_is_bounded_for_arbitrary_inputs() {
        let mut state = 0x2545_f491_4f6c_dd1du64;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };
        for _ in 0..500 {
            let records: Vec<_> = (0..(next() % 8))
                .map(|_| {
                    let mut r = rec(
                        (next() % 1000) as f64 / 10.0,
                        ((next() % 4001) as f64 - 2000.0) / 10.0,
                        next() % 1_000_000,
                        (next() % 200_001) as i64 - 100_000,
                        next() % 10_000_000,
                    );
                    if next() % 3 == 0 {
                        r.pcr = Some((next() % 300) as f64 / 100.0);
                    }
                    r
                })
                .collect();
            let s = score(&records);
            assert!((-1.0..=1.0).contains(&s), "score {s} out of range");
        }
    }

    #[test]
    fn negative_weight_counts_as_zero() {
        let records = vec![rec(-10.0, 5.0, 1000, 100, 0), rec(10.0, 2.0, 1000, 100, 0)];
        let only_positive = vec![rec(10.0, 2.0, 1000, 100, 0)];
        assert!((score(&records) - score(&only_positive)).abs() < 1e-12);
    }

    #[test]
    fn weights_scale_basket_averages() {
        let records = vec![rec(3.0, 1.0, 0, 0, 0), rec(1.0, -3.0, 0, 0, 0)];
        let b = evaluate(&records);
        assert!((b.avg_price_change - 0.0).abs() < 1e-12);
        assert!((b.total_weight - 4.0).abs() < 1e-12);
        assert_eq!(b.positioning, Positioning::LowConviction);
    }
}
