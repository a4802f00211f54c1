// =============================================================================
// Meter Status: five-bucket classification of the sentiment score
// =============================================================================
//
// Buckets are evaluated top-down, first match wins:
//
//   score >  0.7          => Strong Bullish
//   0.3  <= score <=  0.7 => Mild Bullish
//  -0.3  <= score <=  0.3 => Neutral
//  -0.7  <= score <= -0.3 => Mild Bearish
//   otherwise             => Strong Bearish
//
// Shared boundaries therefore resolve toward the bucket listed first.
// =============================================================================

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeterStatus {
    StrongBullish,
    MildBullish,
    Neutral,
    MildBearish,
    StrongBearish,
}

/// Fixed dashboard metadata attached to a status bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusClassification {
    /// Display label, e.g. "Mild Bullish".
    pub status: &'static str,
    /// Bootstrap-style color tag.
    pub color: &'static str,
    pub icon: &'static str,
    /// Suggested action text.
    pub action: &'static str,
    pub trade_type: &'static str,
    pub confidence: &'static str,
}

const STRONG_BULLISH: StatusClassification = StatusClassification {
    status: "Strong Bullish",
    color: "success",
    icon: "🟢",
    action: "🚀 Go Long (Calls / Futures Buy / BTST Calls)",
    trade_type: "Directional Longs",
    confidence: "🚀 High",
};

const MILD_BULLISH: StatusClassification = StatusClassification {
    status: "Mild Bullish",
    color: "info",
    icon: "🟡",
    action: "📈 Buy on dips, avoid shorts",
    trade_type: "Call Scalps / Light Longs",
    confidence: "👍 Moderate",
};

const NEUTRAL: StatusClassification = StatusClassification {
    status: "Neutral",
    color: "secondary",
    icon: "🔵",
    action: "⚖️ Avoid directional trades; scalp both sides",
    trade_type: "Iron Fly / Straddle / Range scalps",
    confidence: "😐 Low",
};

const MILD_BEARISH: StatusClassification = StatusClassification {
    status: "Mild Bearish",
    color: "warning",
    icon: "🟠",
    action: "📉 Sell on rise, avoid longs",
    trade_type: "Put Scalps / Light Shorts",
    confidence: "👎 Moderate",
};

const STRONG_BEARISH: StatusClassification = StatusClassification {
    status: "Strong Bearish",
    color: "danger",
    icon: "🔴",
    action: "💣 Go Short (Puts / Futures Sell / BTST Puts)",
    trade_type: "Directional Shorts",
    confidence: "💣 High",
};

impl MeterStatus {
    /// Bucket for `score`. Total over f64; NaN lands in the final bucket.
    pub fn classify(score: f64) -> Self {
        if score > 0.7 {
            Self::StrongBullish
        } else if (0.3..=0.7).contains(&score) {
            Self::MildBullish
        } else if (-0.3..=0.3).contains(&score) {
            Self::Neutral
        } else if (-0.7..=-0.3).contains(&score) {
            Self::MildBearish
        } else {
            Self::StrongBearish
        }
    }

    pub fn info(self) -> &'static StatusClassification {
        match self {
            Self::StrongBullish => &STRONG_BULLISH,
            Self::MildBullish => &MILD_BULLISH,
            Self::Neutral => &NEUTRAL,
            Self::MildBearish => &MILD_BEARISH,
            Self::StrongBearish => &STRONG_BEARISH,
        }
    }
}

impl std::fmt::Display for MeterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.info().status)
    }
}

/// Classification metadata for `score`.
pub fn classify(score: f64) -> StatusClassification {
    *MeterStatus::classify(score).info()
}
