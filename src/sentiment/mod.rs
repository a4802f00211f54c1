// =============================================================================
// Sentiment Module
// =============================================================================
//
// - Weighted price / OI / PCR sentiment meter
// - Five-bucket status classification with fixed dashboard metadata
// - Bounded rolling history of meter readings

pub mod history;
pub mod scorer;
pub mod status;

pub use history::{HistoryPoint, MeterHistory};
pub use scorer::{evaluate, score, MeterBreakdown};
pub use status::{classify, MeterStatus, StatusClassification};
