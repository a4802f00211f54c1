// =============================================================================
// HTTP Façade
// =============================================================================
//
// - `rest`: dashboard, refresh, cached data, meters, history and diagnostics
// - `auth`: admin bearer-token extractor for the diagnostic routes

pub mod auth;
pub mod rest;
