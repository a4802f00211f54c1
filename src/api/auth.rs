// =============================================================================
// Diagnostic Access: Bearer Token Extractor
// =============================================================================
//
// The diagnostic endpoints expose raw broker responses and force logins, so
// they require `Authorization: Bearer <SENTIMETER_ADMIN_TOKEN>`. The expected
// token is read once at startup into `AppState::admin_token`. Comparison is
// constant time.
//
// Usage as an Axum extractor:
//
//   async fn handler(_access: DebugAccess, State(state): State<Arc<AppState>>)
//
// When no token is configured every diagnostic request is refused with 403.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app_state::AppState;

/// Compare two byte slices in constant time.
///
/// A length mismatch returns early; the expected token length is not secret.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Proof that the request carried the admin token.
pub struct DebugAccess;

/// Rejection type returned when authentication fails.
#[derive(Debug)]
pub struct AccessRejection {
    message: &'static str,
}

impl IntoResponse for AccessRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for DebugAccess {
    type Rejection = AccessRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            warn!("SENTIMETER_ADMIN_TOKEN is not set; diagnostics disabled");
            return Err(AccessRejection {
                message: "Diagnostics are disabled",
            });
        };

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        let Some(token) = token else {
            warn!("Missing or malformed Authorization header");
            return Err(AccessRejection {
                message: "Missing or invalid authorization token",
            });
        };

        if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
            warn!("Invalid admin token presented");
            return Err(AccessRejection {
                message: "Invalid authorization token",
            });
        }

        Ok(DebugAccess)
    }
}

// =============================================================================
// Tests
// =============================================================================
