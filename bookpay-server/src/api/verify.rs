use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bookpay_core::ledger::LedgerError;

use super::error_response;
use crate::state::AppState;

/// `GET /verify/{order_id}` — poll payment status.
///
/// Unknown order ids are reported as `{"status": "not paid"}`.
pub(super) async fn verify(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, VerifyApiError> {
    let status = state
        .receiver
        .verify(order_id.trim())
        .await
        .map_err(VerifyApiError::Ledger)?;
    Ok(Json(status))
}

/// Errors that can occur when reading payment status.
#[derive(Debug)]
pub(super) enum VerifyApiError {
    Ledger(LedgerError),
}

impl IntoResponse for VerifyApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            VerifyApiError::Ledger(e) => {
                tracing::error!(error = %e, "Verify API ledger error");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}
