use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use bookpay_core::services::InitiationError;
use bookpay_sdk::objects::{PayRequest, PayResponse};

use super::error_response;
use crate::state::AppState;

/// `POST /pay` — start a purchase.
///
/// Runs the gateway sequence and returns the hosted payment page together
/// with the gateway's order id, which the buyer later polls with
/// `GET /verify/{order_id}`.
pub(super) async fn pay(
    State(state): State<AppState>,
    body: Result<Json<PayRequest>, JsonRejection>,
) -> Result<impl IntoResponse, PayApiError> {
    let Json(request) = body.map_err(|e| {
        tracing::debug!(error = %e, "Rejected /pay body");
        PayApiError::MalformedBody
    })?;

    let payment = state.initiator.initiate(&request).await?;

    Ok(Json(PayResponse {
        url: payment.redirect_url.to_string(),
        order_id: payment.order_id.into_inner(),
    }))
}

/// Errors that can occur in `POST /pay`.
#[derive(Debug)]
pub(super) enum PayApiError {
    /// The body was not a JSON object.
    MalformedBody,
    Initiation(InitiationError),
}

impl From<InitiationError> for PayApiError {
    fn from(e: InitiationError) -> Self {
        PayApiError::Initiation(e)
    }
}

impl IntoResponse for PayApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            PayApiError::MalformedBody => {
                error_response(StatusCode::BAD_REQUEST, "invalid JSON body")
            }
            PayApiError::Initiation(InitiationError::InvalidRequest(reason)) => {
                error_response(StatusCode::BAD_REQUEST, reason)
            }
            // Upstream detail was logged by the initiator; callers get a
            // generic message only.
            PayApiError::Initiation(InitiationError::PaymentInitiationFailed(_)) => {
                error_response(
                    StatusCode::BAD_GATEWAY,
                    "payment could not be started, please try again",
                )
            }
            PayApiError::Initiation(InitiationError::Ledger(_)) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error",
            ),
        }
    }
}
