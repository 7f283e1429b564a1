use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use bookpay_sdk::objects::CallbackQuery;
use serde::Serialize;

use super::error_response;
use super::extractors::GatewayCallback;
use crate::state::AppState;

/// Body acknowledging a gateway push.
#[derive(Debug, Serialize)]
pub(super) struct CallbackAck {
    received: bool,
}

/// `POST /paymob-callback` — gateway transaction push.
///
/// Every authenticated delivery is acknowledged with `200`, whatever
/// happened internally, so the gateway does not keep retrying. Recording
/// runs on its own task and finishes even if the gateway hangs up first.
pub(super) async fn gateway_push(
    State(state): State<AppState>,
    callback: GatewayCallback,
) -> Json<CallbackAck> {
    match callback {
        GatewayCallback::Transaction(transaction) => {
            let order_id = transaction.order.id.clone();
            let receiver = state.receiver.clone();
            let task = tokio::spawn(async move { receiver.receive(&transaction).await });
            match task.await {
                Ok(Ok(outcome)) => {
                    tracing::info!(%order_id, ?outcome, "Gateway callback processed");
                }
                Ok(Err(e)) => {
                    tracing::error!(%order_id, error = %e, "Failed to record payment confirmation");
                }
                Err(e) => {
                    tracing::error!(%order_id, error = %e, "Payment confirmation task failed");
                }
            }
        }
        GatewayCallback::Unusable(reason) => {
            tracing::warn!(reason, "Acknowledging gateway callback without recording");
        }
    }
    Json(CallbackAck { received: true })
}

/// `GET /paymob-callback?order=...` — the buyer's browser returning from
/// the payment page.
///
/// The redirect is not trusted and never writes; it answers with the same
/// view as `GET /verify/{order}`.
pub(super) async fn browser_redirect(
    State(state): State<AppState>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> impl IntoResponse {
    let order = match query {
        Ok(Query(CallbackQuery {
            order: Some(order), ..
        })) => order,
        _ => return error_response(StatusCode::BAD_REQUEST, "order is required"),
    };

    match state.receiver.verify(order.as_str()).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => {
            tracing::error!(order_id = %order, error = %e, "Callback redirect ledger error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}
