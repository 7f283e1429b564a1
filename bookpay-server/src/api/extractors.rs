//! Custom Axum extractors for gateway callbacks.
//!
//! `GatewayCallback` reads a `POST /paymob-callback` request, checks the
//! `hmac` query parameter against the configured gateway secret, and hands
//! the handler a parsed transaction. Bodies the server cannot act on
//! (form-encoded, malformed JSON) are passed through as
//! [`GatewayCallback::Unusable`] so the handler can still acknowledge them.
//!
//! All cryptographic operations are delegated to [`bookpay_sdk::signature`].

use axum::{
    extract::{FromRequest, Query, Request},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bookpay_sdk::objects::{CallbackPayload, CallbackQuery, TransactionCallback};
use bookpay_sdk::signature::{self, SignatureError};

use super::error_response;
use crate::state::AppState;

const MAX_CALLBACK_BODY: usize = 1024 * 1024;

/// A gateway push, authenticated when a secret is configured.
#[derive(Debug)]
pub enum GatewayCallback {
    /// A transaction result that may be recorded.
    Transaction(TransactionCallback),
    /// A delivery that is acknowledged but cannot be recorded.
    Unusable(&'static str),
}

/// Errors returned by the [`GatewayCallback`] extractor.
#[derive(Debug, thiserror::Error)]
pub enum CallbackRejection {
    #[error("missing hmac query parameter")]
    MissingSignature,
    #[error("invalid signature encoding")]
    InvalidHex,
    #[error("signature verification failed")]
    SignatureMismatch,
}

impl From<SignatureError> for CallbackRejection {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::InvalidHex => Self::InvalidHex,
            SignatureError::SignatureMismatch => Self::SignatureMismatch,
        }
    }
}

impl IntoResponse for CallbackRejection {
    fn into_response(self) -> Response {
        tracing::warn!(reason = %self, "Rejected unauthenticated gateway callback");
        error_response(StatusCode::UNAUTHORIZED, self.to_string())
    }
}

impl FromRequest<AppState> for GatewayCallback {
    type Rejection = CallbackRejection;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let provided_hmac = Query::<CallbackQuery>::try_from_uri(req.uri())
            .ok()
            .and_then(|Query(q)| q.hmac);

        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let body_bytes = match axum::body::to_bytes(req.into_body(), MAX_CALLBACK_BODY).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read callback body");
                return Ok(GatewayCallback::Unusable("unreadable body"));
            }
        };

        if is_form {
            return Ok(GatewayCallback::Unusable(
                "form-encoded body carries no line items",
            ));
        }

        let payload = match CallbackPayload::from_json(&body_bytes) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed callback payload");
                return Ok(GatewayCallback::Unusable("malformed payload"));
            }
        };

        let gateway = state.config.gateway.read().await;
        match gateway.hmac_secret_bytes() {
            Some(secret) => {
                let provided = provided_hmac.ok_or(CallbackRejection::MissingSignature)?;
                signature::verify_transaction(&payload.raw, &provided, secret)?;
            }
            None => {
                tracing::debug!("No gateway HMAC secret configured, accepting unsigned callback");
            }
        }
        drop(gateway);

        Ok(GatewayCallback::Transaction(payload.transaction))
    }
}
