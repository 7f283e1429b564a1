//! Public API request and response types.

pub mod callback;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use callback::{CallbackPayload, CallbackQuery, GatewayOrderId, TransactionCallback};

/// Request body for `POST /pay`.
///
/// Both fields are optional on the wire so that a missing field is reported
/// as an invalid request rather than a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    /// Price in major currency units (e.g. `100` or `99.50`).
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub book_id: Option<i64>,
}

/// Response body for `POST /pay`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayResponse {
    /// Hosted payment page the buyer should be sent to.
    pub url: String,
    /// Order id assigned by the payment gateway.
    pub order_id: String,
}

/// Response body for `GET /verify/{orderId}`.
///
/// ```json
/// {"status": "paid", "bookId": 7, "accessKey": "..."}
/// {"status": "not paid"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all_fields = "camelCase")]
pub enum VerifyResponse {
    #[serde(rename = "paid")]
    Paid { book_id: i64, access_key: String },
    #[serde(rename = "not paid")]
    NotPaid,
}

impl VerifyResponse {
    pub fn is_paid(&self) -> bool {
        matches!(self, VerifyResponse::Paid { .. })
    }
}

/// A catalog entry as listed by `GET /books`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

/// Generic error body returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}
