//! Payment gateway client.
//!
//! [`PaymentGateway`] wraps the three remote calls needed to start a
//! purchase. Each call is a single attempt bounded by the configured
//! timeout; nothing here retries and nothing here keeps state between calls.

mod paymob;

pub use paymob::PaymobClient;

use async_trait::async_trait;
use bookpay_sdk::objects::GatewayOrderId;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Errors produced by gateway calls.
///
/// The `String` payloads carry upstream detail for logs only; they must not
/// be echoed to API callers.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway authentication failed: {0}")]
    Auth(String),

    #[error("gateway order registration failed: {0}")]
    Order(String),

    #[error("gateway payment key request failed: {0}")]
    Key(String),

    #[error("gateway request timed out")]
    Timeout,

    #[error("invalid gateway configuration: {0}")]
    InvalidConfiguration(String),
}

/// Short-lived bearer token returned by [`PaymentGateway::authenticate`].
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(pub String);

/// Token for the hosted payment form.
#[derive(Clone, PartialEq, Eq)]
pub struct PaymentToken(pub String);

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(..)")
    }
}

impl fmt::Debug for PaymentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PaymentToken(..)")
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Exchange the static API key for a bearer token.
    async fn authenticate(&self) -> Result<AuthToken, GatewayError>;

    /// Register a purchase intent for `book_id` priced at `amount_cents`.
    async fn create_order(
        &self,
        token: &AuthToken,
        amount_cents: i64,
        book_id: i64,
    ) -> Result<GatewayOrderId, GatewayError>;

    /// Obtain a payment token for the hosted form of `order_id`.
    async fn create_payment_key(
        &self,
        token: &AuthToken,
        order_id: &GatewayOrderId,
        amount_cents: i64,
        billing: &crate::config::BillingInfo,
    ) -> Result<PaymentToken, GatewayError>;
}

/// Append path segments to a base URL.
///
/// Returns `None` for URLs that cannot carry a path (e.g. `mailto:`).
pub(crate) fn endpoint_url(base: &Url, segments: &[&str]) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(segments);
    Some(url)
}

/// Build the hosted payment page URL the buyer is redirected to.
pub fn checkout_url(
    base: &Url,
    iframe_id: u64,
    payment_token: &PaymentToken,
    order_id: &GatewayOrderId,
) -> Result<Url, GatewayError> {
    let iframe = iframe_id.to_string();
    let mut url = endpoint_url(base, &["acceptance", "iframes", &iframe]).ok_or_else(|| {
        GatewayError::InvalidConfiguration(format!("cannot build checkout url from {base}"))
    })?;
    url.query_pairs_mut()
        .append_pair("payment_token", &payment_token.0)
        .append_pair("order_id", order_id.as_str());
    Ok(url)
}
