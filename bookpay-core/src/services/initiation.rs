use crate::catalog::SharedCatalog;
use crate::config::GatewayConfig;
use crate::gateway::{GatewayError, PaymentGateway, checkout_url};
use crate::ledger::{LedgerError, NewOrderIntent, OrderLedger};
use bookpay_sdk::objects::{GatewayOrderId, PayRequest};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info};
use url::Url;

#[derive(Debug, Error)]
pub enum InitiationError {
    /// Bad caller input; no remote call was made.
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    /// A gateway call failed and the sequence was aborted.
    #[error("payment initiation failed: {0}")]
    PaymentInitiationFailed(#[from] GatewayError),

    /// The order was created upstream but its intent could not be stored.
    #[error("failed to record order intent: {0}")]
    Ledger(#[from] LedgerError),
}

/// A started purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatedPayment {
    /// Hosted payment page for the buyer.
    pub redirect_url: Url,
    pub order_id: GatewayOrderId,
}

/// Starts purchases: authenticate → create order → create payment key.
#[derive(Clone)]
pub struct PaymentInitiator {
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<dyn OrderLedger>,
    catalog: SharedCatalog,
    config: Arc<RwLock<GatewayConfig>>,
}

impl PaymentInitiator {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<dyn OrderLedger>,
        catalog: SharedCatalog,
        config: Arc<RwLock<GatewayConfig>>,
    ) -> Self {
        Self {
            gateway,
            ledger,
            catalog,
            config,
        }
    }

    /// Validate the request and run the gateway sequence.
    ///
    /// The three calls are strictly ordered; the first failure aborts the
    /// rest. Once the gateway order exists its intent (book and amount) is
    /// stored, so a later payment key failure leaves an orphan intent that
    /// no confirmation will ever match.
    #[tracing::instrument(skip_all, fields(book_id = request.book_id))]
    pub async fn initiate(&self, request: &PayRequest) -> Result<InitiatedPayment, InitiationError> {
        let amount = request
            .amount
            .ok_or(InitiationError::InvalidRequest("amount is required"))?;
        let book_id = request
            .book_id
            .ok_or(InitiationError::InvalidRequest("bookId is required"))?;
        let amount_cents = to_minor_units(amount)?;

        if !self.catalog.read().await.contains(book_id) {
            return Err(InitiationError::InvalidRequest("unknown book"));
        }

        let result = self.run_gateway_sequence(amount_cents, book_id).await;
        match &result {
            Ok(payment) => {
                info!(order_id = %payment.order_id, amount_cents, "Payment initiated");
            }
            Err(e) => {
                error!(error = %e, amount_cents, "Payment initiation failed");
            }
        }
        result
    }

    async fn run_gateway_sequence(
        &self,
        amount_cents: i64,
        book_id: i64,
    ) -> Result<InitiatedPayment, InitiationError> {
        let token = self.gateway.authenticate().await?;
        let order_id = self
            .gateway
            .create_order(&token, amount_cents, book_id)
            .await?;

        self.ledger
            .record_intent(NewOrderIntent {
                order_id: order_id.as_str().to_owned(),
                book_id,
                amount_cents,
            })
            .await?;

        let billing = self.config.read().await.billing.clone();
        let payment_token = self
            .gateway
            .create_payment_key(&token, &order_id, amount_cents, &billing)
            .await?;

        let config = self.config.read().await;
        let redirect_url =
            checkout_url(&config.base_url, config.iframe_id, &payment_token, &order_id)?;
        Ok(InitiatedPayment {
            redirect_url,
            order_id,
        })
    }
}

/// Convert a major-unit amount to integer minor units (×100).
///
/// Rejects non-positive amounts, fractions of a minor unit and values that
/// do not fit an `i64`.
pub(crate) fn to_minor_units(amount: Decimal) -> Result<i64, InitiationError> {
    if amount <= Decimal::ZERO {
        return Err(InitiationError::InvalidRequest("amount must be positive"));
    }
    let cents = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(InitiationError::InvalidRequest("amount is too large"))?;
    if !cents.fract().is_zero() {
        return Err(InitiationError::InvalidRequest(
            "amount has more than two decimal places",
        ));
    }
    cents
        .to_i64()
        .ok_or(InitiationError::InvalidRequest("amount is too large"))
}
