use crate::catalog::SharedCatalog;
use crate::credential::issue_access_key;
use crate::ledger::{InsertOutcome, LedgerError, NewPaidOrder, OrderLedger};
use bookpay_sdk::objects::{TransactionCallback, VerifyResponse};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfirmationError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// What a callback did to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// A new paid record was written with a fresh access key.
    Recorded { order_id: String, book_id: i64 },
    /// The order was already recorded; nothing changed.
    Duplicate { order_id: String },
    /// The gateway reported a failed or pending transaction.
    NotSuccessful { order_id: String },
    /// No line item identified the purchased book.
    MissingBookId { order_id: String },
    /// The line item named a book that is not in the catalog.
    UnknownBook { order_id: String, book_id: i64 },
    /// No intent was recorded for the order at initiation.
    UnboundOrder { order_id: String },
    /// The callback's book or amount differs from the order's intent.
    IntentMismatch {
        order_id: String,
        expected_book_id: i64,
        book_id: i64,
        expected_amount_cents: i64,
        amount_cents: Option<i64>,
    },
}

/// Turns trusted gateway callbacks into paid ledger records and answers
/// payment status queries.
#[derive(Clone)]
pub struct ConfirmationReceiver {
    ledger: Arc<dyn OrderLedger>,
    catalog: SharedCatalog,
}

impl ConfirmationReceiver {
    pub fn new(ledger: Arc<dyn OrderLedger>, catalog: SharedCatalog) -> Self {
        Self { ledger, catalog }
    }

    /// Record a successful transaction.
    ///
    /// The callback must already be authenticated. The book id comes from a
    /// line item the signature does not cover, so it is only trusted when it
    /// matches the intent stored at initiation, together with the signed
    /// amount. Redelivery is harmless: the first recorded access key is kept
    /// and later deliveries report [`ConfirmationOutcome::Duplicate`].
    #[tracing::instrument(skip_all, fields(order_id = %callback.order.id))]
    pub async fn receive(
        &self,
        callback: &TransactionCallback,
    ) -> Result<ConfirmationOutcome, ConfirmationError> {
        let order_id = callback.order.id.as_str().to_owned();

        if !callback.is_successful() {
            info!(
                success = callback.success,
                pending = callback.pending,
                "Ignoring unsuccessful transaction"
            );
            return Ok(ConfirmationOutcome::NotSuccessful { order_id });
        }

        let Some(book_id) = callback.book_id() else {
            warn!("Successful transaction carries no book id, discarding");
            return Ok(ConfirmationOutcome::MissingBookId { order_id });
        };

        let Some(intent) = self.ledger.find_intent(&order_id).await? else {
            warn!(book_id, "Successful transaction for an order with no intent, discarding");
            return Ok(ConfirmationOutcome::UnboundOrder { order_id });
        };
        if intent.book_id != book_id || callback.amount_cents != Some(intent.amount_cents) {
            warn!(
                book_id,
                expected_book_id = intent.book_id,
                amount_cents = ?callback.amount_cents,
                expected_amount_cents = intent.amount_cents,
                "Successful transaction does not match its order intent, discarding"
            );
            return Ok(ConfirmationOutcome::IntentMismatch {
                order_id,
                expected_book_id: intent.book_id,
                book_id,
                expected_amount_cents: intent.amount_cents,
                amount_cents: callback.amount_cents,
            });
        }

        if !self.catalog.read().await.contains(book_id) {
            warn!(book_id, "Successful transaction names an unknown book, discarding");
            return Ok(ConfirmationOutcome::UnknownBook { order_id, book_id });
        }

        // Cheap pre-check; insert_if_absent is still the arbiter under races.
        if self.ledger.find(&order_id).await?.is_some() {
            info!("Order already recorded");
            return Ok(ConfirmationOutcome::Duplicate { order_id });
        }

        let outcome = self
            .ledger
            .insert_if_absent(NewPaidOrder {
                order_id: order_id.clone(),
                book_id,
                access_key: issue_access_key(),
            })
            .await?;

        match outcome {
            InsertOutcome::Inserted(_) => {
                info!(book_id, "Order recorded as paid");
                Ok(ConfirmationOutcome::Recorded { order_id, book_id })
            }
            InsertOutcome::Existing(_) => {
                info!("Order recorded concurrently by another delivery");
                Ok(ConfirmationOutcome::Duplicate { order_id })
            }
        }
    }

    /// Payment status of an order, read from the ledger only.
    pub async fn verify(&self, order_id: &str) -> Result<VerifyResponse, LedgerError> {
        let record = self.ledger.find(order_id).await?;
        Ok(match record {
            Some(record) => match record.paid_access_key() {
                Some(key) => VerifyResponse::Paid {
                    book_id: record.book_id,
                    access_key: key.to_owned(),
                },
                None => VerifyResponse::NotPaid,
            },
            None => VerifyResponse::NotPaid,
        })
    }
}
