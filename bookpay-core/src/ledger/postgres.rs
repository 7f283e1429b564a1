use super::{InsertOutcome, LedgerError, NewOrderIntent, NewPaidOrder, OrderLedger};
use crate::entities::order_intents::{GetOrderIntentById, InsertOrderIntent, OrderIntent};
use crate::entities::order_records::{
    GetOrderRecordById, GetPaidOrderRecordByAccessKey, InsertPaidOrderRecord,
    ListOrderRecordsByBook, OrderRecord,
};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;

/// Ledger backed by the `book_orders` and `order_intents` tables.
///
/// Uniqueness per order id is enforced by the primary key; a losing
/// concurrent insert falls back to reading the winner's row.
#[derive(Clone)]
pub struct PgLedger {
    processor: DatabaseProcessor,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            processor: DatabaseProcessor { pool },
        }
    }
}

#[async_trait]
impl OrderLedger for PgLedger {
    async fn find(&self, order_id: &str) -> Result<Option<OrderRecord>, LedgerError> {
        let record = self
            .processor
            .process(GetOrderRecordById {
                order_id: order_id.to_owned(),
            })
            .await?;
        Ok(record)
    }

    async fn insert_if_absent(&self, order: NewPaidOrder) -> Result<InsertOutcome, LedgerError> {
        let order_id = order.order_id.clone();
        let inserted = self
            .processor
            .process(InsertPaidOrderRecord {
                order_id: order.order_id,
                book_id: order.book_id,
                access_key: order.access_key,
            })
            .await?;

        if let Some(record) = inserted {
            return Ok(InsertOutcome::Inserted(record));
        }

        tracing::debug!(%order_id, "Order already recorded, keeping existing row");
        let existing = self
            .processor
            .process(GetOrderRecordById {
                order_id: order_id.clone(),
            })
            .await?
            .ok_or_else(|| {
                LedgerError::Inconsistent(format!(
                    "insert for order {order_id} conflicted but no row exists"
                ))
            })?;
        Ok(InsertOutcome::Existing(existing))
    }

    async fn record_intent(&self, intent: NewOrderIntent) -> Result<(), LedgerError> {
        let order_id = intent.order_id.clone();
        let inserted = self
            .processor
            .process(InsertOrderIntent {
                order_id: intent.order_id,
                book_id: intent.book_id,
                amount_cents: intent.amount_cents,
            })
            .await?;
        if inserted.is_none() {
            tracing::warn!(%order_id, "Order intent already recorded, keeping existing row");
        }
        Ok(())
    }

    async fn find_intent(&self, order_id: &str) -> Result<Option<OrderIntent>, LedgerError> {
        let intent = self
            .processor
            .process(GetOrderIntentById {
                order_id: order_id.to_owned(),
            })
            .await?;
        Ok(intent)
    }

    async fn list_by_book(&self, book_id: i64) -> Result<Vec<OrderRecord>, LedgerError> {
        let records = self
            .processor
            .process(ListOrderRecordsByBook { book_id })
            .await?;
        Ok(records)
    }

    async fn find_paid(
        &self,
        book_id: i64,
        access_key: &str,
    ) -> Result<Option<OrderRecord>, LedgerError> {
        let record = self
            .processor
            .process(GetPaidOrderRecordByAccessKey {
                book_id,
                access_key: access_key.to_owned(),
            })
            .await?;
        Ok(record)
    }
}
