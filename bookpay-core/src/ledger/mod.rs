//! The order ledger: the single source of truth for which orders are paid
//! and which access key each paid order unlocks.
//!
//! Paid records are written through [`OrderLedger::insert_if_absent`] only.
//! A record is created once, by the first trusted payment confirmation that
//! matches the order's intent, and is never updated or deleted afterwards. When two writers race on the same order id
//! the loser gets [`InsertOutcome::Existing`] carrying the stored record, so
//! the first confirmation's access key always wins.
//!
//! Intents are written by [`OrderLedger::record_intent`] when the gateway
//! order is created. They pin the book and amount a later confirmation must
//! carry.

mod memory;
mod postgres;

pub use memory::MemoryLedger;
pub use postgres::PgLedger;

use crate::entities::order_intents::OrderIntent;
use crate::entities::order_records::OrderRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a ledger backend.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store violated one of the ledger's own guarantees.
    #[error("ledger inconsistency: {0}")]
    Inconsistent(String),
}

/// A paid order about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaidOrder {
    pub order_id: String,
    pub book_id: i64,
    pub access_key: String,
}

/// A freshly created gateway order and what it charges for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderIntent {
    pub order_id: String,
    pub book_id: i64,
    pub amount_cents: i64,
}

/// Result of [`OrderLedger::insert_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record did not exist and was written.
    Inserted(OrderRecord),
    /// A record already existed; it is returned unchanged and the new write
    /// was discarded.
    Existing(OrderRecord),
}

impl InsertOutcome {
    pub fn record(&self) -> &OrderRecord {
        match self {
            InsertOutcome::Inserted(r) | InsertOutcome::Existing(r) => r,
        }
    }

    pub fn into_record(self) -> OrderRecord {
        match self {
            InsertOutcome::Inserted(r) | InsertOutcome::Existing(r) => r,
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

/// Persistent store of orders keyed by gateway order id.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Look up an order. Absence is `Ok(None)`.
    async fn find(&self, order_id: &str) -> Result<Option<OrderRecord>, LedgerError>;

    /// Atomically insert `order` unless a record with the same order id
    /// exists.
    async fn insert_if_absent(&self, order: NewPaidOrder) -> Result<InsertOutcome, LedgerError>;

    /// Bind a gateway order to its book and amount. The first binding for
    /// an order id is kept.
    async fn record_intent(&self, intent: NewOrderIntent) -> Result<(), LedgerError>;

    /// The intent recorded for an order, if any.
    async fn find_intent(&self, order_id: &str) -> Result<Option<OrderIntent>, LedgerError>;

    /// All orders for a book, oldest first.
    async fn list_by_book(&self, book_id: i64) -> Result<Vec<OrderRecord>, LedgerError>;

    /// The paid order matching both `book_id` and `access_key`, if any.
    async fn find_paid(
        &self,
        book_id: i64,
        access_key: &str,
    ) -> Result<Option<OrderRecord>, LedgerError>;
}
