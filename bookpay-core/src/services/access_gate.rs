use crate::catalog::{Book, SharedCatalog};
use crate::entities::order_records::OrderRecord;
use crate::ledger::{LedgerError, OrderLedger};
use std::sync::Arc;
use tracing::debug;

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The key belongs to a paid order for the requested book.
    Granted { book: Book, order: OrderRecord },
    /// Unknown book, missing key, or a key that does not unlock this book.
    Denied,
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted { .. })
    }
}

/// Decides whether an access key unlocks a book's PDF.
#[derive(Clone)]
pub struct AccessGate {
    ledger: Arc<dyn OrderLedger>,
    catalog: SharedCatalog,
}

impl AccessGate {
    pub fn new(ledger: Arc<dyn OrderLedger>, catalog: SharedCatalog) -> Self {
        Self { ledger, catalog }
    }

    /// Grant access iff a paid ledger record pairs `book_id` with
    /// `access_key`, compared exactly as presented. A key issued for one book
    /// never opens another.
    pub async fn authorize(
        &self,
        book_id: i64,
        access_key: Option<&str>,
    ) -> Result<AccessDecision, LedgerError> {
        let Some(book) = self.catalog.read().await.get(book_id).cloned() else {
            debug!(book_id, "Access denied: unknown book");
            return Ok(AccessDecision::Denied);
        };
        let access_key = match access_key {
            Some(key) if !key.is_empty() => key,
            _ => {
                debug!(book_id, "Access denied: no access key");
                return Ok(AccessDecision::Denied);
            }
        };

        match self.ledger.find_paid(book_id, access_key).await? {
            Some(order) => Ok(AccessDecision::Granted { book, order }),
            None => {
                debug!(book_id, "Access denied: key does not unlock this book");
                Ok(AccessDecision::Denied)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{MemoryLedger, NewPaidOrder};
    use crate::services::test_support::catalog;

    async fn gate_with_paid_order() -> AccessGate {
        let ledger = Arc::new(MemoryLedger::new());
        ledger
            .insert_if_absent(NewPaidOrder {
                order_id: "555".into(),
                book_id: 7,
                access_key: "KEY7".into(),
            })
            .await
            .unwrap();
        AccessGate::new(ledger, catalog())
    }

    #[tokio::test]
    async fn test_matching_key_grants_access() {
        let gate = gate_with_paid_order().await;
        match gate.authorize(7, Some("KEY7")).await.unwrap() {
            AccessDecision::Granted { book, order } => {
                assert_eq!(book.pdf, "seven.pdf");
                assert_eq!(order.order_id, "555");
            }
            AccessDecision::Denied => panic!("expected access"),
        }
    }

    #[tokio::test]
    async fn test_key_does_not_unlock_other_book() {
        let gate = gate_with_paid_order().await;
        assert_eq!(
            gate.authorize(8, Some("KEY7")).await.unwrap(),
            AccessDecision::Denied
        );
    }

    #[tokio::test]
    async fn test_wrong_or_missing_key_is_denied() {
        let gate = gate_with_paid_order().await;
        for key in [Some("wrong"), Some(""), Some("   "), None] {
            assert!(!gate.authorize(7, key).await.unwrap().is_granted(), "{key:?}");
        }
    }

    #[tokio::test]
    async fn test_key_is_compared_as_presented() {
        let gate = gate_with_paid_order().await;
        for key in ["  KEY7\t", " KEY7", "KEY7 ", "key7"] {
            assert!(!gate.authorize(7, Some(key)).await.unwrap().is_granted(), "{key:?}");
        }
    }

    #[tokio::test]
    async fn test_unknown_book_is_denied() {
        let gate = gate_with_paid_order().await;
        assert_eq!(
            gate.authorize(404, Some("KEY7")).await.unwrap(),
            AccessDecision::Denied
        );
    }
}
