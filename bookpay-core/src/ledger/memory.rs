use super::{InsertOutcome, LedgerError, NewOrderIntent, NewPaidOrder, OrderLedger};
use crate::entities::order_intents::OrderIntent;
use crate::entities::order_records::OrderRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tokio::sync::Mutex;

/// In-process ledger. Contents are lost on restart.
///
/// Every operation holds the map lock for its whole duration, which makes
/// `insert_if_absent` a single atomic check-and-set.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    orders: Mutex<HashMap<String, OrderRecord>>,
    intents: Mutex<HashMap<String, OrderIntent>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.lock().await.is_empty()
    }
}

#[async_trait]
impl OrderLedger for MemoryLedger {
    async fn find(&self, order_id: &str) -> Result<Option<OrderRecord>, LedgerError> {
        Ok(self.orders.lock().await.get(order_id).cloned())
    }

    async fn insert_if_absent(&self, order: NewPaidOrder) -> Result<InsertOutcome, LedgerError> {
        let mut orders = self.orders.lock().await;
        match orders.entry(order.order_id) {
            Entry::Occupied(existing) => Ok(InsertOutcome::Existing(existing.get().clone())),
            Entry::Vacant(slot) => {
                let record =
                    OrderRecord::paid_now(slot.key().clone(), order.book_id, order.access_key);
                slot.insert(record.clone());
                Ok(InsertOutcome::Inserted(record))
            }
        }
    }

    async fn record_intent(&self, intent: NewOrderIntent) -> Result<(), LedgerError> {
        let mut intents = self.intents.lock().await;
        if let Entry::Vacant(slot) = intents.entry(intent.order_id) {
            let bound = OrderIntent::new_now(slot.key().clone(), intent.book_id, intent.amount_cents);
            slot.insert(bound);
        }
        Ok(())
    }

    async fn find_intent(&self, order_id: &str) -> Result<Option<OrderIntent>, LedgerError> {
        Ok(self.intents.lock().await.get(order_id).cloned())
    }

    async fn list_by_book(&self, book_id: i64) -> Result<Vec<OrderRecord>, LedgerError> {
        let orders = self.orders.lock().await;
        let mut matching: Vec<OrderRecord> = orders
            .values()
            .filter(|r| r.book_id == book_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        Ok(matching)
    }

    async fn find_paid(
        &self,
        book_id: i64,
        access_key: &str,
    ) -> Result<Option<OrderRecord>, LedgerError> {
        let orders = self.orders.lock().await;
        Ok(orders
            .values()
            .find(|r| r.book_id == book_id && r.paid_access_key() == Some(access_key))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_order(order_id: &str, book_id: i64, key: &str) -> NewPaidOrder {
        NewPaidOrder {
            order_id: order_id.to_string(),
            book_id,
            access_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_insert_wins() {
        let ledger = MemoryLedger::new();

        let first = ledger.insert_if_absent(new_order("555", 7, "first")).await.unwrap();
        assert!(first.was_inserted());

        let second = ledger.insert_if_absent(new_order("555", 7, "second")).await.unwrap();
        assert!(!second.was_inserted());
        assert_eq!(second.record().access_key.as_deref(), Some("first"));

        assert_eq!(ledger.len().await, 1);
        let stored = ledger.find("555").await.unwrap().unwrap();
        assert_eq!(stored.access_key.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_yield_one_record() {
        let ledger = Arc::new(MemoryLedger::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .insert_if_absent(new_order("42", 1, &format!("key-{i}")))
                    .await
                    .unwrap()
            }));
        }

        let mut inserted = 0;
        let mut keys = Vec::new();
        for handle in handles {
            let outcome = handle.await.unwrap();
            if outcome.was_inserted() {
                inserted += 1;
            }
            keys.push(outcome.into_record().access_key);
        }

        assert_eq!(inserted, 1);
        assert!(keys.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_find_unknown_is_none() {
        let ledger = MemoryLedger::new();
        assert!(ledger.find("nope").await.unwrap().is_none());
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_find_paid_requires_matching_book_and_key() {
        let ledger = MemoryLedger::new();
        ledger.insert_if_absent(new_order("1", 7, "k1")).await.unwrap();
        ledger.insert_if_absent(new_order("2", 8, "k2")).await.unwrap();

        assert!(ledger.find_paid(7, "k1").await.unwrap().is_some());
        assert!(ledger.find_paid(7, "k2").await.unwrap().is_none());
        assert!(ledger.find_paid(8, "k1").await.unwrap().is_none());
        assert!(ledger.find_paid(9, "k1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_intent_is_kept() {
        let ledger = MemoryLedger::new();
        let intent = |book_id| NewOrderIntent {
            order_id: "555".to_string(),
            book_id,
            amount_cents: 10_000,
        };
        ledger.record_intent(intent(7)).await.unwrap();
        ledger.record_intent(intent(8)).await.unwrap();

        let stored = ledger.find_intent("555").await.unwrap().unwrap();
        assert_eq!(stored.book_id, 7);
        assert_eq!(stored.amount_cents, 10_000);
        assert!(ledger.find_intent("556").await.unwrap().is_none());
        // Intents are not paid orders.
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_by_book() {
        let ledger = MemoryLedger::new();
        ledger.insert_if_absent(new_order("b", 7, "k1")).await.unwrap();
        ledger.insert_if_absent(new_order("a", 7, "k2")).await.unwrap();
        ledger.insert_if_absent(new_order("c", 8, "k3")).await.unwrap();

        let orders = ledger.list_by_book(7).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|r| r.book_id == 7 && r.paid));
        assert!(ledger.list_by_book(99).await.unwrap().is_empty());
    }
}
