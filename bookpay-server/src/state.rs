//! Application state shared across all request handlers.

use bookpay_core::catalog::{BookCatalog, SharedCatalog};
use bookpay_core::config::SharedConfig;
use bookpay_core::gateway::PaymentGateway;
use bookpay_core::ledger::OrderLedger;
use bookpay_core::services::{AccessGate, ConfirmationReceiver, PaymentInitiator};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Runtime configuration (can be reloaded via SIGHUP).
    pub config: SharedConfig,
    /// Book catalog (can be reloaded via SIGHUP).
    pub catalog: SharedCatalog,
    pub initiator: PaymentInitiator,
    pub receiver: ConfirmationReceiver,
    pub gate: AccessGate,
}

impl AppState {
    /// Wire the services over one ledger and one gateway.
    pub fn new(
        config: SharedConfig,
        catalog: BookCatalog,
        ledger: Arc<dyn OrderLedger>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let catalog: SharedCatalog = Arc::new(RwLock::new(catalog));
        Self {
            initiator: PaymentInitiator::new(
                gateway,
                ledger.clone(),
                catalog.clone(),
                config.gateway.clone(),
            ),
            receiver: ConfirmationReceiver::new(ledger.clone(), catalog.clone()),
            gate: AccessGate::new(ledger, catalog.clone()),
            config,
            catalog,
        }
    }

    /// Replace the catalog (used during SIGHUP reload).
    pub async fn update_catalog(&self, catalog: BookCatalog) {
        *self.catalog.write().await = catalog;
    }
}
