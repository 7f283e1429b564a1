//! Purchase orchestration.
//!
//! # Flow
//!
//! 1. [`PaymentInitiator`] authenticates with the gateway, registers the
//!    order and obtains a payment key, then hands the buyer a checkout URL.
//!    The order's intent (book and amount) is stored; no paid record exists
//!    yet.
//! 2. The gateway later pushes a transaction result to
//!    [`ConfirmationReceiver::receive`], which checks it against the intent
//!    and records the paid order with a fresh access key exactly once.
//! 3. [`ConfirmationReceiver::verify`] lets the buyer poll for that key, and
//!    [`AccessGate::authorize`] checks it before a PDF is released.

mod access_gate;
mod confirmation;
mod initiation;

pub use access_gate::{AccessDecision, AccessGate};
pub use confirmation::{ConfirmationError, ConfirmationOutcome, ConfirmationReceiver};
pub use initiation::{InitiatedPayment, InitiationError, PaymentInitiator};
