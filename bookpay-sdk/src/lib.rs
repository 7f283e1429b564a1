//! Shared types for the Bookpay checkout server.
//!
//! The `objects` module holds every request/response body exchanged with the
//! server and the payment gateway's callback payloads. The `client` module
//! (behind the `client` feature) is a typed HTTP client for the public API.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
pub mod signature;
