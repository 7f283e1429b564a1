#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod credential;
pub mod entities;
pub mod framework;
pub mod gateway;
pub mod ledger;
pub mod services;
