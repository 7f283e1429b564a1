//! Runtime configuration types.
//!
//! These are the validated values the services read at call time. Loading
//! and parsing the TOML file is handled by the server crate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

/// Shared configuration state with separate locks for each section.
///
/// Sections are swapped wholesale on reload; readers take the lock for the
/// duration of a single call.
#[derive(Clone)]
pub struct SharedConfig {
    /// Server configuration (listen address).
    pub server: Arc<RwLock<ServerConfig>>,
    /// Payment gateway credentials and checkout settings.
    pub gateway: Arc<RwLock<GatewayConfig>>,
}

impl SharedConfig {
    pub fn new(server: ServerConfig, gateway: GatewayConfig) -> Self {
        Self {
            server: Arc::new(RwLock::new(server)),
            gateway: Arc::new(RwLock::new(gateway)),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address and port to listen on.
    pub listen: SocketAddr,
}

/// Payment gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API root, e.g. `https://accept.paymob.com/api`.
    pub base_url: Url,
    /// Static secret exchanged for a short-lived bearer token.
    pub api_key: String,
    /// Payment integration (card, wallet, ...) the payment key is issued for.
    pub integration_id: u64,
    /// Hosted payment form the buyer is redirected to.
    pub iframe_id: u64,
    /// ISO 4217 currency code for every order.
    pub currency: String,
    /// Lifetime of a payment key, in seconds.
    pub payment_key_expiration_secs: u64,
    /// Per-request timeout for gateway calls.
    pub timeout: Duration,
    /// Shared secret for callback signatures. `None` disables verification.
    pub hmac_secret: Option<Box<[u8]>>,
    /// Billing data attached to every payment key.
    pub billing: BillingInfo,
}

impl GatewayConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://accept.paymob.com/api";
    pub const DEFAULT_CURRENCY: &'static str = "EGP";
    pub const DEFAULT_PAYMENT_KEY_EXPIRATION_SECS: u64 = 3600;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Get the callback HMAC secret bytes, if configured.
    pub fn hmac_secret_bytes(&self) -> Option<&[u8]> {
        self.hmac_secret.as_deref()
    }
}

/// Billing details the gateway requires to issue a payment key.
///
/// The gateway rejects keys with missing fields, so the defaults are
/// placeholder values (`NA`) rather than empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingInfo {
    pub apartment: String,
    pub email: String,
    pub floor: String,
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub building: String,
    pub phone_number: String,
    pub shipping_method: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub state: String,
}

impl Default for BillingInfo {
    fn default() -> Self {
        Self {
            apartment: "NA".into(),
            email: "customer@example.com".into(),
            floor: "NA".into(),
            first_name: "Book".into(),
            last_name: "Buyer".into(),
            street: "NA".into(),
            building: "NA".into(),
            phone_number: "+200000000000".into(),
            shipping_method: "PKG".into(),
            postal_code: "NA".into(),
            city: "Cairo".into(),
            country: "EG".into(),
            state: "NA".into(),
        }
    }
}
