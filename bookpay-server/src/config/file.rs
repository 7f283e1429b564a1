//! TOML file configuration structures.
//!
//! These structs directly map to the `bookpay-config.toml` file format.

use bookpay_core::config::BillingInfo;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:5000").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 5000))
}

/// Payment gateway section.
///
/// `api_key`, `integration_id` and `hmac_secret` may be left out here and
/// supplied through the environment instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: url::Url,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub integration_id: u64,
    pub iframe_id: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_payment_key_expiration")]
    pub payment_key_expiration_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub hmac_secret: Option<String>,
    #[serde(default)]
    pub billing: BillingInfo,
}

fn default_base_url() -> url::Url {
    url::Url::parse(bookpay_core::config::GatewayConfig::DEFAULT_BASE_URL)
        .expect("valid default gateway url")
}

fn default_currency() -> String {
    bookpay_core::config::GatewayConfig::DEFAULT_CURRENCY.to_string()
}

fn default_payment_key_expiration() -> u64 {
    bookpay_core::config::GatewayConfig::DEFAULT_PAYMENT_KEY_EXPIRATION_SECS
}

fn default_timeout_secs() -> u64 {
    bookpay_core::config::GatewayConfig::DEFAULT_TIMEOUT.as_secs()
}

/// Book catalog section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON file listing the books.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    /// Directory holding the PDF files.
    #[serde(default = "default_pdf_dir")]
    pub pdf_dir: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            pdf_dir: default_pdf_dir(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("books/data.json")
}

fn default_pdf_dir() -> PathBuf {
    PathBuf::from("books/pdfs")
}

/// Order ledger section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub backend: LedgerBackend,
}

/// Where paid orders are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    /// PostgreSQL via `DATABASE_URL`.
    #[default]
    Postgres,
    /// In-process map; orders are lost on restart.
    Memory,
}

impl GatewayConfig {
    /// Convert into the runtime form.
    pub fn into_runtime(self) -> bookpay_core::config::GatewayConfig {
        bookpay_core::config::GatewayConfig {
            base_url: self.base_url,
            api_key: self.api_key,
            integration_id: self.integration_id,
            iframe_id: self.iframe_id,
            currency: self.currency,
            payment_key_expiration_secs: self.payment_key_expiration_secs,
            timeout: std::time::Duration::from_secs(self.timeout_secs),
            hmac_secret: self
                .hmac_secret
                .filter(|s| !s.is_empty())
                .map(|s| s.into_bytes().into_boxed_slice()),
            billing: self.billing,
        }
    }
}
