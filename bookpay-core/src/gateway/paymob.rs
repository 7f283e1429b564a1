//! Paymob Accept implementation of [`PaymentGateway`].

use super::{AuthToken, GatewayError, PaymentGateway, PaymentToken, endpoint_url};
use crate::config::{BillingInfo, GatewayConfig};
use async_trait::async_trait;
use bookpay_sdk::objects::GatewayOrderId;
use bookpay_sdk::objects::callback::describe_book;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Which of the three calls a request belongs to, for error attribution.
#[derive(Debug, Clone, Copy)]
enum Stage {
    Auth,
    Order,
    Key,
}

impl Stage {
    fn error(self, detail: String) -> GatewayError {
        match self {
            Stage::Auth => GatewayError::Auth(detail),
            Stage::Order => GatewayError::Order(detail),
            Stage::Key => GatewayError::Key(detail),
        }
    }

    fn segments(self) -> &'static [&'static str] {
        match self {
            Stage::Auth => &["auth", "tokens"],
            Stage::Order => &["ecommerce", "orders"],
            Stage::Key => &["acceptance", "payment_keys"],
        }
    }
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    api_key: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Serialize)]
struct OrderItem {
    name: String,
    amount_cents: i64,
    description: String,
    quantity: u32,
}

#[derive(Serialize)]
struct OrderRequest<'a> {
    auth_token: &'a str,
    delivery_needed: bool,
    amount_cents: i64,
    currency: &'a str,
    items: Vec<OrderItem>,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: GatewayOrderId,
}

#[derive(Serialize)]
struct PaymentKeyRequest<'a> {
    auth_token: &'a str,
    amount_cents: i64,
    expiration: u64,
    order_id: serde_json::Value,
    billing_data: &'a BillingInfo,
    currency: &'a str,
    integration_id: u64,
}

#[derive(Deserialize)]
struct PaymentKeyResponse {
    token: String,
}

/// HTTP client for the Paymob Accept API.
///
/// Reads the shared [`GatewayConfig`] on every call, so a configuration
/// reload takes effect for the next purchase.
#[derive(Clone)]
pub struct PaymobClient {
    http: reqwest::Client,
    config: Arc<RwLock<GatewayConfig>>,
}

impl PaymobClient {
    pub fn new(config: Arc<RwLock<GatewayConfig>>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Replace the default `reqwest::Client` (e.g. to configure a proxy).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// POST a JSON body to the endpoint for `stage` and decode the reply.
    async fn post<B, R>(&self, stage: Stage, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let (url, timeout) = {
            let config = self.config.read().await;
            let url = endpoint_url(&config.base_url, stage.segments()).ok_or_else(|| {
                GatewayError::InvalidConfiguration(format!(
                    "cannot build endpoint url from {}",
                    config.base_url
                ))
            })?;
            (url, config.timeout)
        };

        debug!(?stage, %url, "Calling payment gateway");
        let response = self
            .http
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| classify(stage, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(|e| classify(stage, e))?;
            return Err(stage.error(format!("status {status}: {body}")));
        }

        let bytes = response.bytes().await.map_err(|e| classify(stage, e))?;
        serde_json::from_slice(&bytes).map_err(|e| stage.error(format!("malformed response: {e}")))
    }
}

fn classify(stage: Stage, error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Timeout
    } else {
        stage.error(error.to_string())
    }
}

/// The gateway issues numeric order ids; send them back as numbers.
fn order_id_value(order_id: &GatewayOrderId) -> serde_json::Value {
    match order_id.as_str().parse::<i64>() {
        Ok(n) => serde_json::Value::from(n),
        Err(_) => serde_json::Value::from(order_id.as_str()),
    }
}

#[async_trait]
impl PaymentGateway for PaymobClient {
    async fn authenticate(&self) -> Result<AuthToken, GatewayError> {
        let api_key = self.config.read().await.api_key.clone();
        let response: AuthResponse = self
            .post(Stage::Auth, &AuthRequest { api_key: &api_key })
            .await?;
        if response.token.is_empty() {
            return Err(GatewayError::Auth("empty token in response".into()));
        }
        Ok(AuthToken(response.token))
    }

    async fn create_order(
        &self,
        token: &AuthToken,
        amount_cents: i64,
        book_id: i64,
    ) -> Result<GatewayOrderId, GatewayError> {
        let currency = self.config.read().await.currency.clone();
        let request = OrderRequest {
            auth_token: &token.0,
            delivery_needed: false,
            amount_cents,
            currency: &currency,
            items: vec![OrderItem {
                name: format!("Book {book_id}"),
                amount_cents,
                description: describe_book(book_id),
                quantity: 1,
            }],
        };
        let response: OrderResponse = self.post(Stage::Order, &request).await?;
        Ok(response.id)
    }

    async fn create_payment_key(
        &self,
        token: &AuthToken,
        order_id: &GatewayOrderId,
        amount_cents: i64,
        billing: &BillingInfo,
    ) -> Result<PaymentToken, GatewayError> {
        let (currency, integration_id, expiration) = {
            let config = self.config.read().await;
            (
                config.currency.clone(),
                config.integration_id,
                config.payment_key_expiration_secs,
            )
        };
        let request = PaymentKeyRequest {
            auth_token: &token.0,
            amount_cents,
            expiration,
            order_id: order_id_value(order_id),
            billing_data: billing,
            currency: &currency,
            integration_id,
        };
        let response: PaymentKeyResponse = self.post(Stage::Key, &request).await?;
        if response.token.is_empty() {
            return Err(GatewayError::Key("empty token in response".into()));
        }
        Ok(PaymentToken(response.token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_request_shape() {
        let request = OrderRequest {
            auth_token: "t",
            delivery_needed: false,
            amount_cents: 10000,
            currency: "EGP",
            items: vec![OrderItem {
                name: "Book 7".into(),
                amount_cents: 10000,
                description: describe_book(7),
                quantity: 1,
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["amount_cents"], 10000);
        assert_eq!(json["items"][0]["description"], "Book ID: 7");
        assert_eq!(json["delivery_needed"], false);
    }

    #[test]
    fn test_order_response_accepts_numeric_id() {
        let parsed: OrderResponse = serde_json::from_str(r#"{"id": 555, "created_at": "x"}"#).unwrap();
        assert_eq!(parsed.id.as_str(), "555");
    }

    #[test]
    fn test_order_id_sent_back_as_number_when_numeric() {
        assert_eq!(order_id_value(&GatewayOrderId::from(555)), serde_json::json!(555));
        assert_eq!(
            order_id_value(&GatewayOrderId::new("ord-1")),
            serde_json::json!("ord-1")
        );
    }

    #[test]
    fn test_stage_errors_are_attributed() {
        assert!(matches!(Stage::Auth.error("x".into()), GatewayError::Auth(_)));
        assert!(matches!(Stage::Order.error("x".into()), GatewayError::Order(_)));
        assert!(matches!(Stage::Key.error("x".into()), GatewayError::Key(_)));
    }

    fn config_for(base_url: &str, timeout: std::time::Duration) -> GatewayConfig {
        GatewayConfig {
            base_url: url::Url::parse(base_url).unwrap(),
            api_key: "k".into(),
            integration_id: 1,
            iframe_id: 1,
            currency: "EGP".into(),
            payment_key_expiration_secs: 3600,
            timeout,
            hmac_secret: None,
            billing: BillingInfo::default(),
        }
    }

    /// Serve one connection: read the request head, write `head` and then
    /// keep the socket open for `hold` without sending anything more.
    async fn serve_once(head: &'static str, hold: std::time::Duration) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(head.as_bytes()).await.unwrap();
            tokio::time::sleep(hold).await;
        });
        format!("http://{addr}/api")
    }

    #[tokio::test]
    async fn test_error_body_read_timeout_is_a_timeout() {
        let base = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 64\r\n\r\npartial",
            std::time::Duration::from_secs(5),
        )
        .await;
        let config = config_for(&base, std::time::Duration::from_millis(300));
        let client = PaymobClient::new(Arc::new(RwLock::new(config)));
        let err = client.authenticate().await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout), "{err:?}");
    }

    #[tokio::test]
    async fn test_error_status_keeps_stage_and_body() {
        let base = serve_once(
            "HTTP/1.1 403 Forbidden\r\ncontent-length: 7\r\nconnection: close\r\n\r\nbad key",
            std::time::Duration::from_millis(0),
        )
        .await;
        let config = config_for(&base, std::time::Duration::from_secs(5));
        let client = PaymobClient::new(Arc::new(RwLock::new(config)));
        match client.authenticate().await.unwrap_err() {
            GatewayError::Auth(detail) => {
                assert!(detail.contains("403"), "{detail}");
                assert!(detail.contains("bad key"), "{detail}");
            }
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_gateway_reports_stage_error() {
        let config = GatewayConfig {
            base_url: url::Url::parse("http://127.0.0.1:9/api").unwrap(),
            api_key: "k".into(),
            integration_id: 1,
            iframe_id: 1,
            currency: "EGP".into(),
            payment_key_expiration_secs: 3600,
            timeout: std::time::Duration::from_secs(2),
            hmac_secret: None,
            billing: BillingInfo::default(),
        };
        let client = PaymobClient::new(Arc::new(RwLock::new(config)));
        let err = client.authenticate().await.unwrap_err();
        assert!(matches!(err, GatewayError::Auth(_) | GatewayError::Timeout));
    }
}
