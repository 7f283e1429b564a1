//! HTTP client for the Bookpay public API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use url::Url;

use crate::objects::{BookSummary, PayRequest, PayResponse, VerifyResponse};

/// Errors produced by [`BookpayClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Typed HTTP client for a Bookpay server.
#[derive(Debug, Clone)]
pub struct BookpayClient {
    http: Client,
    base_url: Url,
}

impl BookpayClient {
    /// Create a new client rooted at `base_url` (e.g. `https://books.example.com`).
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` (e.g. to configure timeouts).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /books` – list the catalog.
    pub async fn list_books(&self) -> Result<Vec<BookSummary>, ClientError> {
        let url = self.base_url.join("/books")?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `POST /pay` – start a purchase and obtain the hosted payment page URL.
    pub async fn pay(&self, amount: Decimal, book_id: i64) -> Result<PayResponse, ClientError> {
        let url = self.base_url.join("/pay")?;
        let body = PayRequest {
            amount: Some(amount),
            book_id: Some(book_id),
        };
        let resp = self.http.post(url).json(&body).send().await?;
        parse_response(resp).await
    }

    /// `GET /verify/{order_id}` – poll whether an order has been paid.
    pub async fn verify(&self, order_id: &str) -> Result<VerifyResponse, ClientError> {
        let mut url = self.base_url.join("/verify/")?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(order_id);
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `GET /books/{book_id}/pdf?accessKey=...` – download a purchased book.
    pub async fn download_pdf(
        &self,
        book_id: i64,
        access_key: &str,
    ) -> Result<Vec<u8>, ClientError> {
        let mut url = self.base_url.join(&format!("/books/{book_id}/pdf"))?;
        url.query_pairs_mut().append_pair("accessKey", access_key);
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            return Err(ClientError::Api { status, body });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await?;
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Answer a single request with `status`, `content_type` and `body`.
    /// Resolves to the raw request (head and body) the client sent.
    async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: &'static [u8],
    ) -> (Url, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            let head_end = loop {
                if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed before sending a full request");
                request.extend_from_slice(&buf[..n]);
            };
            let head = String::from_utf8_lossy(&request[..head_end]).to_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .map(|v| v.trim().parse::<usize>().unwrap())
                .unwrap_or(0);
            while request.len() < head_end + content_length {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed before sending the body");
                request.extend_from_slice(&buf[..n]);
            }

            let mut response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            )
            .into_bytes();
            response.extend_from_slice(body);
            socket.write_all(&response).await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
        });
        (Url::parse(&format!("http://{addr}/")).unwrap(), rx)
    }

    fn request_line(request: &str) -> &str {
        request.lines().next().unwrap()
    }

    #[tokio::test]
    async fn test_verify_encodes_order_id_and_parses_paid() {
        let (base, request) = serve_once(
            "200 OK",
            "application/json",
            br#"{"status":"paid","bookId":7,"accessKey":"KEY7"}"#,
        )
        .await;
        let status = BookpayClient::new(base).verify("ord/1 2").await.unwrap();
        assert_eq!(
            status,
            VerifyResponse::Paid {
                book_id: 7,
                access_key: "KEY7".into()
            }
        );
        let request = request.await.unwrap();
        assert_eq!(request_line(&request), "GET /verify/ord%2F1%202 HTTP/1.1");
    }

    #[tokio::test]
    async fn test_verify_not_paid() {
        let (base, _) = serve_once("200 OK", "application/json", br#"{"status":"not paid"}"#).await;
        let status = BookpayClient::new(base).verify("555").await.unwrap();
        assert_eq!(status, VerifyResponse::NotPaid);
    }

    #[tokio::test]
    async fn test_pay_sends_camel_case_body() {
        let (base, request) = serve_once(
            "200 OK",
            "application/json",
            br#"{"url":"https://gateway.test/checkout","orderId":"555"}"#,
        )
        .await;
        let response = BookpayClient::new(base)
            .pay(Decimal::new(4950, 2), 7)
            .await
            .unwrap();
        assert_eq!(response.order_id, "555");
        assert_eq!(response.url, "https://gateway.test/checkout");

        let request = request.await.unwrap();
        assert_eq!(request_line(&request), "POST /pay HTTP/1.1");
        let (_, body) = request.split_once("\r\n\r\n").unwrap();
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["bookId"], 7);
        assert!(body.get("amount").is_some());
    }

    #[tokio::test]
    async fn test_forbidden_pdf_is_an_api_error() {
        let (base, request) = serve_once(
            "403 Forbidden",
            "application/json",
            br#"{"message":"payment required"}"#,
        )
        .await;
        let err = BookpayClient::new(base)
            .download_pdf(7, "K+1 2")
            .await
            .unwrap_err();
        match err {
            ClientError::Api { status, body } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert!(body.contains("payment required"), "{body}");
            }
            other => panic!("expected api error, got {other:?}"),
        }
        let request = request.await.unwrap();
        assert_eq!(
            request_line(&request),
            "GET /books/7/pdf?accessKey=K%2B1+2 HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_pdf_bytes_are_returned_unparsed() {
        let (base, _) = serve_once("200 OK", "application/pdf", b"%PDF-1.4 seven").await;
        let bytes = BookpayClient::new(base).download_pdf(7, "KEY7").await.unwrap();
        assert_eq!(bytes, b"%PDF-1.4 seven");
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_a_json_error() {
        let (base, _) = serve_once("200 OK", "text/html", b"<html></html>").await;
        let err = BookpayClient::new(base).list_books().await.unwrap_err();
        assert!(matches!(err, ClientError::Json(_)), "{err:?}");
    }
}
