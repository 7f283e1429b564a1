//! Public HTTP API.
//!
//! # Endpoints
//!
//! - `GET  /books`                          – list the catalog
//! - `GET  /books/{id}/pdf?accessKey=...`   – download a purchased book
//! - `POST /pay`                            – start a purchase
//! - `GET  /verify/{order_id}`              – poll payment status
//! - `POST /paymob-callback`                – gateway transaction push
//! - `GET  /paymob-callback?order=...`      – buyer's browser redirect

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bookpay_sdk::objects::ErrorResponse;

use crate::state::AppState;

mod books;
mod callback;
mod extractors;
mod pay;
mod verify;

/// Path of the gateway callback endpoint.
pub const CALLBACK_PATH: &str = "/paymob-callback";

/// Build the public API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/books", get(books::list_books))
        .route("/books/{book_id}/pdf", get(books::download_pdf))
        .route("/pay", post(pay::pay))
        .route("/verify/{order_id}", get(verify::verify))
        .route(
            CALLBACK_PATH,
            get(callback::browser_redirect).post(callback::gateway_push),
        )
}

/// JSON `{"message": ...}` body with the given status.
fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            message: message.into(),
        }),
    )
        .into_response()
}
