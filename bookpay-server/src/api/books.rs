use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use bookpay_core::ledger::LedgerError;
use bookpay_core::services::AccessDecision;
use bookpay_sdk::objects::BookSummary;
use serde::Deserialize;

use super::error_response;
use crate::state::AppState;

/// `GET /books` — list the catalog without file locations.
pub(super) async fn list_books(State(state): State<AppState>) -> Json<Vec<BookSummary>> {
    let catalog = state.catalog.read().await;
    Json(catalog.books().map(|book| book.summary()).collect())
}

#[derive(Debug, Deserialize)]
pub(super) struct PdfQuery {
    #[serde(rename = "accessKey")]
    access_key: Option<String>,
}

/// `GET /books/{book_id}/pdf?accessKey=...` — download a purchased book.
///
/// Any failed check answers the same `403`, so callers cannot tell an
/// unknown book from a wrong key.
pub(super) async fn download_pdf(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    Query(query): Query<PdfQuery>,
) -> Result<impl IntoResponse, BooksApiError> {
    let Ok(book_id) = book_id.trim().parse::<i64>() else {
        return Err(BooksApiError::PaymentRequired);
    };

    let book = match state
        .gate
        .authorize(book_id, query.access_key.as_deref())
        .await
        .map_err(BooksApiError::Ledger)?
    {
        AccessDecision::Granted { book, order } => {
            tracing::info!(book_id, order_id = %order.order_id, "Serving purchased book");
            book
        }
        AccessDecision::Denied => return Err(BooksApiError::PaymentRequired),
    };

    let path = state.catalog.read().await.pdf_path(&book);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        tracing::error!(book_id, path = %path.display(), error = %e, "Book file unavailable");
        BooksApiError::FileUnavailable
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", book.pdf),
            ),
        ],
        bytes,
    ))
}

/// Errors that can occur in the book endpoints.
#[derive(Debug)]
pub(super) enum BooksApiError {
    /// Unknown book, missing key or a key that does not unlock the book.
    PaymentRequired,
    /// A ledger query failed.
    Ledger(LedgerError),
    /// Access was granted but the file could not be read.
    FileUnavailable,
}

impl IntoResponse for BooksApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            BooksApiError::PaymentRequired => {
                error_response(StatusCode::FORBIDDEN, "payment required")
            }
            BooksApiError::Ledger(e) => {
                tracing::error!(error = %e, "Books API ledger error");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
            BooksApiError::FileUnavailable => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "book file unavailable")
            }
        }
    }
}
