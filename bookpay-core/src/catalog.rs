//! Book catalog.
//!
//! The catalog is a JSON array of books (`[{id, title, author?, price?, pdf}]`)
//! plus the directory their PDFs live in. It is read-only at runtime and
//! replaced wholesale on configuration reload.

use bookpay_sdk::objects::BookSummary;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Catalog shared between the services; swapped on reload.
pub type SharedCatalog = Arc<RwLock<BookCatalog>>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate book id {0} in catalog")]
    DuplicateId(i64),

    #[error("book {id} has an invalid pdf file name {pdf:?}")]
    InvalidPdfName { id: i64, pdf: String },
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    /// File name of the PDF, relative to the catalog's pdf directory.
    pub pdf: String,
}

impl Book {
    pub fn summary(&self) -> BookSummary {
        BookSummary {
            id: self.id,
            title: self.title.clone(),
            author: self.author.clone(),
            price: self.price,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookCatalog {
    books: BTreeMap<i64, Book>,
    pdf_dir: PathBuf,
}

impl BookCatalog {
    /// Build a catalog, rejecting duplicate ids and PDF names that would
    /// resolve outside `pdf_dir`.
    pub fn new(books: Vec<Book>, pdf_dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let mut by_id = BTreeMap::new();
        for book in books {
            if !is_plain_file_name(&book.pdf) {
                return Err(CatalogError::InvalidPdfName {
                    id: book.id,
                    pdf: book.pdf,
                });
            }
            let id = book.id;
            if by_id.insert(id, book).is_some() {
                return Err(CatalogError::DuplicateId(id));
            }
        }
        Ok(Self {
            books: by_id,
            pdf_dir: pdf_dir.into(),
        })
    }

    /// Load the catalog from a JSON data file.
    pub fn load(data_path: impl AsRef<Path>, pdf_dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(data_path)?;
        let books: Vec<Book> = serde_json::from_str(&content)?;
        Self::new(books, pdf_dir)
    }

    pub fn get(&self, id: i64) -> Option<&Book> {
        self.books.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.books.contains_key(&id)
    }

    /// Books in id order.
    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Filesystem path of a book's PDF.
    pub fn pdf_path(&self, book: &Book) -> PathBuf {
        self.pdf_dir.join(&book.pdf)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
