//! Payment gateway callback payloads.
//!
//! The gateway delivers a transaction result in one of two shapes:
//!
//! * a server-to-server `POST` whose JSON body is either the envelope
//!   `{"type": "TRANSACTION", "obj": {...}}` or the bare transaction object;
//! * a browser redirect (`GET`) carrying flat query parameters such as
//!   `success`, `order` and `hmac`.
//!
//! Only the `POST` form carries the order's line items, and therefore the
//! purchased book id.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Prefix of the line-item description that identifies the purchased book.
pub const BOOK_DESCRIPTION_PREFIX: &str = "Book ID:";

/// Render the line-item description for a book (`"Book ID: 7"`).
pub fn describe_book(book_id: i64) -> String {
    format!("{BOOK_DESCRIPTION_PREFIX} {book_id}")
}

/// Parse a line-item description produced by [`describe_book`].
///
/// Returns `None` for any other description.
pub fn parse_book_description(description: &str) -> Option<i64> {
    description
        .trim()
        .strip_prefix(BOOK_DESCRIPTION_PREFIX)?
        .trim()
        .parse()
        .ok()
}

/// Order identifier assigned by the gateway.
///
/// The gateway sends it as a JSON number, the browser redirect as a string;
/// both are accepted and kept in their decimal text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GatewayOrderId(String);

impl GatewayOrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for GatewayOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for GatewayOrderId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for GatewayOrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for GatewayOrderId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Serialize for GatewayOrderId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for GatewayOrderId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl serde::de::Visitor<'_> for IdVisitor {
            type Value = GatewayOrderId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an order id as integer or string")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(GatewayOrderId(v.to_string()))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(GatewayOrderId(v.to_string()))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                let trimmed = v.trim();
                if trimmed.is_empty() {
                    return Err(E::invalid_value(serde::de::Unexpected::Str(v), &self));
                }
                Ok(GatewayOrderId(trimmed.to_owned()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// One line item echoed back in the callback's order object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// The order object embedded in a transaction callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackOrder {
    pub id: GatewayOrderId,
    #[serde(default)]
    pub items: Vec<CallbackItem>,
}

/// The fields of a transaction callback this server acts on.
///
/// Unknown fields are ignored; the raw object is kept alongside in
/// [`CallbackPayload`] for signature verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCallback {
    /// Transaction id (distinct from the order id).
    #[serde(default)]
    pub id: Option<GatewayOrderId>,
    pub success: bool,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub amount_cents: Option<i64>,
    pub order: CallbackOrder,
}

impl TransactionCallback {
    /// Whether the gateway reports a settled, successful payment.
    pub fn is_successful(&self) -> bool {
        self.success && !self.pending
    }

    /// The purchased book id, taken from the first line item whose
    /// description matches `"Book ID: <integer>"`.
    pub fn book_id(&self) -> Option<i64> {
        self.order
            .items
            .iter()
            .filter_map(|item| item.description.as_deref())
            .find_map(parse_book_description)
    }
}

/// A parsed `POST` callback body.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackPayload {
    /// The raw transaction object (the envelope's `obj`, or the whole body).
    pub raw: serde_json::Value,
    pub transaction: TransactionCallback,
}

impl CallbackPayload {
    /// Parse a JSON callback body in either envelope or bare form.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let mut value: serde_json::Value = serde_json::from_slice(body)?;
        let raw = match value.get_mut("obj") {
            Some(obj) if obj.is_object() => obj.take(),
            _ => value,
        };
        let transaction = TransactionCallback::deserialize(&raw)?;
        Ok(Self { raw, transaction })
    }
}

/// Query parameters of the callback endpoint.
///
/// On `POST` only `hmac` is meaningful; on the browser redirect the gateway
/// flattens the transaction into the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub order: Option<GatewayOrderId>,
    #[serde(default)]
    pub success: Option<String>,
    #[serde(default)]
    pub hmac: Option<String>,
}
