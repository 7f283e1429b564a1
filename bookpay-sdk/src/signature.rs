//! Authenticity check for payment gateway callbacks.
//!
//! The gateway signs every transaction callback with
//! `HMAC-SHA512(concat(fields), hmac_secret)`, hex encoded and passed as the
//! `hmac` query parameter. `fields` is a fixed, lexicographically ordered list
//! of transaction attributes; each value is rendered as plain text
//! (`true`/`false` for booleans, decimal for numbers, empty for missing).

use serde_json::Value;

/// Query parameter carrying the callback signature.
pub const HMAC_QUERY_PARAM: &str = "hmac";

/// Transaction attributes covered by the callback signature, in signing order.
///
/// Dotted names address nested objects.
pub const TRANSACTION_HMAC_FIELDS: [&str; 20] = [
    "amount_cents",
    "created_at",
    "currency",
    "error_occured",
    "has_parent_transaction",
    "id",
    "integration_id",
    "is_3d_secure",
    "is_auth",
    "is_capture",
    "is_refunded",
    "is_standalone_payment",
    "is_voided",
    "order.id",
    "owner",
    "pending",
    "source_data.pan",
    "source_data.sub_type",
    "source_data.type",
    "success",
];

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid hex encoding")]
    InvalidHex,
    #[error("invalid signature")]
    SignatureMismatch,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// Build the string the gateway signs from a raw transaction object.
pub fn transaction_signing_string(transaction: &Value) -> String {
    TRANSACTION_HMAC_FIELDS
        .iter()
        .map(|path| render(lookup(transaction, path)))
        .collect()
}

/// Sign a transaction object, returning the lowercase hex signature.
pub fn sign_transaction(transaction: &Value, secret: &[u8]) -> String {
    let data = transaction_signing_string(transaction);
    let tag = ring::hmac::sign(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA512, secret),
        data.as_bytes(),
    );
    hex::encode(tag.as_ref())
}

/// Verify a hex signature against a transaction object in constant time.
pub fn verify_transaction(
    transaction: &Value,
    signature_hex: &str,
    secret: &[u8],
) -> Result<(), SignatureError> {
    let signature = hex::decode(signature_hex.trim()).map_err(|_| SignatureError::InvalidHex)?;
    let data = transaction_signing_string(transaction);
    ring::hmac::verify(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA512, secret),
        data.as_bytes(),
        &signature,
    )?;
    Ok(())
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| current.get(key))
}

fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_transaction() -> Value {
        json!({
            "id": 192036465,
            "pending": false,
            "amount_cents": 10000,
            "success": true,
            "is_auth": false,
            "is_capture": false,
            "is_standalone_payment": true,
            "is_voided": false,
            "is_refunded": false,
            "is_3d_secure": true,
            "integration_id": 4530,
            "has_parent_transaction": false,
            "order": {"id": 217503754, "items": []},
            "created_at": "2024-06-13T11:33:44.592345",
            "currency": "EGP",
            "source_data": {"pan": "2346", "type": "card", "sub_type": "MasterCard"},
            "error_occured": false,
            "owner": 302852
        })
    }

    #[test]
    fn test_signing_string_field_order() {
        let s = transaction_signing_string(&sample_transaction());
        assert_eq!(
            s,
            "100002024-06-13T11:33:44.592345EGPfalsefalse1920364654530truefalsefalsefalsetruefalse217503754302852false2346MasterCardcardtrue"
        );
    }

    #[test]
    fn test_missing_fields_render_empty() {
        let s = transaction_signing_string(&json!({"success": true, "order": {"id": "5"}}));
        assert_eq!(s, "5true");
    }

    #[test]
    fn test_sign_and_verify() {
        let tx = sample_transaction();
        let sig = sign_transaction(&tx, b"secret");
        assert_eq!(sig.len(), 128);
        assert!(verify_transaction(&tx, &sig, b"secret").is_ok());
        assert!(verify_transaction(&tx, &sig.to_uppercase(), b"secret").is_ok());
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let tx = sample_transaction();
        let sig = sign_transaction(&tx, b"secret");

        assert!(matches!(
            verify_transaction(&tx, &sig, b"other-secret"),
            Err(SignatureError::SignatureMismatch)
        ));

        let mut forged = tx.clone();
        forged["order"]["id"] = json!(1);
        assert!(matches!(
            verify_transaction(&forged, &sig, b"secret"),
            Err(SignatureError::SignatureMismatch)
        ));

        assert!(matches!(
            verify_transaction(&tx, "not-hex", b"secret"),
            Err(SignatureError::InvalidHex)
        ));
    }
}
