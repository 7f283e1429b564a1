//! Access key issuance.
//!
//! An access key is 160 bits from the thread-local CSPRNG, encoded as
//! unpadded RFC 4648 base32 (32 characters). It is independent of the order
//! and book it unlocks.

use rand::RngCore;

/// Number of random bytes in an access key.
pub const ACCESS_KEY_BYTES: usize = 20;

/// Length of the encoded access key.
pub const ACCESS_KEY_LEN: usize = ACCESS_KEY_BYTES * 8 / 5;

/// Generate a fresh access key.
pub fn issue_access_key() -> String {
    let mut bytes = [0u8; ACCESS_KEY_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    fast32::base32::RFC4648_NOPAD.encode(&bytes)
}
