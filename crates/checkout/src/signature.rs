//! Gateway callback signature scheme.
//!
//! The gateway signs its confirmation callbacks with HMAC-SHA256 over
//! `"{order_ref}|{payment_ref}"` using a secret shared with this
//! service, hex-encoded. Verification decodes the provided hex and
//! compares through the MAC itself, which is constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &[u8], order_ref: &str, payment_ref: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(order_ref.as_bytes());
    mac.update(b"|");
    mac.update(payment_ref.as_bytes());
    mac
}

/// Computes the hex-encoded signature the gateway would produce.
pub fn sign(secret: &[u8], order_ref: &str, payment_ref: &str) -> String {
    hex::encode(mac_for(secret, order_ref, payment_ref).finalize().into_bytes())
}

/// Verifies a provided hex-encoded signature in constant time.
pub fn verify(secret: &[u8], order_ref: &str, payment_ref: &str, provided: &str) -> bool {
    let Ok(provided) = hex::decode(provided) else {
        return false;
    };
    mac_for(secret, order_ref, payment_ref)
        .verify_slice(&provided)
        .is_ok()
}
