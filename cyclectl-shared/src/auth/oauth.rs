/// Signed sign-in callbacks
///
/// The OAuth handshake runs in an external gateway. Once the provider has
/// confirmed the user, the gateway posts the profile to the API and signs the
/// raw request body:
///
/// ```text
/// X-CycleCtl-Signature: hex(HMAC-SHA256(OAUTH_CALLBACK_SECRET, body))
/// ```
///
/// Verification is constant-time (`Mac::verify_slice`).
///
/// # Example
///
/// ```
/// use cyclectl_shared::auth::oauth::{sign_payload, verify_signature};
///
/// let secret = "callback-secret-at-least-32-bytes-long";
/// let body = br#"{"email":"ada@example.com","provider":"github"}"#;
///
/// let signature = sign_payload(secret, body);
/// assert!(verify_signature(secret, body, &signature).is_ok());
/// assert!(verify_signature(secret, b"tampered", &signature).is_err());
/// ```

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the callback signature
pub const SIGNATURE_HEADER: &str = "X-CycleCtl-Signature";

/// Error type for callback signature checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Missing signature")]
    Missing,

    #[error("Signature is not valid hex")]
    Malformed,

    #[error("Signature does not match payload")]
    Mismatch,
}

fn mac_for(secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length, so this constructor cannot fail
    match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC key of any size is valid"),
    }
}

/// Computes the hex-encoded HMAC-SHA256 of `payload`
///
/// Used by the gateway side and by tests; the API only verifies.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac = mac_for(secret);
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks a hex signature against `payload`
///
/// # Errors
///
/// - `SignatureError::Missing` if `signature` is blank
/// - `SignatureError::Malformed` if it is not hex
/// - `SignatureError::Mismatch` if it was made with another key or body
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> Result<(), SignatureError> {
    let signature = signature.trim();
    if signature.is_empty() {
        return Err(SignatureError::Missing);
    }

    let expected = hex::decode(signature).map_err(|_| SignatureError::Malformed)?;

    let mut mac = mac_for(secret);
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}
