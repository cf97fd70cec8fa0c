use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::app::Result;

type HmacSha256 = Hmac<Sha256>;

/// Request signer for the protected bookmarking endpoints.
///
/// The key is derived once at startup from the hex-encoded shared secret.
pub struct Signer {
    key: Vec<u8>,
}

impl Signer {
    pub fn from_hex_secret(secret_hex: &str) -> Result<Self> {
        let key = hex::decode(secret_hex.trim())?;
        Ok(Self { key })
    }

    /// Hex MAC over the exact bytes that go on the wire.
    pub fn sign(&self, material: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(material);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Signed material for a GET: the query string with a timestamp
    /// parameter appended purely to vary the signature input. The endpoint
    /// does not interpret the timestamp.
    pub fn signed_query(&self, query: &str, timestamp: i64) -> (String, String) {
        let query = if query.is_empty() {
            format!("t={timestamp}")
        } else {
            format!("{query}&t={timestamp}")
        };
        let signature = self.sign(query.as_bytes());
        (query, signature)
    }
}
