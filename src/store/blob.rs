//! Stored blob record and id derivation.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// A blob held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlob {
    /// `digest_id(body)`.
    pub id: String,
    /// Raw payload. Base64 in the snapshot file.
    #[serde(with = "base64_body")]
    pub body: Vec<u8>,
    /// Milliseconds since the epoch; set once.
    pub created: u64,
    /// Milliseconds since the epoch; bumped on every write of this id.
    pub modified: u64,
}

/// URL-safe, unpadded base64 of the MD5 digest of `body` (22 characters).
pub fn digest_id(body: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(Md5::digest(body))
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

mod base64_body {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
