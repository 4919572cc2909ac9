//! Short-lived client-side state: the one-time post receipt and flash messages.
//!
//! Values are `hex(json) "." hex(hmac_sha256(secret, json))`, so a client can hold them
//! but cannot forge or alter them. Reading either cookie always clears it.

use crate::constants::RELAY_MAX_AGE_SECONDS;
use crate::database_api::ItemId;
use crate::error::Error;
use crate::error::Result;
use hmac::Hmac;
use hmac::Mac;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Handed from the post submission to the success view, exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReceipt {
    pub item_id: ItemId,
    pub deletion_code: String,
    /// UTC seconds
    pub issued_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: &str) -> Flash {
        Flash {
            kind: FlashKind::Success,
            message: message.to_string(),
        }
    }

    pub fn error(message: &str) -> Flash {
        Flash {
            kind: FlashKind::Error,
            message: message.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct CookieSigner {
    key: Vec<u8>,
}

impl std::fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CookieSigner { key: <hidden> }")
    }
}

impl CookieSigner {
    pub fn new(secret: &[u8]) -> CookieSigner {
        CookieSigner {
            key: secret.to_vec(),
        }
    }

    /// A signer whose key only lives as long as this process.
    /// Cookies issued before a restart stop verifying.
    pub fn random() -> CookieSigner {
        let key: [u8; 32] = rand::random();
        CookieSigner::new(&key)
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|err| Error::internal(format!("Invalid cookie signing key, {}", err)))
    }

    pub fn sign<T: Serialize>(&self, value: &T) -> Result<String> {
        let payload = serde_json::to_vec(value)?;
        let mut mac = self.mac()?;
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();
        Ok(format!("{}.{}", hex::encode(payload), hex::encode(signature)))
    }

    /// `None` for anything malformed, tampered with or signed by another key.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Option<T> {
        let (payload, signature) = token.split_once('.')?;
        let payload = hex::decode(payload).ok()?;
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac().ok()?;
        mac.update(&payload);
        if mac.verify_slice(&signature).is_err() {
            debug!("Discarding cookie with invalid signature");
            return None;
        }
        serde_json::from_slice(&payload).ok()
    }

    /// Decode a receipt cookie, treating expired ones as absent.
    pub fn read_receipt(&self, cookie: Option<&str>, now_seconds: i64) -> Option<PostReceipt> {
        let receipt: PostReceipt = self.verify(cookie?)?;
        let age = now_seconds - receipt.issued_at;
        if (0..=RELAY_MAX_AGE_SECONDS).contains(&age) {
            Some(receipt)
        } else {
            debug!("Discarding post receipt issued {} seconds ago", age);
            None
        }
    }

    pub fn read_flash(&self, cookie: Option<&str>) -> Option<Flash> {
        self.verify(cookie?)
    }
}

/// `Set-Cookie` value storing `value` under `name`.
pub fn set_cookie(name: &str, value: &str, max_age_seconds: Option<i64>) -> String {
    match max_age_seconds {
        Some(max_age) => format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            name, value, max_age
        ),
        None => format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, value),
    }
}

/// `Set-Cookie` value that makes the client drop `name`.
pub fn clear_cookie(name: &str) -> String {
    set_cookie(name, "", Some(0))
}
