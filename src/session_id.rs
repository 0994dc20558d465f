use crate::error::AppError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Opaque session identifier: a keyed digest of the requester identity, stable
/// for a given requester and unguessable without the secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        SessionId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keyed MAC state, built once from the secret and cloned per derivation.
#[derive(Clone)]
pub struct SessionKeys {
    mac: HmacSha256,
}

impl SessionKeys {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, AppError> {
        let mac = HmacSha256::new_from_slice(secret.as_ref())
            .map_err(|e| AppError::Config(format!("invalid session secret: {e}")))?;
        Ok(Self { mac })
    }

    /// Keys that only live as long as this process. Ids derived from them do not
    /// survive a restart or match other instances.
    pub fn ephemeral() -> Result<Self, AppError> {
        Self::new(uuid::Uuid::new_v4().as_bytes())
    }

    pub fn derive(&self, requester: &str) -> SessionId {
        let mut mac = self.mac.clone();
        mac.update(requester.as_bytes());
        SessionId(hex::encode(mac.finalize().into_bytes()))
    }
}
