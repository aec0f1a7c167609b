//! Sealed handshake state carried across the redirect boundary.
//!
//! The handshake is stateless between requests: everything leg 3 needs to
//! finish the flow (the request-token secret, the correlation id, the
//! post-sign-in redirect target and an expiry) rides inside an encrypted,
//! authenticated blob that the host rounds through the user's browser. A
//! forged or replayed callback therefore fails at decode time instead of
//! reaching the provider.

use crate::error::{Oauth1Error, Oauth1Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, thread_rng};
use serde::{Deserialize, Serialize};

const NONCE_LEN: usize = 12;

/// Continuation data for one in-flight handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeState {
    /// Request token issued in leg 1; the callback's `oauth_token` must match.
    pub correlation_id: String,
    /// Secret paired with the request token, needed to sign the leg-3 exchange.
    pub request_token_secret: String,
    /// Where the host should send the user after sign-in completes.
    pub redirect_target: String,
    pub expires_at: DateTime<Utc>,
}

impl HandshakeState {
    pub fn new(
        correlation_id: impl Into<String>,
        request_token_secret: impl Into<String>,
        redirect_target: impl Into<String>,
        ttl: std::time::Duration,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            request_token_secret: request_token_secret.into(),
            redirect_target: redirect_target.into(),
            expires_at: Utc::now() + Duration::seconds(ttl.as_secs() as i64),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Injectable tamper-evident serialization of [`HandshakeState`].
///
/// Swappable so hosts can supply their own data-protection scheme; the
/// default is [`SealedStateCodec`].
pub trait StateCodec: Send + Sync {
    fn encode(&self, state: &HandshakeState) -> Oauth1Result<String>;

    /// Decode and verify. Fails with [`Oauth1Error::InvalidState`] on tamper
    /// or corruption and [`Oauth1Error::ExpiredState`] once the expiry has
    /// passed.
    fn decode(&self, value: &str) -> Oauth1Result<HandshakeState>;
}

/// AES-256-GCM implementation of [`StateCodec`].
///
/// Wire format: `base64url(nonce || ciphertext)` with a fresh 96-bit nonce
/// per encode. The key is read-only after construction; rotating it simply
/// invalidates older blobs (they decode as `InvalidState`).
pub struct SealedStateCodec {
    cipher: Aes256Gcm,
}

impl SealedStateCodec {
    /// Build a codec from a 32-byte symmetric key.
    pub fn new(key: &[u8]) -> Oauth1Result<Self> {
        if key.len() != 32 {
            return Err(Oauth1Error::ConfigError(
                "state codec key must be exactly 32 bytes".to_string(),
            ));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| Oauth1Error::ConfigError(format!("invalid state codec key: {e}")))?;

        Ok(Self { cipher })
    }

    /// Generate a random 32-byte key.
    pub fn generate_key() -> [u8; 32] {
        thread_rng().r#gen()
    }
}

impl StateCodec for SealedStateCodec {
    fn encode(&self, state: &HandshakeState) -> Oauth1Result<String> {
        let plaintext = serde_json::to_vec(state)?;

        let nonce_bytes: [u8; NONCE_LEN] = thread_rng().r#gen();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_ref())
            .map_err(|_| Oauth1Error::InvalidState)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    fn decode(&self, value: &str) -> Oauth1Result<HandshakeState> {
        let sealed = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|_| Oauth1Error::InvalidState)?;

        if sealed.len() <= NONCE_LEN {
            return Err(Oauth1Error::InvalidState);
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| Oauth1Error::InvalidState)?;

        let state: HandshakeState =
            serde_json::from_slice(&plaintext).map_err(|_| Oauth1Error::InvalidState)?;

        if state.is_expired() {
            return Err(Oauth1Error::ExpiredState);
        }

        Ok(state)
    }
}
