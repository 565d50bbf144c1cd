//! Stateless encode/decode between [`Claims`] and the opaque token string.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::claims::{Claims, SEP};

/// AES-GCM nonce size (96 bits).
const NONCE_SIZE: usize = 12;

/// Authentication tag size (128 bits).
const TAG_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Encode rejected the claims, or decode could not recover valid claims.
    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Symmetric codec for session tokens.
///
/// The key is derived from the configured secret with SHA-256. The field
/// arity (3 without nonce, 4 with) is fixed at construction and enforced by
/// `decode`; a single process never mixes the two formats.
pub struct TokenCodec {
    key: [u8; 32],
    exclusive: bool,
}

impl TokenCodec {
    pub fn new(secret: &str, exclusive: bool) -> Self {
        let key: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        Self { key, exclusive }
    }

    /// Whether this codec expects a login nonce in every token.
    pub fn exclusive(&self) -> bool {
        self.exclusive
    }

    /// Encrypt claims into an opaque token string.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        let mut fields = vec![
            claims.user_no.as_str(),
            claims.group.as_str(),
        ];
        let issued = claims.issued_at_ms.to_string();
        fields.push(&issued);
        match (&claims.nonce, self.exclusive) {
            (Some(nonce), true) => fields.push(nonce),
            (None, false) => {}
            (Some(_), false) => {
                return Err(TokenError::Malformed(
                    "nonce present but exclusive mode is off".into(),
                ));
            }
            (None, true) => {
                return Err(TokenError::Malformed(
                    "exclusive mode requires a nonce".into(),
                ));
            }
        }
        for field in &fields {
            if field.contains(SEP) {
                return Err(TokenError::Malformed(format!(
                    "field contains reserved separator: {field}"
                )));
            }
        }
        let plaintext = fields.join(SEP);

        let cipher = Aes256Gcm::new(&self.key.into());
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| TokenError::Malformed("encryption failed".into()))?;

        let mut raw = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        raw.extend_from_slice(nonce.as_slice());
        raw.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    /// Decrypt a token back into claims.
    ///
    /// Fails with [`TokenError::Malformed`] on any of: bad base64, failed
    /// decryption or authentication, empty plaintext, wrong field arity for
    /// the active mode, or a non-numeric timestamp field.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| TokenError::Malformed("invalid token encoding".into()))?;
        if raw.len() < NONCE_SIZE + TAG_SIZE {
            return Err(TokenError::Malformed("token too short".into()));
        }

        let cipher = Aes256Gcm::new(&self.key.into());
        let nonce = Nonce::from_slice(&raw[..NONCE_SIZE]);
        let plaintext = cipher
            .decrypt(nonce, &raw[NONCE_SIZE..])
            .map_err(|_| TokenError::Malformed("decryption failed".into()))?;
        let plaintext = String::from_utf8(plaintext)
            .map_err(|_| TokenError::Malformed("token is not valid utf-8".into()))?;
        if plaintext.is_empty() {
            return Err(TokenError::Malformed("empty token payload".into()));
        }

        let parts: Vec<&str> = plaintext.split(SEP).collect();
        let expected = if self.exclusive { 4 } else { 3 };
        if parts.len() != expected {
            return Err(TokenError::Malformed(format!(
                "expected {expected} fields, got {}",
                parts.len()
            )));
        }

        let issued_at_ms: i64 = parts[2]
            .parse()
            .map_err(|_| TokenError::Malformed("invalid issue timestamp".into()))?;

        Ok(Claims {
            user_no: parts[0].to_string(),
            group: parts[1].to_string(),
            issued_at_ms,
            nonce: if self.exclusive {
                Some(parts[3].to_string())
            } else {
                None
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let codec = TokenCodec::new("test-secret", false);
        let claims = Claims::new("u1", "g1", 1700000000000);
        let token = codec.encode(&claims).unwrap();
        assert_eq!(codec.decode(&token).unwrap(), claims);
    }

    #[test]
    fn test_round_trip_exclusive() {
        let codec = TokenCodec::new("test-secret", true);
        let claims = Claims::with_nonce("u1", "g1", 1700000000000, "E1700000000000");
        let token = codec.encode(&claims).unwrap();
        assert_eq!(codec.decode(&token).unwrap(), claims);
    }

    #[test]
    fn test_token_is_opaque() {
        let codec = TokenCodec::new("test-secret", false);
        let token = codec.encode(&Claims::new("u1", "g1", 1700000000000)).unwrap();
        assert!(!token.contains("u1"));
        assert!(!token.contains(SEP));
    }

    #[test]
    fn test_separator_in_field_rejected() {
        let codec = TokenCodec::new("test-secret", false);
        let claims = Claims::new("u1#@#evil", "g1", 1700000000000);
        assert!(matches!(
            codec.encode(&claims),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_arity_enforced_at_encode() {
        let exclusive = TokenCodec::new("s", true);
        assert!(exclusive.encode(&Claims::new("u1", "g1", 1)).is_err());

        let plain = TokenCodec::new("s", false);
        assert!(plain.encode(&Claims::with_nonce("u1", "g1", 1, "E1")).is_err());
    }

    #[test]
    fn test_arity_enforced_at_decode() {
        // A 3-field token must not decode under a 4-field codec, and the
        // other way round, even with the same secret.
        let plain = TokenCodec::new("s", false);
        let exclusive = TokenCodec::new("s", true);

        let t3 = plain.encode(&Claims::new("u1", "g1", 1)).unwrap();
        assert!(exclusive.decode(&t3).is_err());

        let t4 = exclusive
            .encode(&Claims::with_nonce("u1", "g1", 1, "E1"))
            .unwrap();
        assert!(plain.decode(&t4).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let a = TokenCodec::new("secret-a", false);
        let b = TokenCodec::new("secret-b", false);
        let token = a.encode(&Claims::new("u1", "g1", 1)).unwrap();
        assert!(b.decode(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let codec = TokenCodec::new("s", false);
        assert!(codec.decode("not a token").is_err());
        assert!(codec.decode("").is_err());
        assert!(codec.decode("AAAA").is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let codec = TokenCodec::new("s", false);
        let token = codec.encode(&Claims::new("u1", "g1", 1)).unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(&token).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let tampered = URL_SAFE_NO_PAD.encode(raw);
        assert!(codec.decode(&tampered).is_err());
    }
}
