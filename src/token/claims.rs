//! Claims embedded in a session token.

/// Separator between claims fields inside the token plaintext.
///
/// Multi-byte on purpose: no field value may contain it, which `encode`
/// enforces.
pub const SEP: &str = "#@#";

/// Decoded token fields.
///
/// `nonce` is present exactly when the codec runs in exclusive-login mode;
/// it distinguishes concurrent logins of the same user + group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub user_no: String,
    pub group: String,
    pub issued_at_ms: i64,
    pub nonce: Option<String>,
}

impl Claims {
    pub fn new(user_no: impl Into<String>, group: impl Into<String>, issued_at_ms: i64) -> Self {
        Self {
            user_no: user_no.into(),
            group: group.into(),
            issued_at_ms,
            nonce: None,
        }
    }

    /// Claims for exclusive-login mode, carrying a login-distinguishing nonce.
    pub fn with_nonce(
        user_no: impl Into<String>,
        group: impl Into<String>,
        issued_at_ms: i64,
        nonce: impl Into<String>,
    ) -> Self {
        Self {
            user_no: user_no.into(),
            group: group.into(),
            issued_at_ms,
            nonce: Some(nonce.into()),
        }
    }

    /// Cache key for the session these claims belong to, without namespace
    /// prefix. The nonce participates only when present, so in exclusive
    /// mode each concurrent login owns its own entry.
    pub fn cache_key(&self) -> String {
        let mut key = format!(
            "{}{SEP}{}{SEP}{}",
            self.user_no, self.group, self.issued_at_ms
        );
        if let Some(nonce) = &self.nonce {
            key.push_str(SEP);
            key.push_str(nonce);
        }
        key
    }
}
