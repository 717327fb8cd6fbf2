use std::sync::Arc;

use actix_web::cookie::{Cookie, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const MIN_KEY_LEN: usize = 32;
pub const CSRF_COOKIE: &str = "_csrf";
pub const CSRF_BODY_FIELD: &str = "_csrf";

/// Request headers checked for a token, in order.
pub const CSRF_HEADERS: [&str; 4] = ["csrf-token", "xsrf-token", "x-csrf-token", "x-xsrf-token"];

const SECRET_LEN: usize = 18;
const SALT_LEN: usize = 8;

/// Per-request view of the CSRF cookie after signature verification.
#[derive(Debug, Clone, Default)]
pub struct CsrfSession {
    pub secret: Option<String>,
}

impl CsrfSession {
    pub fn unseeded() -> Self {
        Self { secret: None }
    }

    pub fn seeded(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
        }
    }
}

/// Token handed to the client. `cookie` is set when a new secret had to be
/// created for the session.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub cookie: Option<Cookie<'static>>,
}

#[derive(Clone)]
pub struct CsrfGuard {
    key: Arc<[u8]>,
    secure_cookie: bool,
}

impl CsrfGuard {
    /// `key` signs the cookie holding each session secret.
    pub fn new(key: Vec<u8>, secure_cookie: bool) -> Result<Self> {
        if key.len() < MIN_KEY_LEN {
            return Err(AppError::Config(format!(
                "cookie signing key is too short (min {MIN_KEY_LEN} bytes)"
            )));
        }

        Ok(Self {
            key: Arc::<[u8]>::from(key),
            secure_cookie,
        })
    }

    /// Guard with a key that only lives as long as the process.
    pub fn ephemeral(secure_cookie: bool) -> Self {
        let key: [u8; MIN_KEY_LEN] = rand::random();
        Self {
            key: Arc::<[u8]>::from(key.to_vec()),
            secure_cookie,
        }
    }

    pub fn issue_token(&self, session: &CsrfSession) -> IssuedToken {
        match &session.secret {
            Some(secret) => IssuedToken {
                token: create_token(secret),
                cookie: None,
            },
            None => {
                let secret = generate_secret();
                IssuedToken {
                    token: create_token(&secret),
                    cookie: Some(self.secret_cookie(&secret)),
                }
            }
        }
    }

    pub fn validate(&self, session: &CsrfSession, supplied: Option<&str>) -> Result<()> {
        let secret = session.secret.as_deref().ok_or(AppError::Csrf)?;
        let supplied = supplied.filter(|t| !t.is_empty()).ok_or(AppError::Csrf)?;

        if verify_token(secret, supplied) {
            Ok(())
        } else {
            Err(AppError::Csrf)
        }
    }

    /// Reads a `_csrf` cookie value; forged or tampered values give an
    /// unseeded session.
    pub fn open_cookie(&self, value: &str) -> CsrfSession {
        let Some((secret, signature_b64)) = value.rsplit_once('.') else {
            return CsrfSession::unseeded();
        };
        if secret.is_empty() {
            return CsrfSession::unseeded();
        }
        let Ok(signature) = URL_SAFE_NO_PAD.decode(signature_b64) else {
            return CsrfSession::unseeded();
        };

        let authentic = keyed_mac(&self.key, secret.as_bytes())
            .is_some_and(|mac| mac.verify_slice(&signature).is_ok());
        if authentic {
            CsrfSession::seeded(secret)
        } else {
            CsrfSession::unseeded()
        }
    }

    pub fn seal_cookie(&self, secret: &str) -> String {
        let signature = keyed_mac(&self.key, secret.as_bytes())
            .map(|mac| URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
            .unwrap_or_default();
        format!("{secret}.{signature}")
    }

    fn secret_cookie(&self, secret: &str) -> Cookie<'static> {
        Cookie::build(CSRF_COOKIE, self.seal_cookie(secret))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure_cookie)
            .finish()
    }
}

pub fn generate_secret() -> String {
    let bytes: [u8; SECRET_LEN] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Derives a fresh token from `secret` with a random salt.
pub fn create_token(secret: &str) -> String {
    let salt_bytes: [u8; SALT_LEN] = rand::random();
    let salt = URL_SAFE_NO_PAD.encode(salt_bytes);
    derive_token(secret, &salt)
}

pub fn derive_token(secret: &str, salt: &str) -> String {
    let digest = keyed_mac(secret.as_bytes(), salt.as_bytes())
        .map(|mac| URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("{salt}.{digest}")
}

/// True when `supplied` was derived from `secret`. Constant-time compare.
pub fn verify_token(secret: &str, supplied: &str) -> bool {
    let Some((salt, digest_b64)) = supplied.split_once('.') else {
        return false;
    };
    if salt.is_empty() {
        return false;
    }
    let Ok(digest) = URL_SAFE_NO_PAD.decode(digest_b64) else {
        return false;
    };

    keyed_mac(secret.as_bytes(), salt.as_bytes())
        .map(|mac| mac.verify_slice(&digest).is_ok())
        .unwrap_or(false)
}

fn keyed_mac(key: &[u8], bytes: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(bytes);
    Some(mac)
}
