use std::time::{Duration, SystemTime, UNIX_EPOCH};

use http::HeaderMap;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub mod secret;

/// Verified caller identity for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub token_name: String,
    pub secret: String,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct AuthError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AuthError {}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: u64,
}

/// Issues and verifies HMAC-signed identity tokens.
///
/// Holds only immutable key material after construction, so a single
/// instance is shared across request tasks without locking.
#[derive(Clone)]
pub struct TokenManager {
    token_name: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    validation: Validation,
}

impl TokenManager {
    pub fn new(config: TokenConfig) -> Result<Self, AuthError> {
        if config.token_name.trim().is_empty() {
            return Err(AuthError {
                code: "ERR_INVALID_CONFIG",
                message: "token name must be non-empty".to_string(),
            });
        }

        if config.secret.is_empty() {
            return Err(AuthError {
                code: "ERR_INVALID_CONFIG",
                message: "token secret must be non-empty".to_string(),
            });
        }

        if config.ttl.is_zero() {
            return Err(AuthError {
                code: "ERR_INVALID_CONFIG",
                message: "token ttl must be positive".to_string(),
            });
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            token_name: config.token_name.trim().to_ascii_lowercase(),
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: config.ttl,
            validation,
        })
    }

    /// Metadata field the bearer token is read from.
    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    pub fn issue(&self, user_id: &str) -> Result<String, AuthError> {
        let expires_at = SystemTime::now()
            .checked_add(self.ttl)
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .ok_or_else(|| AuthError {
                code: "ERR_INTERNAL",
                message: "token expiry is out of range".to_string(),
            })?;

        let claims = Claims {
            sub: user_id.to_string(),
            exp: expires_at.as_secs(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|_| {
            AuthError {
                code: "ERR_INTERNAL",
                message: "failed to sign token".to_string(),
            }
        })
    }

    /// Checks signature, algorithm family and expiry, then returns the bound principal.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let decoded = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |_| AuthError {
                code: "ERR_AUTH_INVALID",
                message: "authentication by principal failed".to_string(),
            },
        )?;

        let user_id = decoded.claims.sub.trim();
        if user_id.is_empty() {
            return Err(AuthError {
                code: "ERR_AUTH_INVALID",
                message: "authentication by principal failed".to_string(),
            });
        }

        Ok(Principal {
            user_id: user_id.to_string(),
        })
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let token = bearer_token(headers, &self.token_name)?;
        self.verify(&token)
    }
}

fn bearer_token(headers: &HeaderMap, token_name: &str) -> Result<String, AuthError> {
    let raw = headers
        .get(token_name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError {
            code: "ERR_AUTH_REQUIRED",
            message: "no token found".to_string(),
        })?;

    let token = raw
        .strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("bearer "))
        .unwrap_or(raw)
        .trim();

    if token.is_empty() {
        return Err(AuthError {
            code: "ERR_AUTH_REQUIRED",
            message: "no token found".to_string(),
        });
    }

    Ok(token.to_string())
}
