/// Bearer token signing and verification.
///
/// Tokens are compact JWTs signed with a shared symmetric secret (HS256 by
/// default). Every token carries a random `jti`; for refresh tokens that id
/// is what the durable store and revocation cache track. Decoding verifies
/// the signature and expiry only — kind checks and store lookups are the
/// caller's job.
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtSettings;
use crate::error::{AuthError, Result};

/// Token families. Access tokens are verified purely by signature; refresh
/// tokens must additionally be confirmed against both stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// JWT claims: standard registered claims plus the token family
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Unique token id (UUID string, fresh per issuance)
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token family: "access" or "refresh"
    pub token_type: String,
}

/// A freshly signed token plus the structured fields the caller needs to
/// persist (`jti`, `expires_at`).
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// A decoded, signature-verified token
#[derive(Debug, Clone)]
pub struct BearerToken {
    pub subject: Uuid,
    pub jti: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub kind: TokenKind,
}

/// Signs and verifies bearer tokens with the process-wide secret.
///
/// Constructed once at startup from `JwtSettings` and passed into the
/// lifecycle manager; there is no global key state.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl TokenCodec {
    pub fn new(settings: &JwtSettings) -> Result<Self> {
        let algorithm: Algorithm = settings
            .algorithm
            .parse()
            .map_err(|_| AuthError::Internal(format!("Unknown JWT algorithm: {}", settings.algorithm)))?;

        // Symmetric secret, so only the HMAC family is usable here.
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::Internal(format!(
                "JWT algorithm {} requires asymmetric keys; configure an HMAC algorithm",
                settings.algorithm
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            algorithm,
        })
    }

    /// Sign a fresh token for `subject` with a new random `jti`.
    pub fn issue(&self, subject: Uuid, kind: TokenKind, ttl: Duration) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + ttl;
        let jti = Uuid::new_v4();

        let claims = Claims {
            sub: subject.to_string(),
            jti: jti.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            token_type: kind.as_str().to_string(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign token: {e}")))?;

        Ok(IssuedToken {
            token,
            jti,
            expires_at,
        })
    }

    /// Verify signature and structure, returning the structured token.
    ///
    /// Fails `InvalidToken` on a bad signature, malformed payload, expired
    /// signature, or missing/unparseable claims. Does not check the kind —
    /// callers match it against the expected use.
    pub fn decode(&self, token: &str) -> Result<BearerToken> {
        let validation = Validation::new(self.algorithm);
        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;

        let subject = Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let jti = Uuid::parse_str(&data.claims.jti).map_err(|_| AuthError::InvalidToken)?;

        let kind = match data.claims.token_type.as_str() {
            "access" => TokenKind::Access,
            "refresh" => TokenKind::Refresh,
            _ => return Err(AuthError::InvalidToken),
        };

        let issued_at =
            DateTime::<Utc>::from_timestamp(data.claims.iat, 0).ok_or(AuthError::InvalidToken)?;
        let expires_at =
            DateTime::<Utc>::from_timestamp(data.claims.exp, 0).ok_or(AuthError::InvalidToken)?;

        Ok(BearerToken {
            subject,
            jti,
            issued_at,
            expires_at,
            kind,
        })
    }
}
