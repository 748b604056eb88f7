//! JWT token generation and validation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token (5 minutes) - stateless, no JTI
    Access,
    /// Long-lived refresh token (2 weeks) - bound to the stored fingerprint via JTI
    Refresh,
}

/// JWT claims for access tokens (stateless, no JTI).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user UUID)
    pub sub: String,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT claims for refresh tokens (carry a JTI matched against the stored fingerprint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// JWT ID (random nonce, exactly one is live per user)
    pub jti: String,
    /// Subject (user UUID)
    pub sub: String,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Access token duration: 5 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 5 * 60;

/// Refresh token duration: 2 weeks
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 14 * 24 * 60 * 60;

/// Configuration for JWT operations.
///
/// Built once at startup from the process-wide secret; verification is
/// stateless, so tokens survive restarts and scale across processes.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

/// Result of generating an access token (no JTI).
#[derive(Debug, Clone)]
pub struct AccessTokenResult {
    /// The JWT token string
    pub token: String,
    /// Token duration in seconds
    pub duration: u64,
}

/// Result of generating a refresh token (with JTI for fingerprint binding).
#[derive(Debug, Clone)]
pub struct RefreshTokenResult {
    /// The JWT token string
    pub token: String,
    /// JWT ID (random nonce)
    pub jti: String,
    /// Token duration in seconds
    pub duration: u64,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Generate an access token for a user.
    /// Access tokens are short-lived (5 minutes) and stateless.
    pub fn generate_access_token(&self, user_uuid: &str) -> Result<AccessTokenResult, JwtError> {
        let now = unix_now()?;
        let exp = now + ACCESS_TOKEN_DURATION_SECS;

        let claims = AccessClaims {
            sub: user_uuid.to_string(),
            token_type: TokenType::Access,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(AccessTokenResult {
            token,
            duration: ACCESS_TOKEN_DURATION_SECS,
        })
    }

    /// Generate a refresh token for a user with a fresh JTI.
    pub fn generate_refresh_token(&self, user_uuid: &str) -> Result<RefreshTokenResult, JwtError> {
        let now = unix_now()?;
        let jti = uuid::Uuid::new_v4().to_string();
        let exp = now + REFRESH_TOKEN_DURATION_SECS;

        let claims = RefreshClaims {
            jti: jti.clone(),
            sub: user_uuid.to_string(),
            token_type: TokenType::Refresh,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(RefreshTokenResult {
            token,
            jti,
            duration: REFRESH_TOKEN_DURATION_SECS,
        })
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let claims: AccessClaims = self.decode(token)?;
        if claims.token_type != TokenType::Access {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }

    /// Validate and decode a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let claims: RefreshClaims = self.decode(token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }

    fn decode<C: serde::de::DeserializeOwned>(&self, token: &str) -> Result<C, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match jsonwebtoken::decode::<C>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => Err(JwtError::Expired),
            Err(e) => Err(JwtError::Malformed(e)),
        }
    }
}

fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Token failed the structure or signature check
    Malformed(jsonwebtoken::errors::Error),
    /// Token is past its expiry
    Expired,
    /// System time error
    TimeError,
    /// Wrong token type (e.g., using refresh token as access token)
    WrongTokenType,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Malformed(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::Expired => write!(f, "Token expired"),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
        }
    }
}

impl std::error::Error for JwtError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_validate_access_token() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let result = config.generate_access_token("uuid-123").unwrap();

        assert_eq!(result.duration, ACCESS_TOKEN_DURATION_SECS);

        let claims = config.validate_access_token(&result.token).unwrap();
        assert_eq!(claims.sub, "uuid-123");
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_generate_and_validate_refresh_token() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let result = config.generate_refresh_token("uuid-123").unwrap();

        assert_eq!(result.duration, REFRESH_TOKEN_DURATION_SECS);
        assert!(!result.jti.is_empty());

        let claims = config.validate_refresh_token(&result.token).unwrap();
        assert_eq!(claims.sub, "uuid-123");
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.jti, result.jti);
    }

    #[test]
    fn test_wrong_token_type_rejected() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let access = config.generate_access_token("uuid-123").unwrap();
        let refresh = config.generate_refresh_token("uuid-123").unwrap();

        // Access token should fail validate_refresh_token
        assert!(config.validate_refresh_token(&access.token).is_err());

        // Refresh token should fail validate_access_token
        assert!(config.validate_access_token(&refresh.token).is_err());
    }

    #[test]
    fn test_invalid_token() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let result = config.validate_access_token("invalid-token");
        assert!(matches!(result, Err(JwtError::Malformed(_))));
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = JwtConfig::new(b"secret-1");
        let config2 = JwtConfig::new(b"secret-2");

        let result = config1.generate_access_token("uuid-123").unwrap();

        let validation = config2.validate_access_token(&result.token);
        assert!(matches!(validation, Err(JwtError::Malformed(_))));
    }

    #[test]
    fn test_expired_token() {
        use std::time::{SystemTime, UNIX_EPOCH};

        let secret = b"test-secret";
        let encoding_key = jsonwebtoken::EncodingKey::from_secret(secret);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        // Create claims with exp in the past
        let claims = AccessClaims {
            sub: "uuid-123".to_string(),
            token_type: TokenType::Access,
            iat: now - 100,
            exp: now - 50, // Expired 50 seconds ago
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &encoding_key).unwrap();

        let config = JwtConfig::new(secret);
        let result = config.validate_access_token(&token);
        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_unique_jti_per_refresh_token() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let result1 = config.generate_refresh_token("uuid-123").unwrap();
        let result2 = config.generate_refresh_token("uuid-123").unwrap();

        assert_ne!(
            result1.jti, result2.jti,
            "Each refresh token should have a unique jti"
        );
    }

    #[test]
    fn test_verification_is_stateless() {
        // Two configs from the same secret behave like two processes
        // sharing one signing key.
        let config1 = JwtConfig::new(b"shared-secret-across-processes");
        let config2 = JwtConfig::new(b"shared-secret-across-processes");

        let result = config1.generate_refresh_token("uuid-123").unwrap();
        let claims = config2.validate_refresh_token(&result.token).unwrap();
        assert_eq!(claims.jti, result.jti);
    }
}
