//! Session lifecycle: login, refresh rotation, logout, password changes.
//!
//! The session state machine lives in the `refresh_fingerprint` column of
//! the users table: NULL means logged out, otherwise it holds the SHA-256
//! of the jti inside the one live refresh token. Login overwrites it,
//! refresh rotates it with a compare-and-swap, logout clears it. All
//! synchronization is pushed into those store primitives, so the manager
//! itself holds no locks and is correct across processes sharing one
//! database.

use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::warn;

use crate::db::{Database, User};
use crate::jwt::{JwtConfig, JwtError};

/// Both tokens issued by a successful login or refresh.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub access_duration: u64,
    pub refresh_token: String,
    pub refresh_duration: u64,
}

/// Errors surfaced by session operations.
///
/// `StoreUnavailable` and `DeadlineExceeded` are retryable by the caller;
/// everything else is terminal for the presented credentials. The manager
/// never retries internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// No user matches the presented identifier
    NotFound,
    /// Password check failed
    InvalidCredential,
    /// Token failed the structure/signature check or has the wrong type
    TokenMalformed,
    /// Token is past its expiry
    TokenExpired,
    /// Token's jti no longer matches the stored fingerprint (logout,
    /// overwrite by a newer login, or a concurrent refresh won the swap)
    SessionRevoked,
    /// The caller's deadline expired before the store responded.
    /// The operation must not be assumed to have had any effect.
    DeadlineExceeded,
    /// Credential store error
    StoreUnavailable,
    /// Hashing or token encoding failed
    Internal,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NotFound => write!(f, "User not found"),
            SessionError::InvalidCredential => write!(f, "Invalid credentials"),
            SessionError::TokenMalformed => write!(f, "Malformed token"),
            SessionError::TokenExpired => write!(f, "Token expired"),
            SessionError::SessionRevoked => write!(f, "Session revoked"),
            SessionError::DeadlineExceeded => write!(f, "Deadline exceeded"),
            SessionError::StoreUnavailable => write!(f, "Credential store unavailable"),
            SessionError::Internal => write!(f, "Internal error"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Compute the stored form of a refresh token's jti.
/// The store never holds a value usable as a token.
pub fn fingerprint(jti: &str) -> String {
    hex::encode(Sha256::digest(jti.as_bytes()))
}

/// Hash a password with Argon2id for storage.
pub fn hash_password(password: &str) -> Result<String, SessionError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| SessionError::Internal)
}

fn verify_password(password: &str, stored_hash: &str) -> Result<(), SessionError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| SessionError::Internal)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| SessionError::InvalidCredential)
}

fn codec_err(e: JwtError) -> SessionError {
    match e {
        JwtError::Expired => SessionError::TokenExpired,
        JwtError::Malformed(_) | JwtError::WrongTokenType => SessionError::TokenMalformed,
        JwtError::Encoding(_) | JwtError::TimeError => SessionError::Internal,
    }
}

/// Orchestrates the credential store and the token codec.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    jwt: Arc<JwtConfig>,
}

impl SessionManager {
    pub fn new(db: Database, jwt: Arc<JwtConfig>) -> Self {
        Self { db, jwt }
    }

    /// Authenticate by username or email and open a session.
    ///
    /// Overwrites any stored fingerprint: one live refresh session per
    /// user, a new login invalidates the previous refresh token.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        deadline: Instant,
    ) -> Result<(User, TokenPair), SessionError> {
        let user = store_call(deadline, self.db.users().get_by_identifier(identifier))
            .await?
            .ok_or(SessionError::NotFound)?;

        verify_password(password, &user.password_hash)?;

        let (pair, jti) = self.issue_pair(&user.uuid)?;
        store_call(
            deadline,
            self.db
                .users()
                .set_refresh_fingerprint(user.id, &fingerprint(&jti)),
        )
        .await?;

        Ok((user, pair))
    }

    /// Exchange a refresh token for a new token pair, rotating the stored
    /// fingerprint.
    ///
    /// Two racing calls with the same token both pass verification, but
    /// the compare-and-swap lets exactly one of them rotate; the loser
    /// gets `SessionRevoked` and must re-authenticate, because its token
    /// is provably stale.
    pub async fn refresh(
        &self,
        presented: &str,
        deadline: Instant,
    ) -> Result<TokenPair, SessionError> {
        let claims = self
            .jwt
            .validate_refresh_token(presented)
            .map_err(codec_err)?;

        let user = store_call(deadline, self.db.users().get_by_uuid(&claims.sub))
            .await?
            .ok_or(SessionError::SessionRevoked)?;

        let presented_fp = fingerprint(&claims.jti);
        if user.refresh_fingerprint.as_deref() != Some(presented_fp.as_str()) {
            return Err(SessionError::SessionRevoked);
        }

        let (pair, new_jti) = self.issue_pair(&user.uuid)?;
        let swapped = store_call(
            deadline,
            self.db.users().swap_refresh_fingerprint(
                user.id,
                &presented_fp,
                &fingerprint(&new_jti),
            ),
        )
        .await?;

        if !swapped {
            return Err(SessionError::SessionRevoked);
        }

        Ok(pair)
    }

    /// Close the session. Idempotent: logging out twice, or logging out a
    /// user that no longer exists, succeeds.
    pub async fn logout(&self, user_uuid: &str, deadline: Instant) -> Result<(), SessionError> {
        let Some(user) = store_call(deadline, self.db.users().get_by_uuid(user_uuid)).await?
        else {
            return Ok(());
        };

        store_call(deadline, self.db.users().clear_refresh_fingerprint(user.id)).await?;
        Ok(())
    }

    /// Verify the old password and store a new hash.
    ///
    /// Deliberately leaves the refresh fingerprint in place: a password
    /// change does not force re-login.
    pub async fn change_password(
        &self,
        user_uuid: &str,
        old_password: &str,
        new_password: &str,
        deadline: Instant,
    ) -> Result<(), SessionError> {
        let user = store_call(deadline, self.db.users().get_by_uuid(user_uuid))
            .await?
            .ok_or(SessionError::NotFound)?;

        verify_password(old_password, &user.password_hash)?;

        let new_hash = hash_password(new_password)?;
        store_call(deadline, self.db.users().set_password_hash(user.id, &new_hash)).await?;
        Ok(())
    }

    fn issue_pair(&self, user_uuid: &str) -> Result<(TokenPair, String), SessionError> {
        let access = self
            .jwt
            .generate_access_token(user_uuid)
            .map_err(codec_err)?;
        let refresh = self
            .jwt
            .generate_refresh_token(user_uuid)
            .map_err(codec_err)?;

        Ok((
            TokenPair {
                access_token: access.token,
                access_duration: access.duration,
                refresh_token: refresh.token,
                refresh_duration: refresh.duration,
            },
            refresh.jti,
        ))
    }
}

/// Run a store future against the caller's deadline, folding the outcome
/// into the session error taxonomy.
async fn store_call<T>(
    deadline: Instant,
    fut: impl Future<Output = Result<T, sqlx::Error>>,
) -> Result<T, SessionError> {
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!(error = %e, "Credential store error");
            Err(SessionError::StoreUnavailable)
        }
        Err(_) => Err(SessionError::DeadlineExceeded),
    }
}
