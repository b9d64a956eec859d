//! Bearer token issuance and resolution.
//!
//! Tokens are 32 random bytes, base64url encoded. Only their SHA-256 digest
//! is persisted; the raw token is returned once, at issue time.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Datelike, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::db::{TokenRepository, UserRepository};
use crate::error::{Error, Result};
use crate::models::{normalize_email, User};
use crate::passwords::Passwords;

pub const INVALID_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";
pub const INVALID_TOKEN: &str = "Invalid token.";

/// Stored timestamps are fixed-width text, so expiries stay within four-digit years.
const LAST_EXPIRY_YEAR: i32 = 9999;

#[derive(Debug, Clone)]
pub struct TokenService {
    tokens: TokenRepository,
    users: UserRepository,
    passwords: Passwords,
    ttl: Option<Duration>,
    /// Verified against when the email is unknown, so both failure paths
    /// cost the same.
    dummy_hash: String,
}

impl TokenService {
    pub fn new(
        tokens: TokenRepository,
        users: UserRepository,
        passwords: Passwords,
        ttl_hours: Option<u64>,
    ) -> Result<Self> {
        let ttl = ttl_hours.map(ttl_from_hours).transpose()?;
        let dummy_hash = passwords.hash(&generate_token())?;
        Ok(Self {
            tokens,
            users,
            passwords,
            ttl,
            dummy_hash,
        })
    }

    /// Exchanges credentials for a new token. Unknown email, wrong password
    /// and inactive account all fail with the same message.
    pub async fn issue_token(&self, email: &str, password: &str) -> Result<String> {
        let user = self.users.get_by_email(&normalize_email(email)).await?;

        let hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash.clone(),
        };
        let matches = self
            .passwords
            .verify_blocking(hash, password.to_string())
            .await?;

        let user = match user {
            Some(user) if matches && user.is_active => user,
            _ => {
                tracing::info!("Rejected token request for {}", email);
                return Err(Error::Authentication(INVALID_CREDENTIALS.into()));
            }
        };

        let token = generate_token();
        let now = Utc::now();
        let expires_at = expiry(now, self.ttl)?;
        self.tokens
            .insert(&digest(&token), user.id, now, expires_at)
            .await?;
        self.users.touch_last_login(user.id).await?;

        tracing::info!("Issued token for account {}", user.id);
        Ok(token)
    }

    /// Resolves a presented token to its active owner.
    pub async fn resolve(&self, token: &str) -> Result<User> {
        let invalid = || Error::Authentication(INVALID_TOKEN.into());

        let owner = self
            .tokens
            .find_owner(&digest(token), Utc::now())
            .await?
            .ok_or_else(invalid)?;

        match self.users.get_by_id(owner).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(invalid()),
        }
    }

    /// Revokes every token belonging to `user`. Returns how many were removed.
    pub async fn revoke_all(&self, user: &User) -> Result<u64> {
        let removed = self.tokens.delete_for_user(user.id).await?;
        tracing::info!("Revoked {} token(s) for {}", removed, user.email);
        Ok(removed)
    }

    /// Removes expired tokens. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        Ok(self.tokens.delete_expired(Utc::now()).await?)
    }
}

fn ttl_from_hours(hours: u64) -> Result<Duration> {
    i64::try_from(hours)
        .ok()
        .and_then(Duration::try_hours)
        .filter(|ttl| expiry(Utc::now(), Some(*ttl)).is_ok())
        .ok_or_else(|| Error::Config(format!("token_ttl_hours {} is out of range", hours)))
}

/// Expiry for a token issued at `now`, or `None` when tokens never expire.
fn expiry(now: DateTime<Utc>, ttl: Option<Duration>) -> Result<Option<DateTime<Utc>>> {
    let Some(ttl) = ttl else {
        return Ok(None);
    };
    now.checked_add_signed(ttl)
        .filter(|at| at.year() <= LAST_EXPIRY_YEAR)
        .map(Some)
        .ok_or_else(|| {
            Error::Config(format!(
                "token lifetime of {} hours is out of range",
                ttl.num_hours()
            ))
        })
}

/// Generates a secure random token.
///
/// Returns 32 random bytes encoded as base64url (no padding).
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex SHA-256 of a token, the form tokens are stored in.
fn digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
