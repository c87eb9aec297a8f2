use thiserror::Error;

use super::principal::Identity;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("username already registered: {0}")]
    UserExists(String),
    #[error("user store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Credential verification seam. The session store depends only on this
/// trait so the backing store (argon2 file store today) can be swapped
/// without touching sign-in or guard logic.
///
/// `Ok(Some)` on a match, `Ok(None)` for unknown user or wrong secret;
/// `Err` is reserved for store faults.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, secret: &str) -> Result<Option<Identity>, AuthError>;
}
