//! Single-logical-session store.
//!
//! Owns the current authenticated identity for one client of the system and
//! the single persisted key that survives process restarts. The store is an
//! explicitly owned object injected into callers; nothing here is global
//! state. Guards read the state through [`SessionState`], never ambient
//! storage.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::principal::{Identity, Role};
use super::verifier::{AuthError, CredentialVerifier};
use crate::users::UserStore;

/// Authentication lifecycle. A sign-in transitions through `Loading` and
/// fully resolves (success or failure) before any guard re-evaluates, so a
/// redirect decision is never made against a half-finished attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Loading,
    Authenticated(Identity),
}

/// Profile supplied at sign-up. Role is assigned here and immutable after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupProfile {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub register_no: Option<String>,
    pub role: Role,
}

pub struct SessionStore {
    persist_path: PathBuf,
    state: SessionState,
}

impl SessionStore {
    /// Open a session store whose persisted key lives at the given path.
    /// If a previously stored identity exists there, start Authenticated.
    pub fn open<P: AsRef<Path>>(persist_path: P) -> Self {
        let persist_path = persist_path.as_ref().to_path_buf();
        let state = match Self::probe(&persist_path) {
            Some(identity) => {
                debug!(user = %identity.id, "restored persisted session");
                SessionState::Authenticated(identity)
            }
            None => SessionState::Unauthenticated,
        };
        Self { persist_path, state }
    }

    fn probe(path: &Path) -> Option<Identity> {
        let bytes = fs::read(path).ok()?;
        match serde_json::from_slice::<Identity>(&bytes) {
            Ok(identity) => Some(identity),
            Err(e) => {
                // A corrupt key is treated as signed out rather than a fault.
                debug!("discarding unreadable session key: {}", e);
                None
            }
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.state {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    fn persist(&self, identity: &Identity) -> Result<(), AuthError> {
        if let Some(dir) = self.persist_path.parent() {
            fs::create_dir_all(dir).ok();
        }
        let json = serde_json::to_vec_pretty(identity)
            .context("serializing session identity")
            .map_err(AuthError::Store)?;
        fs::write(&self.persist_path, json)
            .with_context(|| format!("writing session key {}", self.persist_path.display()))
            .map_err(AuthError::Store)?;
        Ok(())
    }

    /// Validate the credential and transition to Authenticated on success.
    /// On failure the store reverts to its previous state and surfaces
    /// `InvalidCredentials`; the attempt resolves fully before returning.
    pub fn sign_in(
        &mut self,
        verifier: &dyn CredentialVerifier,
        username: &str,
        secret: &str,
    ) -> Result<Identity, AuthError> {
        let previous = std::mem::replace(&mut self.state, SessionState::Loading);
        match verifier.verify(username, secret) {
            Ok(Some(identity)) => {
                if let Err(e) = self.persist(&identity) {
                    self.state = previous;
                    return Err(e);
                }
                info!(user = %identity.id, role = identity.role.as_str(), "sign-in ok");
                self.state = SessionState::Authenticated(identity.clone());
                Ok(identity)
            }
            Ok(None) => {
                self.state = previous;
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => {
                self.state = previous;
                Err(e)
            }
        }
    }

    /// Create a new identity in the user store, persist it and transition to
    /// Authenticated. Succeeds for any well-formed profile with an unused
    /// username.
    pub fn sign_up(
        &mut self,
        users: &UserStore,
        profile: SignupProfile,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let identity = Identity {
            id: Uuid::new_v4().to_string(),
            email: profile.email,
            name: profile.name,
            department: profile.department,
            program: profile.program,
            register_no: profile.register_no,
            role: profile.role,
        };
        let identity = users.add_user(identity, password)?;
        self.persist(&identity)?;
        info!(user = %identity.id, role = identity.role.as_str(), "sign-up ok");
        self.state = SessionState::Authenticated(identity.clone());
        Ok(identity)
    }

    /// Clear the persisted key and transition to Unauthenticated, always.
    pub fn sign_out(&mut self) {
        if let Err(e) = fs::remove_file(&self.persist_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!("failed to remove session key: {}", e);
            }
        }
        self.state = SessionState::Unauthenticated;
    }
}
