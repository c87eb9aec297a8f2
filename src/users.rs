//! Credential-backed user store.
//!
//! Persists user records (identity fields plus an Argon2 PHC password hash)
//! to `users.json` under the data root and implements the
//! [`CredentialVerifier`] seam consumed by the session store and the HTTP
//! login path. Login usernames are register numbers for students and email
//! addresses otherwise; both are matched under the same normalization rule
//! as eligibility checks.

use anyhow::{anyhow, Context, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use parking_lot::Mutex;
use password_hash::{PasswordHash, SaltString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::eligibility::normalize;
use crate::identity::{AuthError, CredentialVerifier, Identity, Role};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    #[serde(flatten)]
    identity: Identity,
    password_hash: String,
    created_at: i64,
}

fn users_path(root: &Path) -> PathBuf {
    root.join("users.json")
}

fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

fn read_records(path: &Path) -> Result<Vec<UserRecord>> {
    if !path.exists() { return Ok(Vec::new()); }
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading user store {}", path.display()))?;
    let records = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing user store {}", path.display()))?;
    Ok(records)
}

fn write_records(path: &Path, records: &[UserRecord]) -> Result<()> {
    if let Some(dir) = path.parent() { std::fs::create_dir_all(dir).ok(); }
    let json = serde_json::to_vec_pretty(records).context("serializing user store")?;
    std::fs::write(path, json)
        .with_context(|| format!("writing user store {}", path.display()))?;
    Ok(())
}

/// Login usernames a record answers to: register number first, then email.
fn usernames_of(identity: &Identity) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(reg) = &identity.register_no {
        names.push(normalize(reg));
    }
    names.push(normalize(&identity.email));
    names
}

pub struct UserStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on users.json.
    write_lock: Mutex<()>,
}

impl UserStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { path: users_path(root.as_ref()), write_lock: Mutex::new(()) }
    }

    /// Seed an `admin`/`admin` account on first run so the install is usable
    /// before any real accounts exist.
    pub fn ensure_default_admin(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        let records = read_records(&self.path)?;
        if records.iter().any(|r| r.identity.role == Role::Admin) {
            return Ok(());
        }
        let identity = Identity {
            id: uuid::Uuid::new_v4().to_string(),
            email: "admin@easyprep.local".into(),
            name: "Administrator".into(),
            department: None,
            program: None,
            register_no: Some("admin".into()),
            role: Role::Admin,
        };
        let record = UserRecord {
            identity,
            password_hash: hash_password("admin")?,
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        let mut records = records;
        records.push(record);
        write_records(&self.path, &records)?;
        info!("seeded default admin account");
        Ok(())
    }

    /// Add a user with the given plaintext password. Usernames (register
    /// number and email) must be unused.
    pub fn add_user(&self, identity: Identity, password: &str) -> Result<Identity, AuthError> {
        let _guard = self.write_lock.lock();
        let mut records = read_records(&self.path).map_err(AuthError::Store)?;
        let new_names = usernames_of(&identity);
        for record in &records {
            if usernames_of(&record.identity).iter().any(|n| new_names.contains(n)) {
                return Err(AuthError::UserExists(identity.email));
            }
        }
        let record = UserRecord {
            identity: identity.clone(),
            password_hash: hash_password(password).map_err(AuthError::Store)?,
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        records.push(record);
        write_records(&self.path, &records).map_err(AuthError::Store)?;
        Ok(identity)
    }

    /// Look up an identity by any of its login usernames.
    pub fn find_user(&self, username: &str) -> Result<Option<Identity>> {
        let needle = normalize(username);
        let records = read_records(&self.path)?;
        Ok(records
            .into_iter()
            .find(|r| usernames_of(&r.identity).contains(&needle))
            .map(|r| r.identity))
    }

    /// Verify a username/password pair. `Ok(None)` covers both unknown user
    /// and wrong password so callers surface one uniform failure.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<Identity>> {
        let needle = normalize(username);
        let records = read_records(&self.path)?;
        for record in records {
            if usernames_of(&record.identity).contains(&needle) {
                if verify_password(&record.password_hash, password) {
                    return Ok(Some(record.identity));
                }
                return Ok(None);
            }
        }
        Ok(None)
    }
}

impl CredentialVerifier for UserStore {
    fn verify(&self, username: &str, secret: &str) -> Result<Option<Identity>, AuthError> {
        self.authenticate(username, secret).map_err(AuthError::Store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let phc = hash_password("easyprep").unwrap();
        assert!(verify_password(&phc, "easyprep"));
        assert!(!verify_password(&phc, "easypreP"));
        assert!(!verify_password("not-a-phc-string", "easyprep"));
    }
}
