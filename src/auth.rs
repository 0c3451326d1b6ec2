//! Roles, password hashing and bearer sessions.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

/// Access right value that maps to [`Role::Restricted`]
pub const RESTRICTED_DROIT: &str = "consul";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Create, edit, delete, import, read and export
    Full,
    /// Read and export only
    Restricted,
}

impl Role {
    pub fn from_droit(droit: &str) -> Self {
        if droit.trim().eq_ignore_ascii_case(RESTRICTED_DROIT) {
            Role::Restricted
        } else {
            Role::Full
        }
    }

    pub fn can_write(self) -> bool {
        matches!(self, Role::Full)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Full => f.write_str("full"),
            Role::Restricted => f.write_str("restricted"),
        }
    }
}

/// Hash a plain password with argon2id
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
}

/// Verify a password against an argon2id hash; malformed hashes never verify
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Session {
    pub token: String,
    pub login: String,
    pub display_name: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// In-process session table
///
/// Tokens are random UUIDs. Expired entries are dropped when looked up and
/// swept whenever a new session is issued.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn issue(&self, login: &str, display_name: &str, role: Role) -> Session {
        let now = Utc::now();
        let session = Session {
            token: Uuid::new_v4().to_string(),
            login: login.to_string(),
            display_name: display_name.to_string(),
            role,
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        if sessions.len() < before {
            debug!("Swept {} expired sessions", before - sessions.len());
        }
        sessions.insert(session.token.clone(), session.clone());
        drop(sessions);

        debug!("Issued {} session for {}", role, login);
        session
    }

    pub async fn resolve(&self, token: &str) -> Option<Session> {
        let session = self.sessions.read().await.get(token).cloned()?;

        if session.expires_at <= Utc::now() {
            debug!("Session for {} expired", session.login);
            self.sessions.write().await.remove(token);
            return None;
        }

        Some(session)
    }

    /// Returns whether a session was removed
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}
