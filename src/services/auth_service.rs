use std::sync::{Arc, LazyLock};

use tracing::{info, instrument, warn};

use crate::auth::{hash_password, verify_password, Role, Session, SessionStore};
use crate::db::UserStore;
use crate::services::error::ServiceError;

// Verified against on unknown logins so both failure paths pay the argon2 cost
static UNKNOWN_USER_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("unknown-user").unwrap_or_default());

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: SessionStore,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, sessions: SessionStore) -> Self {
        Self { users, sessions }
    }

    /// Check credentials and open a session
    ///
    /// Unknown logins and wrong passwords fail the same way.
    #[instrument(skip(self, password))]
    pub async fn login(&self, login: &str, password: &str) -> Result<Session, ServiceError> {
        let login = login.trim();
        let Some(account) = self.users.find_by_login(login).await? else {
            verify_password(password, &UNKNOWN_USER_HASH);
            warn!("Login attempt for unknown user");
            return Err(ServiceError::InvalidCredentials);
        };

        if !verify_password(password, &account.password_hash) {
            warn!("Wrong password");
            return Err(ServiceError::InvalidCredentials);
        }

        let role = Role::from_droit(&account.droit);
        let session = self
            .sessions
            .issue(&account.login, &account.display_name, role)
            .await;

        info!("{} logged in with {} access", account.login, role);
        Ok(session)
    }

    pub async fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token).await
    }

    pub async fn resolve(&self, token: &str) -> Option<Session> {
        self.sessions.resolve(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DbError, UserAccount};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct OneUser {
        account: UserAccount,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl UserStore for OneUser {
        async fn find_by_login(&self, login: &str) -> Result<Option<UserAccount>, DbError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok((login == self.account.login).then(|| self.account.clone()))
        }

        async fn save(&self, _account: &UserAccount) -> Result<(), DbError> {
            Ok(())
        }
    }

    fn service() -> (AuthService, Arc<OneUser>) {
        let users = Arc::new(OneUser {
            account: UserAccount {
                login: "amine".to_string(),
                display_name: "Amine".to_string(),
                password_hash: hash_password("garage-2024").unwrap(),
                droit: "admin".to_string(),
            },
            lookups: AtomicUsize::new(0),
        });
        let service = AuthService::new(users.clone(), SessionStore::new(Duration::minutes(5)));
        (service, users)
    }

    #[test]
    fn test_unknown_user_hash_is_a_real_argon2_hash() {
        assert!(UNKNOWN_USER_HASH.starts_with("$argon2id$"));
        assert!(verify_password("unknown-user", &UNKNOWN_USER_HASH));
    }

    #[tokio::test]
    async fn test_unknown_login_and_wrong_password_fail_alike() {
        let (service, users) = service();

        let unknown = service.login("nobody", "garage-2024").await.unwrap_err();
        let wrong = service.login("amine", "nope").await.unwrap_err();

        assert!(matches!(unknown, ServiceError::InvalidCredentials));
        assert!(matches!(wrong, ServiceError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(users.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_login_trims_and_opens_session() {
        let (service, _) = service();

        let session = service.login("  amine ", "garage-2024").await.unwrap();

        assert_eq!(session.role, Role::Full);
        assert!(service.resolve(&session.token).await.is_some());
        assert!(service.logout(&session.token).await);
    }
}
