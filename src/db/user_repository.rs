use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use crate::db::{DbError, UserAccount, UserStore};

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    #[instrument(skip(self), fields(login = %login))]
    async fn find_by_login(&self, login: &str) -> Result<Option<UserAccount>, DbError> {
        let account = sqlx::query_as::<_, UserAccount>(
            r#"
            SELECT login, display_name, password_hash, droit
            FROM users
            WHERE login = $1
            "#,
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        debug!("User lookup found={}", account.is_some());
        Ok(account)
    }

    #[instrument(skip(self, account), fields(login = %account.login))]
    async fn save(&self, account: &UserAccount) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO users (login, display_name, password_hash, droit)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (login) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                password_hash = EXCLUDED.password_hash,
                droit = EXCLUDED.droit
            "#,
        )
        .bind(&account.login)
        .bind(&account.display_name)
        .bind(&account.password_hash)
        .bind(&account.droit)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from_write(&account.login, e))?;

        info!("Saved user account {}", account.login);
        Ok(())
    }
}
