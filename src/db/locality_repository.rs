use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::{DbError, LocalityStore};

#[derive(Clone)]
pub struct LocalityRepository {
    pool: PgPool,
}

impl LocalityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocalityStore for LocalityRepository {
    #[instrument(skip(self))]
    async fn provinces(&self) -> Result<Vec<String>, DbError> {
        let provinces: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT province
            FROM localities
            WHERE province IS NOT NULL AND province <> ''
            ORDER BY province
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} provinces", provinces.len());
        Ok(provinces)
    }

    #[instrument(skip(self), fields(province = %province))]
    async fn cities(&self, province: &str) -> Result<Vec<String>, DbError> {
        let cities: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT city
            FROM localities
            WHERE province = $1 AND city IS NOT NULL AND city <> ''
            ORDER BY city
            "#,
        )
        .bind(province)
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} cities", cities.len());
        Ok(cities)
    }
}
