use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};

use crate::db::{DbError, VehicleDetails, VehicleRecord, VehicleStore};

const VEHICLE_COLUMNS: &str = "frame_number, brand, model, color, invoice_ref, arrival_date, \
    dealer, client, dealer_sale_date, client_sale_date, national_id, observation, \
    birth_date, gender, sale_city, sale_province, assignment_city, assignment_province";

#[derive(Clone)]
pub struct VehicleRepository {
    pool: PgPool,
}

impl VehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `%term%` for ILIKE, with LIKE wildcards in the term escaped
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl VehicleStore for VehicleRepository {
    #[instrument(skip(self))]
    async fn list_all(&self, filter: Option<&str>) -> Result<Vec<VehicleRecord>, DbError> {
        let pattern = filter.map(like_pattern);
        debug!("Querying vehicles with pattern={:?}", pattern);

        let sql = format!(
            r#"
            SELECT {VEHICLE_COLUMNS}
            FROM vehicles
            WHERE $1::text IS NULL
               OR frame_number ILIKE $1 ESCAPE '\'
               OR client ILIKE $1 ESCAPE '\'
            ORDER BY frame_number
            "#
        );

        let vehicles = sqlx::query_as::<_, VehicleRecord>(&sql)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;

        debug!("Found {} vehicles", vehicles.len());
        Ok(vehicles)
    }

    #[instrument(skip(self), fields(frame_number = %frame_number))]
    async fn get(&self, frame_number: &str) -> Result<Option<VehicleRecord>, DbError> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE frame_number = $1");

        let vehicle = sqlx::query_as::<_, VehicleRecord>(&sql)
            .bind(frame_number)
            .fetch_optional(&self.pool)
            .await?;

        if vehicle.is_some() {
            debug!("Found vehicle");
        } else {
            debug!("Vehicle not found");
        }

        Ok(vehicle)
    }

    #[instrument(skip(self, record), fields(frame_number = %record.frame_number))]
    async fn insert(&self, record: &VehicleRecord) -> Result<(), DbError> {
        let d = &record.details;

        sqlx::query(
            r#"
            INSERT INTO vehicles (
                frame_number, brand, model, color, invoice_ref, arrival_date,
                dealer, client, dealer_sale_date, client_sale_date, national_id, observation,
                birth_date, gender, sale_city, sale_province, assignment_city, assignment_province
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(&record.frame_number)
        .bind(&d.brand)
        .bind(&d.model)
        .bind(&d.color)
        .bind(&d.invoice_ref)
        .bind(d.arrival_date)
        .bind(&d.dealer)
        .bind(&d.client)
        .bind(d.dealer_sale_date)
        .bind(d.client_sale_date)
        .bind(&d.national_id)
        .bind(&d.observation)
        .bind(d.birth_date)
        .bind(&d.gender)
        .bind(&d.sale_city)
        .bind(&d.sale_province)
        .bind(&d.assignment_city)
        .bind(&d.assignment_province)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                frame_number = %record.frame_number,
                error = %e,
                "Failed to insert vehicle"
            );
            DbError::from_write(&record.frame_number, e)
        })?;

        debug!("Inserted vehicle");
        Ok(())
    }

    #[instrument(skip(self, details), fields(frame_number = %frame_number))]
    async fn update(&self, frame_number: &str, details: &VehicleDetails) -> Result<(), DbError> {
        let d = details;

        let result = sqlx::query(
            r#"
            UPDATE vehicles SET
                brand = $2, model = $3, color = $4, invoice_ref = $5, arrival_date = $6,
                dealer = $7, client = $8, dealer_sale_date = $9, client_sale_date = $10,
                national_id = $11, observation = $12, birth_date = $13, gender = $14,
                sale_city = $15, sale_province = $16, assignment_city = $17,
                assignment_province = $18, updated_at = NOW()
            WHERE frame_number = $1
            "#,
        )
        .bind(frame_number)
        .bind(&d.brand)
        .bind(&d.model)
        .bind(&d.color)
        .bind(&d.invoice_ref)
        .bind(d.arrival_date)
        .bind(&d.dealer)
        .bind(&d.client)
        .bind(d.dealer_sale_date)
        .bind(d.client_sale_date)
        .bind(&d.national_id)
        .bind(&d.observation)
        .bind(d.birth_date)
        .bind(&d.gender)
        .bind(&d.sale_city)
        .bind(&d.sale_province)
        .bind(&d.assignment_city)
        .bind(&d.assignment_province)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from_write(frame_number, e))?;

        if result.rows_affected() == 0 {
            debug!("No vehicle to update");
            return Err(DbError::NotFound(frame_number.to_string()));
        }

        info!("Updated vehicle {}", frame_number);
        Ok(())
    }

    #[instrument(skip(self), fields(frame_number = %frame_number))]
    async fn delete(&self, frame_number: &str) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM vehicles WHERE frame_number = $1")
            .bind(frame_number)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            debug!("No vehicle to delete");
            return Err(DbError::NotFound(frame_number.to_string()));
        }

        info!("Deleted vehicle {}", frame_number);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("LBM"), "%LBM%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
