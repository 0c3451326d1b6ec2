//! Storage seams used by the services.
//!
//! Postgres repositories implement these in production; tests plug in
//! in-memory implementations.

use async_trait::async_trait;

use crate::db::{DbError, UserAccount, VehicleDetails, VehicleRecord};

/// The single-table vehicle inventory, keyed by frame number
#[async_trait]
pub trait VehicleStore: Send + Sync {
    /// All records ordered by frame number, optionally narrowed to those whose
    /// frame number or client contains `filter` (case-insensitive)
    async fn list_all(&self, filter: Option<&str>) -> Result<Vec<VehicleRecord>, DbError>;

    async fn get(&self, frame_number: &str) -> Result<Option<VehicleRecord>, DbError>;

    /// Fails with [`DbError::Duplicate`] when the frame number already exists
    async fn insert(&self, record: &VehicleRecord) -> Result<(), DbError>;

    /// Replace every non-key column; [`DbError::NotFound`] when absent
    async fn update(&self, frame_number: &str, details: &VehicleDetails) -> Result<(), DbError>;

    /// [`DbError::NotFound`] when absent
    async fn delete(&self, frame_number: &str) -> Result<(), DbError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_login(&self, login: &str) -> Result<Option<UserAccount>, DbError>;

    /// Insert or replace an account
    async fn save(&self, account: &UserAccount) -> Result<(), DbError>;
}

/// Province/city reference data for the sale and assignment fields
#[async_trait]
pub trait LocalityStore: Send + Sync {
    async fn provinces(&self) -> Result<Vec<String>, DbError>;

    async fn cities(&self, province: &str) -> Result<Vec<String>, DbError>;
}
