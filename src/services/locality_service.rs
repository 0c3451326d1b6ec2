use std::sync::Arc;

use crate::db::LocalityStore;
use crate::services::error::ServiceError;

#[derive(Clone)]
pub struct LocalityService {
    store: Arc<dyn LocalityStore>,
}

impl LocalityService {
    pub fn new(store: Arc<dyn LocalityStore>) -> Self {
        Self { store }
    }

    pub async fn list_provinces(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.store.provinces().await?)
    }

    /// Cities of a province; a blank province is a validation error
    pub async fn list_cities(&self, province: &str) -> Result<Vec<String>, ServiceError> {
        let province = province.trim();
        if province.is_empty() {
            return Err(ServiceError::validation(None, "province is required"));
        }
        Ok(self.store.cities(province).await?)
    }
}
