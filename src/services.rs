pub mod auth_service;
pub mod error;
pub mod locality_service;
pub mod record_sync;
pub mod vehicle_service;

pub use auth_service::AuthService;
pub use error::ServiceError;
pub use locality_service::LocalityService;
pub use record_sync::{RecordSync, SyncError, SyncReport};
pub use vehicle_service::VehicleService;
