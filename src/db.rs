pub mod error;
pub mod locality_repository;
pub mod models;
pub mod store;
pub mod user_repository;
pub mod vehicle_repository;

pub use error::DbError;
pub use locality_repository::LocalityRepository;
pub use models::*;
pub use store::{LocalityStore, UserStore, VehicleStore};
pub use user_repository::UserRepository;
pub use vehicle_repository::VehicleRepository;
