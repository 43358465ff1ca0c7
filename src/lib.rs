pub mod api;
pub mod config;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;

// Re-export commonly used items
pub use config::Config;
pub use models::dataset::Dataset;
pub use services::open_data::OpenDataService;
pub use services::pet_store::{MemoryPetStore, PetStore};
