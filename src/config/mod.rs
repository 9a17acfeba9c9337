/// Database connection, schema creation and first-run seeding
pub mod database;

/// Settings loaded from config.toml
pub mod settings;

pub use settings::{AppConfig, load_app_configuration};
