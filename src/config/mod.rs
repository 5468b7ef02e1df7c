/// Database configuration and connection management
pub mod database;

/// Application settings loaded from the TOML config file
pub mod settings;

pub use settings::{AppConfig, load_app_configuration};
