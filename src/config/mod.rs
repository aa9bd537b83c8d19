pub mod settings;

pub use settings::{AppConfig, AppSettings, DatabaseConfig, Profile, ServerConfig};
