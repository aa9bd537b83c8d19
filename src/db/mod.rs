pub mod connection;

// Re-export the connection module's functions for ease of use
pub use connection::{create_pool, verify_connection};
