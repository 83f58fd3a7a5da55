// Module declarations
mod connection;
mod delivery_ops;
mod types;
mod webhook_ops;

// Re-export public types
pub use types::SeaOrmDatabase;
