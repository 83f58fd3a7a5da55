//! Database storage implementation using SeaORM
//!
//! Works against SQLite and PostgreSQL; the backend is chosen by the URL scheme.

/// Database entities module
pub mod entities;
/// Database migration module
pub mod migration;
/// SeaORM database implementation module
pub mod seaorm_db;

// Re-export the main database interface
pub use seaorm_db::SeaOrmDatabase as Database;
