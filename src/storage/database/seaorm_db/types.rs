use sea_orm::DatabaseConnection;

/// SeaORM-backed webhook store
#[derive(Debug, Clone)]
pub struct SeaOrmDatabase {
    pub(super) db: DatabaseConnection,
}
