use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::sweets;

pub mod migrator;
pub mod repositories;

pub use repositories::sweet::{NewSweet, StockOutcome, SweetFilter, SweetPatch};
pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // An in-memory sqlite database exists per-connection; a pool wider
        // than one would hand out fresh empty databases.
        let (max_connections, min_connections) = if db_url.contains(":memory:") {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn sweet_repo(&self) -> repositories::sweet::SweetRepository {
        repositories::sweet::SweetRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    // ========== User Repository Methods ==========

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<User> {
        self.user_repo()
            .create(username, email, password, is_admin)
            .await
    }

    pub async fn authenticate_user(&self, email: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().authenticate_by_email(email, password).await
    }

    // ========== Sweet Repository Methods ==========

    pub async fn create_sweet(&self, sweet: NewSweet) -> Result<sweets::Model> {
        self.sweet_repo().create(sweet).await
    }

    pub async fn get_sweet(&self, id: i32) -> Result<Option<sweets::Model>> {
        self.sweet_repo().get(id).await
    }

    pub async fn list_sweets(&self) -> Result<Vec<sweets::Model>> {
        self.sweet_repo().list().await
    }

    pub async fn search_sweets(&self, filter: SweetFilter) -> Result<Vec<sweets::Model>> {
        self.sweet_repo().search(filter).await
    }

    pub async fn update_sweet(&self, id: i32, patch: SweetPatch) -> Result<Option<sweets::Model>> {
        self.sweet_repo().update(id, patch).await
    }

    pub async fn delete_sweet(&self, id: i32) -> Result<bool> {
        self.sweet_repo().delete(id).await
    }

    pub async fn purchase_sweet(&self, id: i32, quantity: i64) -> Result<StockOutcome> {
        self.sweet_repo().purchase(id, quantity).await
    }

    pub async fn restock_sweet(&self, id: i32, quantity: i64) -> Result<StockOutcome> {
        self.sweet_repo().restock(id, quantity).await
    }
}
