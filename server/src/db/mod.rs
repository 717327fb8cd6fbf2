pub mod models;
pub mod repository;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub use models::{NewUser, User, UserChanges, UserRecord};
pub use repository::UserRepository;

use crate::error::Result;

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    address TEXT,
    phone TEXT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL
)
"#;

pub const BOOTSTRAP_USERNAME: &str = "admin";
pub const BOOTSTRAP_PASSWORD: &str = "admin";

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Self { pool })
    }

    /// Private in-memory store. A single connection that is never recycled,
    /// since every SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    /// Creates the schema and seeds the bootstrap admin when the table is
    /// empty. Safe to run against an already initialized store.
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;

        let users = self.users();
        if users.count().await? == 0 {
            let admin = NewUser {
                first_name: "Admin".to_string(),
                last_name: "User".to_string(),
                email: "admin@example.com".to_string(),
                address: Some("Admin Street 1".to_string()),
                phone: Some("0000000000".to_string()),
                username: BOOTSTRAP_USERNAME.to_string(),
                password: BOOTSTRAP_PASSWORD.to_string(),
            };
            users.create_user(admin).await?;
            log::info!(
                "Created default admin user (username: {}, password: {})",
                BOOTSTRAP_USERNAME,
                BOOTSTRAP_PASSWORD
            );
        }

        log::info!("Database schema initialized");
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_seeds_admin_once() {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
        db.initialize().await.unwrap();

        let users = db.users().list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "admin");
        assert_eq!(users[0].email, "admin@example.com");
        assert_eq!(users[0].address, "Admin Street 1");
    }

    #[tokio::test]
    async fn test_ping() {
        let db = Database::in_memory().await.unwrap();
        assert!(db.ping().await.is_ok());

        db.close().await;
        assert!(db.ping().await.is_err());
    }
}
