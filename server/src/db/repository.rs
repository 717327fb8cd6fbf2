use sqlx::sqlite::SqlitePool;

use super::models::{hash_password, NewUser, User, UserChanges, UserRecord};
use crate::error::{AppError, Result};

const SELECT_USER: &str = "SELECT id, first_name, last_name, email, address, phone, username, password_hash FROM users";

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!("{SELECT_USER} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(records.into_iter().map(User::from).collect())
    }

    pub async fn find_user(&self, id: i64) -> Result<User> {
        self.find_record(id).await.map(User::from)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!("{SELECT_USER} WHERE username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Inserts a new user. Duplicate `email`/`username` values are rejected by
    /// the table's UNIQUE constraints, so concurrent creates cannot both win.
    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        new_user.validate()?;

        let password_hash = hash_password(&new_user.password).await?;

        let result = sqlx::query(
            "INSERT INTO users
                (first_name, last_name, email, address, phone, username, password_hash)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.email)
        .bind(new_user.address.as_deref().unwrap_or_default())
        .bind(new_user.phone.as_deref().unwrap_or_default())
        .bind(&new_user.username)
        .bind(&password_hash)
        .execute(&self.pool)
        .await
        .map_err(map_constraint_error)?;

        let id = result.last_insert_rowid();
        log::info!("Created user {} (id: {})", new_user.username, id);

        Ok(User {
            id,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            address: new_user.address.unwrap_or_default(),
            phone: new_user.phone.unwrap_or_default(),
            username: new_user.username,
        })
    }

    /// Applies a partial update in one statement. Columns the caller left
    /// out are never written, so concurrent partial updates do not clobber
    /// each other.
    pub async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User> {
        // Unknown ids are reported before field validation.
        self.find_record(id).await?;
        changes.validate()?;

        let password_hash = match changes.new_password() {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        let result = sqlx::query(
            "UPDATE users
             SET first_name = COALESCE(?, first_name),
                 last_name = COALESCE(?, last_name),
                 email = COALESCE(?, email),
                 address = COALESCE(?, address),
                 phone = COALESCE(?, phone),
                 username = COALESCE(?, username),
                 password_hash = COALESCE(?, password_hash)
             WHERE id = ?",
        )
        .bind(changes.first_name.as_deref())
        .bind(changes.last_name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.address.as_deref())
        .bind(changes.phone.as_deref())
        .bind(changes.username.as_deref())
        .bind(password_hash.as_deref())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_constraint_error)?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }

        let record = self.find_record(id).await?;
        log::info!("Updated user {} (id: {})", record.username, id);
        Ok(User::from(record))
    }

    pub async fn delete_user(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }

        log::info!("Deleted user {}", id);
        Ok(())
    }

    /// Same error for unknown user and wrong password.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<User> {
        let record = self
            .find_by_username(username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !record.verify_password(password).await? {
            log::warn!("Failed login attempt for user: {}", username);
            return Err(AppError::InvalidCredentials);
        }

        Ok(User::from(record))
    }

    async fn find_record(&self, id: i64) -> Result<UserRecord> {
        sqlx::query_as::<_, UserRecord>(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| user_not_found(id))
    }
}

fn user_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("User with id '{}' not found", id))
}

fn map_constraint_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            // SQLite reports "UNIQUE constraint failed: users.<column>"
            let field = if db_err.message().contains("users.email") {
                "email"
            } else {
                "username"
            };
            return AppError::Conflict(format!("A user with this {} already exists", field));
        }
    }
    AppError::Database(err)
}
