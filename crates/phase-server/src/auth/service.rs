//! Authentication service: API key lookup and account bootstrap

use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use phase_edms::models::{Category, User};
use sqlx::SqlitePool;
use std::sync::Arc;

use super::api_key::{extract_key_prefix, generate_api_key, validate_key_format};

/// Authentication service
pub struct AuthService {
    pool: Arc<SqlitePool>,
}

impl AuthService {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Resolve the user owning an API key
    pub async fn verify_api_key(&self, api_key: &str) -> Result<User> {
        if !validate_key_format(api_key) {
            return Err(anyhow!("Invalid API key format"));
        }

        let key_prefix =
            extract_key_prefix(api_key).ok_or_else(|| anyhow!("Invalid key prefix"))?;

        // Only users sharing the prefix go through the hash check
        let candidates: Vec<(i64, String, String, String)> = sqlx::query_as(
            r#"
            SELECT id, email, name, api_key_hash FROM users
            WHERE api_key_prefix = ? AND api_key_hash IS NOT NULL
            "#,
        )
        .bind(&key_prefix)
        .fetch_all(self.pool.as_ref())
        .await?;

        for (id, email, name, key_hash) in candidates {
            if self.verify_key(api_key, &key_hash)? {
                return Ok(User { id, email, name });
            }
        }
        Err(anyhow!("Unknown API key"))
    }

    /// Create a user with a fresh API key, returned once
    pub async fn create_user(&self, email: &str, name: &str) -> Result<(User, String)> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(anyhow!("Invalid email: {}", email));
        }
        let api_key = generate_api_key(&email);
        let key_prefix = extract_key_prefix(&api_key).unwrap_or_default();
        let key_hash = self.hash_key(&api_key)?;

        let id = sqlx::query(
            "INSERT INTO users (email, name, api_key_prefix, api_key_hash) VALUES (?, ?, ?, ?)",
        )
        .bind(&email)
        .bind(name)
        .bind(&key_prefix)
        .bind(&key_hash)
        .execute(self.pool.as_ref())
        .await
        .with_context(|| format!("Failed to create user {}", email))?
        .last_insert_rowid();

        tracing::info!(user_id = id, email = %email, "User created");
        Ok((
            User {
                id,
                email,
                name: name.to_string(),
            },
            api_key,
        ))
    }

    pub async fn create_category(&self, organisation: &str, name: &str) -> Result<Category> {
        let id = sqlx::query("INSERT INTO categories (organisation, name) VALUES (?, ?)")
            .bind(organisation)
            .bind(name)
            .execute(self.pool.as_ref())
            .await
            .with_context(|| format!("Failed to create category {}/{}", organisation, name))?
            .last_insert_rowid();

        tracing::info!(category_id = id, organisation, name, "Category created");
        Ok(Category {
            id,
            organisation: organisation.to_string(),
            name: name.to_string(),
        })
    }

    /// Give a user access to the documents of a category
    pub async fn add_member(&self, category_id: i64, email: &str) -> Result<()> {
        let (user_id,): (i64,) = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or_else(|| anyhow!("Unknown user: {}", email))?;

        sqlx::query("INSERT OR IGNORE INTO category_users (category_id, user_id) VALUES (?, ?)")
            .bind(category_id)
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await
            .with_context(|| format!("Failed to add {} to category {}", email, category_id))?;

        tracing::info!(category_id, user_id, "Category member added");
        Ok(())
    }

    /// Hash an API key using Argon2
    fn hash_key(&self, key: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(key.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash key: {}", e))?;
        Ok(hash.to_string())
    }

    /// Verify an API key against a stored hash
    fn verify_key(&self, key: &str, hash: &str) -> Result<bool> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| anyhow!("Invalid hash format: {}", e))?;
        Ok(Argon2::default()
            .verify_password(key.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
