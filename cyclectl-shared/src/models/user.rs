/// User model and database operations
///
/// Users are never registered directly. They appear the first time the
/// sign-in gateway posts a verified profile, and every later sign-in refreshes
/// the profile and the login timestamp.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email TEXT NOT NULL,
///     name VARCHAR(255),
///     image VARCHAR(1024),
///     provider VARCHAR(50) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// CREATE UNIQUE INDEX users_email_lower_idx ON users (LOWER(email));
/// ```
///
/// # Example
///
/// ```no_run
/// use cyclectl_shared::models::user::{User, UpsertUser};
/// use cyclectl_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::upsert_by_email(&pool, UpsertUser {
///     email: "ada@example.com".to_string(),
///     name: Some("Ada".to_string()),
///     image: None,
///     provider: "github".to_string(),
/// })
/// .await?;
///
/// // Lookup is case-insensitive
/// let found = User::find_by_email(&pool, "ADA@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A signed-in person
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Unique case-insensitively
    pub email: String,

    pub name: Option<String>,

    /// Avatar URL from the identity provider
    pub image: Option<String>,

    /// Identity provider the last sign-in came through ("github", "google", ...)
    pub provider: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub last_login_at: Option<DateTime<Utc>>,
}

/// Profile posted by the sign-in gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertUser {
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub provider: String,
}

impl User {
    /// Inserts the user, or refreshes the existing row with the same email
    ///
    /// On conflict the provider and login time are always overwritten; name
    /// and image are only overwritten when the new profile carries them.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn upsert_by_email(pool: &PgPool, data: UpsertUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, image, provider, last_login_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT ((LOWER(email))) DO UPDATE
            SET name = COALESCE(EXCLUDED.name, users.name),
                image = COALESCE(EXCLUDED.image, users.image),
                provider = EXCLUDED.provider,
                updated_at = NOW(),
                last_login_at = NOW()
            RETURNING id, email, name, image, provider,
                      created_at, updated_at, last_login_at
            "#,
        )
        .bind(data.email.trim())
        .bind(data.name)
        .bind(data.image)
        .bind(data.provider)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, image, provider,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address (case-insensitive)
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use cyclectl_shared::models::user::User;
    /// # use sqlx::PgPool;
    /// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
    /// if let Some(user) = User::find_by_email(&pool, "ada@example.com").await? {
    ///     println!("Found user: {}", user.id);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, image, provider,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }
}
