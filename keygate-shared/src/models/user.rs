/// User model and database operations
///
/// This module provides the User model and CRUD operations for managing
/// accounts. Logins and emails are unique across all users; the database
/// enforces both with unique indexes, so writers racing past the
/// application-level checks still cannot create duplicates.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     login VARCHAR(255) NOT NULL UNIQUE,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use keygate_shared::models::user::{CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let mut conn = pool.acquire().await?;
///
/// // Create a new user
/// let new_user = CreateUser {
///     login: "ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// };
///
/// let user = User::create(&mut conn, new_user).await?;
/// println!("Created user: {}", user.id);
///
/// // Find by login
/// let found = User::find_by_login(&mut conn, "ada").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

/// User model representing an account
///
/// Passwords are stored as Argon2id hashes, never in plaintext. The hash
/// is excluded from serialization so it cannot leak into responses or
/// event payloads.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Login name
    ///
    /// Must be unique across all users
    pub login: String,

    /// Email address
    ///
    /// Must be unique across all users
    pub email: String,

    /// Argon2id password hash
    ///
    /// Never store plaintext passwords!
    /// Use the `auth::password` module for hashing/verification
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// When the user account was created
    pub created_at: DateTime<Utc>,

    /// When the user account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
///
/// All fields are required. The password must already be hashed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Login name (must be unique)
    pub login: String,

    /// Email address (must be unique)
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New login name
    pub login: Option<String>,

    /// New email address
    pub email: Option<String>,

    /// New password hash
    pub password_hash: Option<String>,
}

impl User {
    /// Creates a new user in the database
    ///
    /// # Arguments
    ///
    /// * `conn` - Database connection (pooled or inside a transaction)
    /// * `data` - User creation data
    ///
    /// # Returns
    ///
    /// The newly created user with generated ID and timestamps
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Login or email already exists (unique constraint violation)
    /// - Database connection fails
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use keygate_shared::models::user::{CreateUser, User};
    /// # use sqlx::PgPool;
    /// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
    /// # let mut conn = pool.acquire().await?;
    /// let new_user = CreateUser {
    ///     login: "ada".to_string(),
    ///     email: "ada@example.com".to_string(),
    ///     password_hash: "$argon2id$...".to_string(),
    /// };
    ///
    /// let user = User::create(&mut conn, new_user).await?;
    /// println!("Created user: {}", user.id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create(conn: &mut PgConnection, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (login, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, login, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(data.login)
        .bind(data.email)
        .bind(data.password_hash)
        .fetch_one(&mut *conn)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    ///
    /// # Arguments
    ///
    /// * `conn` - Database connection
    /// * `id` - User ID to search for
    ///
    /// # Returns
    ///
    /// The user if found, None otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, login, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(user)
    }

    /// Finds a user by login name
    ///
    /// # Returns
    ///
    /// The user if found, None otherwise
    pub async fn find_by_login(
        conn: &mut PgConnection,
        login: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, login, email, password_hash, created_at, updated_at
            FROM users
            WHERE login = $1
            "#,
        )
        .bind(login)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address
    ///
    /// # Returns
    ///
    /// The user if found, None otherwise
    pub async fn find_by_email(
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, login, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(user)
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` will be updated. The `updated_at`
    /// timestamp is automatically set to the current time.
    ///
    /// # Arguments
    ///
    /// * `conn` - Database connection (pooled or inside a transaction)
    /// * `id` - ID of user to update
    /// * `data` - Fields to update (only non-None values are updated)
    ///
    /// # Returns
    ///
    /// The updated user if found, None if user doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Login or email already exists for another user
    /// - Database connection fails
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use keygate_shared::models::user::{UpdateUser, User};
    /// # use sqlx::PgPool;
    /// # use uuid::Uuid;
    /// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    /// # let mut conn = pool.acquire().await?;
    /// let update = UpdateUser {
    ///     email: Some("ada@newdomain.com".to_string()),
    ///     ..Default::default()
    /// };
    ///
    /// if let Some(user) = User::update(&mut conn, user_id, update).await? {
    ///     println!("Updated user: {}", user.email);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.login.is_some() {
            bind_count += 1;
            query.push_str(&format!(", login = ${}", bind_count));
        }
        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, login, email, password_hash, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(login) = data.login {
            q = q.bind(login);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }

        let user = q.fetch_optional(&mut *conn).await?;

        Ok(user)
    }
}
