use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{User, UserRole};

pub struct NewUser<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub phone: &'a str,
    pub role: UserRole,
}

pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> AppResult<Option<User>>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> AppResult<Option<User>>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    pub async fn email_exists<'e, E>(executor: E, email: &str) -> AppResult<bool>
    where
        E: PgExecutor<'e>,
    {
        let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(executor)
            .await?;

        Ok(exists.0)
    }

    pub async fn insert<'e, E>(executor: E, new: &NewUser<'_>) -> AppResult<User>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, full_name, email, password_hash, phone, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.full_name)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.phone)
        .bind(new.role)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }

    pub async fn update_profile<'e, E>(
        executor: E,
        id: Uuid,
        full_name: Option<&str>,
        phone: Option<&str>,
        profile_image_url: Option<&str>,
    ) -> AppResult<User>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                full_name = COALESCE($2, full_name),
                phone = COALESCE($3, phone),
                profile_image_url = COALESCE($4, profile_image_url),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(phone)
        .bind(profile_image_url)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }

    pub async fn update_password<'e, E>(executor: E, id: Uuid, password_hash: &str) -> AppResult<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn set_active<'e, E>(executor: E, id: Uuid, is_active: bool) -> AppResult<Option<User>>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET is_active = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// `search` is an ILIKE pattern matched against name and email.
    pub async fn list<'e, E>(
        executor: E,
        role: Option<UserRole>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<User>>
    where
        E: PgExecutor<'e>,
    {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE deleted_at IS NULL
              AND ($1::user_role IS NULL OR role = $1)
              AND ($2::text IS NULL OR full_name ILIKE $2 OR email ILIKE $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(role)
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        Ok(users)
    }

    pub async fn count<'e, E>(executor: E, role: Option<UserRole>, search: Option<&str>) -> AppResult<i64>
    where
        E: PgExecutor<'e>,
    {
        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM users
            WHERE deleted_at IS NULL
              AND ($1::user_role IS NULL OR role = $1)
              AND ($2::text IS NULL OR full_name ILIKE $2 OR email ILIKE $2)
            "#,
        )
        .bind(role)
        .bind(search)
        .fetch_one(executor)
        .await?;

        Ok(total.0)
    }

    /// Public summaries for a batch of ids, used to preload related users.
    pub async fn find_many<'e, E>(executor: E, ids: &[Uuid]) -> AppResult<Vec<User>>
    where
        E: PgExecutor<'e>,
    {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(executor)
            .await?;

        Ok(users)
    }
}
