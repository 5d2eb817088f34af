use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{NewNotification, Notification, NotificationStats, NotificationType};

/// Every read and write is filtered by `user_id`, so a caller never
/// observes another user's rows.
pub struct NotificationRepository;

impl NotificationRepository {
    pub async fn insert<'e, E>(executor: E, new: &NewNotification) -> AppResult<Notification>
    where
        E: PgExecutor<'e>,
    {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (id, user_id, title, message, type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&new.message)
        .bind(new.kind)
        .fetch_one(executor)
        .await?;

        Ok(notification)
    }

    pub async fn find_for_user<'e, E>(executor: E, id: Uuid, user_id: Uuid) -> AppResult<Option<Notification>>
    where
        E: PgExecutor<'e>,
    {
        let notification = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(notification)
    }

    pub async fn list<'e, E>(
        executor: E,
        user_id: Uuid,
        unread_only: bool,
        kind: Option<NotificationType>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Notification>>
    where
        E: PgExecutor<'e>,
    {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND deleted_at IS NULL
              AND (NOT $2 OR is_read = FALSE)
              AND ($3::notification_type IS NULL OR type = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(kind)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        Ok(notifications)
    }

    pub async fn count<'e, E>(
        executor: E,
        user_id: Uuid,
        unread_only: bool,
        kind: Option<NotificationType>,
    ) -> AppResult<i64>
    where
        E: PgExecutor<'e>,
    {
        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE user_id = $1 AND deleted_at IS NULL
              AND (NOT $2 OR is_read = FALSE)
              AND ($3::notification_type IS NULL OR type = $3)
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(kind)
        .fetch_one(executor)
        .await?;

        Ok(total.0)
    }

    pub async fn mark_read<'e, E>(executor: E, id: Uuid, user_id: Uuid) -> AppResult<Option<Notification>>
    where
        E: PgExecutor<'e>,
    {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET is_read = TRUE, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(notification)
    }

    /// Marks the caller's unread rows as read and returns how many changed.
    pub async fn mark_all_read<'e, E>(executor: E, user_id: Uuid) -> AppResult<u64>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET is_read = TRUE, updated_at = NOW()
            WHERE user_id = $1 AND is_read = FALSE AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn soft_delete<'e, E>(executor: E, id: Uuid, user_id: Uuid) -> AppResult<bool>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET deleted_at = NOW()
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn stats<'e, E>(executor: E, user_id: Uuid) -> AppResult<NotificationStats>
    where
        E: PgExecutor<'e> + Copy,
    {
        let (total_notifications, unread_notifications): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE is_read = FALSE)
            FROM notifications
            WHERE user_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        let by_type: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT type::text, COUNT(*) FROM notifications
            WHERE user_id = $1 AND deleted_at IS NULL
            GROUP BY type
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(NotificationStats {
            total_notifications,
            unread_notifications,
            notifications_by_type: by_type.into_iter().collect(),
        })
    }
}
