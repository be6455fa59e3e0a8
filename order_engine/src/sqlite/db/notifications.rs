use sqlx::SqliteConnection;

use crate::{
    db_types::{NewNotification, Notification},
    sqlite::SqliteDatabaseError,
};

pub async fn insert_notification(
    notification: NewNotification,
    conn: &mut SqliteConnection,
) -> Result<Notification, SqliteDatabaseError> {
    let result = sqlx::query_as("INSERT INTO notifications (user_id, title, message) VALUES ($1, $2, $3) RETURNING *")
        .bind(notification.user_id)
        .bind(notification.title)
        .bind(notification.message)
        .fetch_one(conn)
        .await?;
    Ok(result)
}

pub async fn fetch_notifications_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Notification>, SqliteDatabaseError> {
    let result = sqlx::query_as("SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(result)
}
