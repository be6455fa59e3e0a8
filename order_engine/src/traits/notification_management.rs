use crate::{
    db_types::{NewNotification, Notification},
    traits::OrderStoreError,
};

#[allow(async_fn_in_trait)]
pub trait NotificationManagement {
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, OrderStoreError>;

    /// The notifications for the given user, newest first.
    async fn fetch_notifications_for_user(&self, user_id: i64) -> Result<Vec<Notification>, OrderStoreError>;
}
