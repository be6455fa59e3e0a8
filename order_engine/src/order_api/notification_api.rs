use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewNotification, Notification},
    order_api::errors::OrderFlowError,
    traits::NotificationManagement,
};

pub struct NotificationApi<B> {
    db: B,
}

impl<B> Debug for NotificationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationApi")
    }
}

impl<B> NotificationApi<B>
where B: NotificationManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn notify(&self, notification: NewNotification) -> Result<Notification, OrderFlowError> {
        let user_id = notification.user_id;
        let result = self.db.insert_notification(notification).await?;
        debug!("📬️ Notification #{} queued for user #{user_id}", result.id);
        Ok(result)
    }

    pub async fn notifications_for_user(&self, user_id: i64) -> Result<Vec<Notification>, OrderFlowError> {
        let result = self.db.fetch_notifications_for_user(user_id).await?;
        Ok(result)
    }
}
