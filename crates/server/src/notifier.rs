//! Notification surface for the stdio server.
//!
//! The embedding application owns the real surface; the server records what
//! it would show in the log stream.

use async_trait::async_trait;
use cours_offline_client::Notifier;
use cours_offline_core::{Error, Notification};

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(
            title = %notification.title,
            body = notification.body.as_deref().unwrap_or_default(),
            actions = notification.actions.len(),
            "show notification"
        );
        Ok(())
    }

    async fn close(&self, title: &str) -> Result<(), Error> {
        tracing::info!(title, "close notification");
        Ok(())
    }

    async fn open_window(&self, path: &str) -> Result<(), Error> {
        tracing::info!(path, "open window");
        Ok(())
    }
}
