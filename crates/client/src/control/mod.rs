//! Control channel: page messages, push notifications, notification clicks
//! and background sync.
//!
//! Nothing arriving here is answered. Malformed input is dropped after a
//! debug log and never surfaces as an error to the sender.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use cours_offline_core::message::ACTION_EXPLORE;
use cours_offline_core::{CacheStorage, ControlMessage, Error, Notification, PushPayload};

use crate::lifecycle::Registration;

/// Tag acknowledged by [`ControlChannel::on_sync`].
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Platform notification surface.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<(), Error>;

    /// Dismiss the notification titled `title`.
    async fn close(&self, title: &str) -> Result<(), Error>;

    /// Bring the application to the foreground on `path`.
    async fn open_window(&self, path: &str) -> Result<(), Error>;
}

pub struct ControlChannel {
    storage: Arc<dyn CacheStorage>,
    registration: Arc<Registration>,
    notifier: Arc<dyn Notifier>,
    open_path: String,
}

impl ControlChannel {
    pub fn new(
        storage: Arc<dyn CacheStorage>, registration: Arc<Registration>, notifier: Arc<dyn Notifier>,
        open_path: impl Into<String>,
    ) -> Self {
        Self { storage, registration, notifier, open_path: open_path.into() }
    }

    /// Apply a message posted by the application.
    ///
    /// Returns the decoded message, or `None` when it was dropped.
    pub async fn on_message(&self, value: &serde_json::Value) -> Option<ControlMessage> {
        let message = match ControlMessage::parse(value) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(error = %err, "dropping control message");
                return None;
            }
        };

        match message {
            ControlMessage::SkipWaiting => {
                self.registration.skip_waiting().await;
            }
            ControlMessage::CacheUpdate => {
                self.invalidate_all().await;
            }
        }
        Some(message)
    }

    /// Delete every generation, current ones included.
    ///
    /// Returns how many were deleted. Storage failures are logged.
    pub async fn invalidate_all(&self) -> usize {
        let names = match self.storage.list_names().await {
            Ok(names) => names,
            Err(err) => {
                tracing::warn!(error = %err, "could not list cache generations");
                return 0;
            }
        };

        let mut deleted = 0;
        for name in &names {
            match self.storage.delete_store(name).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(err) => tracing::warn!(generation = %name, error = %err, "could not delete generation"),
            }
        }

        tracing::info!(deleted, "invalidated all cache generations");
        deleted
    }

    /// Raise a notification for a push payload.
    ///
    /// An empty, non-JSON or title-less payload shows nothing.
    pub async fn on_push(&self, data: &str) -> Option<Notification> {
        let payload = match PushPayload::parse(data) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::debug!(error = %err, "dropping push payload");
                return None;
            }
        };

        let notification = Notification::from_payload(payload, Utc::now());
        if let Err(err) = self.notifier.show(&notification).await {
            tracing::warn!(error = %err, "could not show notification");
            return None;
        }
        Some(notification)
    }

    /// Handle a click on a notification button.
    ///
    /// The notification is always closed. `explore` also opens the
    /// application; the opened path is returned.
    pub async fn on_notification_click(&self, title: &str, action: &str) -> Option<String> {
        if let Err(err) = self.notifier.close(title).await {
            tracing::warn!(error = %err, "could not close notification");
        }

        if action != ACTION_EXPLORE {
            return None;
        }

        match self.notifier.open_window(&self.open_path).await {
            Ok(()) => Some(self.open_path.clone()),
            Err(err) => {
                tracing::warn!(path = %self.open_path, error = %err, "could not open window");
                None
            }
        }
    }

    /// Handle a background sync event. Only [`BACKGROUND_SYNC_TAG`] is
    /// acknowledged.
    pub async fn on_sync(&self, tag: &str) -> bool {
        if tag != BACKGROUND_SYNC_TAG {
            tracing::debug!(tag, "ignoring sync tag");
            return false;
        }
        tracing::info!(tag, "background sync");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Network;
    use crate::lifecycle::{LifecycleState, Worker};
    use crate::testing::{FailingStorage, RecordingNotifier, ScriptedNetwork, memory_storage};
    use cours_offline_core::{RequestIdentity, VersionSet, open_store};
    use serde_json::json;
    use url::Url;

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://cours.local{path}")).unwrap()
    }

    struct Fixture {
        storage: Arc<dyn CacheStorage>,
        registration: Arc<Registration>,
        notifier: Arc<RecordingNotifier>,
        channel: ControlChannel,
    }

    async fn fixture() -> Fixture {
        let storage = memory_storage().await;
        let network = Arc::new(ScriptedNetwork::new());
        network.respond(&url("/"), 200, "<html></html>");
        let network: Arc<dyn Network> = network;
        let registration = Arc::new(Registration::new(Arc::clone(&storage), network));
        let notifier = Arc::new(RecordingNotifier::default());
        let channel = ControlChannel::new(
            Arc::clone(&storage),
            Arc::clone(&registration),
            notifier.clone(),
            "/",
        );
        Fixture { storage, registration, notifier, channel }
    }

    fn worker(version: &str) -> Worker {
        Worker::new(VersionSet::new(format!("static-{version}"), format!("dynamic-{version}")), vec![url("/")])
    }

    #[tokio::test]
    async fn test_skip_waiting_message_activates_waiting() {
        let f = fixture().await;
        let first = f.registration.register(worker("v1"), false).await.unwrap();
        let second = f.registration.register(worker("v2"), false).await.unwrap();
        assert_eq!(second.state().await, LifecycleState::Waiting);

        let message = f.channel.on_message(&json!({"type": "SKIP_WAITING"})).await;

        assert_eq!(message, Some(ControlMessage::SkipWaiting));
        assert_eq!(second.state().await, LifecycleState::Active);
        assert_eq!(first.state().await, LifecycleState::Superseded);
    }

    #[tokio::test]
    async fn test_cache_update_deletes_everything() {
        let f = fixture().await;
        let store = open_store(&f.storage, "static-v1").await.unwrap();
        let identity = RequestIdentity::new("GET", url("/app.js").as_str());
        store
            .put(&identity, &cours_offline_core::ProxyResponse::new(url("/app.js").as_str(), 200, "x"))
            .await
            .unwrap();
        f.storage.open_generation("dynamic-v1").await.unwrap();

        let message = f.channel.on_message(&json!({"type": "CACHE_UPDATE"})).await;

        assert_eq!(message, Some(ControlMessage::CacheUpdate));
        assert!(f.storage.list_names().await.unwrap().is_empty());
        assert_eq!(f.storage.match_any(&identity).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_message_dropped() {
        let f = fixture().await;
        f.storage.open_generation("static-v1").await.unwrap();

        assert_eq!(f.channel.on_message(&json!({"type": "RELOAD"})).await, None);
        assert_eq!(f.channel.on_message(&json!("SKIP_WAITING")).await, None);
        assert_eq!(f.storage.list_names().await.unwrap(), vec!["static-v1"]);
    }

    #[tokio::test]
    async fn test_invalidate_all_with_failing_storage() {
        let registration = Arc::new(Registration::new(Arc::new(FailingStorage), Arc::new(ScriptedNetwork::new())));
        let channel =
            ControlChannel::new(Arc::new(FailingStorage), registration, Arc::new(RecordingNotifier::default()), "/");
        assert_eq!(channel.invalidate_all().await, 0);
    }

    #[tokio::test]
    async fn test_push_shows_notification() {
        let f = fixture().await;

        let notification = f.channel.on_push(r#"{"title": "Nouveau cours", "body": "Algèbre"}"#).await.unwrap();

        assert_eq!(notification.title, "Nouveau cours");
        assert_eq!(notification.body.as_deref(), Some("Algèbre"));
        assert_eq!(notification.actions.len(), 2);
        assert_eq!(notification.data.primary_key, 1);
        assert_eq!(f.notifier.shown.lock().unwrap().as_slice(), &[notification]);
    }

    #[tokio::test]
    async fn test_malformed_push_shows_nothing() {
        let f = fixture().await;

        assert!(f.channel.on_push(r#"{"body": "no title"}"#).await.is_none());
        assert!(f.channel.on_push("not json").await.is_none());
        assert!(f.channel.on_push("").await.is_none());
        assert!(f.notifier.shown.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_explore_click_opens_window() {
        let f = fixture().await;

        assert_eq!(f.channel.on_notification_click("Nouveau cours", "explore").await.as_deref(), Some("/"));
        assert_eq!(f.notifier.opened.lock().unwrap().as_slice(), &["/".to_string()]);
        assert_eq!(f.notifier.closed.lock().unwrap().as_slice(), &["Nouveau cours".to_string()]);
    }

    #[tokio::test]
    async fn test_close_click_only_closes() {
        let f = fixture().await;

        assert_eq!(f.channel.on_notification_click("Nouveau cours", "close").await, None);
        assert!(f.notifier.opened.lock().unwrap().is_empty());
        assert_eq!(f.notifier.closed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_tags() {
        let f = fixture().await;
        assert!(f.channel.on_sync("background-sync").await);
        assert!(!f.channel.on_sync("other").await);
    }
}
