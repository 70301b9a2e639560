use tokio::sync::broadcast;

/// Auth state changes, published once per sign-in or sign-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { admin_id: String, email: String },
    SignedOut { admin_id: Option<String> },
}

/// Single subscription point for auth changes.
#[derive(Debug, Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthEvent>,
}

impl AuthEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Publishing with nobody listening is not an error.
    pub fn publish(&self, event: AuthEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Log every auth change until the channel closes.
pub async fn log_auth_events(mut rx: broadcast::Receiver<AuthEvent>) {
    loop {
        match rx.recv().await {
            Ok(AuthEvent::SignedIn { admin_id, email }) => {
                tracing::info!(%admin_id, "Admin signed in: {}", email);
            }
            Ok(AuthEvent::SignedOut { admin_id }) => {
                tracing::info!(admin_id = ?admin_id, "Admin signed out");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Auth event listener lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let events = AuthEvents::new();
        let mut rx = events.subscribe();

        events.publish(AuthEvent::SignedIn {
            admin_id: "a1".into(),
            email: "a@b.c".into(),
        });
        events.publish(AuthEvent::SignedOut {
            admin_id: Some("a1".into()),
        });

        assert!(matches!(rx.recv().await.unwrap(), AuthEvent::SignedIn { .. }));
        assert_eq!(
            rx.recv().await.unwrap(),
            AuthEvent::SignedOut {
                admin_id: Some("a1".into())
            }
        );
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        AuthEvents::new().publish(AuthEvent::SignedOut { admin_id: None });
    }

    #[tokio::test]
    async fn logger_stops_when_channel_closes() {
        let events = AuthEvents::new();
        let rx = events.subscribe();
        drop(events);
        log_auth_events(rx).await;
    }
}
