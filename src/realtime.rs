use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Feed connection status shown in the header badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Real-time notification types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    EntryRecorded {
        lottery_type_id: String,
        instance_id: Uuid,
        user_id: String,
        ticket_count: u32,
    },
    PrizePoolUpdated {
        lottery_type_id: String,
        instance_id: Uuid,
        participants: u64,
        prize_pool: Decimal,
    },
    DrawScheduled {
        lottery_type_id: String,
        instance_id: Uuid,
        draw_time: DateTime<Utc>,
    },
    StatusChanged {
        status: ConnectionStatus,
    },
}

impl Notification {
    /// Channel the notification belongs to: `lottery:{id}`, `user:{id}` or `system`
    pub fn channel(&self) -> String {
        match self {
            Notification::EntryRecorded { user_id, .. } => format!("user:{}", user_id),
            Notification::PrizePoolUpdated { lottery_type_id, .. }
            | Notification::DrawScheduled { lottery_type_id, .. } => {
                format!("lottery:{}", lottery_type_id)
            }
            Notification::StatusChanged { .. } => "system".to_string(),
        }
    }
}

/// Receiving half of a hub subscription
pub struct Subscription {
    rx: broadcast::Receiver<Notification>,
    channel: Option<String>,
}

impl Subscription {
    fn wants(&self, notification: &Notification) -> bool {
        match &self.channel {
            None => true,
            Some(channel) => {
                notification.channel() == *channel
                    || matches!(notification, Notification::StatusChanged { .. })
            }
        }
    }

    /// Next notification for this subscription, `None` once the hub is gone.
    /// Lagged receivers skip what they missed.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            let received = self.rx.recv().await;
            match received {
                Ok(notification) if self.wants(&notification) => return Some(notification),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscriber lagged, skipped {} notifications", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<Notification> {
        loop {
            match self.rx.try_recv() {
                Ok(notification) if self.wants(&notification) => return Some(notification),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

/// Fan-out hub for lottery updates
#[derive(Clone)]
pub struct NotificationHub {
    tx: broadcast::Sender<Notification>,
    status: Arc<RwLock<ConnectionStatus>>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));

        Self {
            tx,
            status: Arc::new(RwLock::new(ConnectionStatus::Connected)),
        }
    }

    /// Subscribe to every notification
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            channel: None,
        }
    }

    /// Subscribe to one channel (status changes are always delivered)
    pub fn subscribe_channel(&self, channel: impl Into<String>) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            channel: Some(channel.into()),
        }
    }

    /// Publish to all subscribers; returns how many received it
    pub async fn publish(&self, notification: Notification) -> usize {
        if *self.status.read().await == ConnectionStatus::Disconnected {
            debug!("Feed disconnected, dropping {:?}", notification);
            return 0;
        }

        match self.tx.send(notification) {
            Ok(count) => count,
            Err(_) => {
                debug!("No subscribers for notification");
                0
            }
        }
    }

    pub async fn connection_status(&self) -> ConnectionStatus {
        *self.status.read().await
    }

    pub async fn set_status(&self, status: ConnectionStatus) {
        let mut current = self.status.write().await;
        if *current == status {
            return;
        }
        *current = status;
        info!("Notification feed is now {:?}", status);
        let _ = self.tx.send(Notification::StatusChanged { status });
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(1000)
    }
}
