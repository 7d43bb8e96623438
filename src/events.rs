use crate::models::{BroadcastEvent, PresenceInfo};
use serde::Serialize;
use tokio::sync::broadcast;

/// Per-mailbox payloads. The `type` tag matches the SSE event name.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MailboxEvent {
    Message {
        #[serde(with = "crate::models::id_string")]
        id: i64,
        sender: String,
        title: String,
        urgent: bool,
    },
    InboxCheck {
        mailbox: String,
        action: String,
    },
    MessageWaiting {
        #[serde(rename = "messageId", with = "crate::models::id_string")]
        message_id: i64,
        responder: String,
    },
    WaitingCleared {
        #[serde(rename = "messageId", with = "crate::models::id_string")]
        message_id: i64,
        responder: String,
    },
}

impl MailboxEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MailboxEvent::Message { .. } => "message",
            MailboxEvent::InboxCheck { .. } => "inbox_check",
            MailboxEvent::MessageWaiting { .. } => "message_waiting",
            MailboxEvent::WaitingCleared { .. } => "waiting_cleared",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PresenceChange {
    Join {
        user: String,
        presence: Vec<PresenceInfo>,
    },
    Leave {
        user: String,
        presence: Vec<PresenceInfo>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SwarmEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(rename = "taskId", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(rename = "projectId", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub actor: String,
}

#[derive(Debug, Clone)]
pub enum HiveEvent {
    /// Directed at one user's mailbox topic.
    Mailbox { mailbox: String, event: MailboxEvent },
    Presence(PresenceChange),
    /// Subscribers must honor the event's `for_users` filter.
    Buzz(BroadcastEvent),
    Swarm(SwarmEvent),
}

/// In-process fan-out. One broadcast channel; subscribers filter by variant.
/// Delivery is best-effort: lagged receivers drop oldest events, and durable
/// state lives in the database.
pub struct EventBus {
    pub sender: broadcast::Sender<HiveEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        EventBus { sender }
    }

    pub fn publish(&self, event: HiveEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    pub fn publish_mailbox(&self, mailbox: &str, event: MailboxEvent) {
        self.publish(HiveEvent::Mailbox {
            mailbox: mailbox.to_string(),
            event,
        });
    }
}
