use serde::{Deserialize, Serialize};

/// 64-bit message ids cross the wire as decimal strings so JS clients
/// don't lose precision. Internally they stay `i64`.
pub mod id_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &i64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&v.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

pub mod id_string_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<i64>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(v) => s.serialize_some(&v.to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let o: Option<String> = Option::deserialize(d)?;
        match o {
            None => Ok(None),
            Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
        }
    }
}

// --- Mailbox ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Unread,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Unread => "unread",
            MessageStatus::Read => "read",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unread" => Some(MessageStatus::Unread),
            "read" => Some(MessageStatus::Read),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(with = "id_string")]
    pub id: i64,
    pub recipient: String,
    pub sender: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub status: MessageStatus,
    pub urgent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, with = "id_string_opt", skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedupe_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub response_waiting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting_responder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting_since: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewed_at: Option<String>,
}

/// Column list matching `Message::from_row`. Keep the two in sync.
pub const MESSAGE_COLS: &str = "id, recipient, sender, title, body, status, urgent, \
     thread_id, reply_to_message_id, dedupe_key, metadata, response_waiting, \
     waiting_responder, waiting_since, created_at, viewed_at";

impl Message {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Message> {
        let status: String = row.get(5)?;
        let metadata: Option<String> = row.get(10)?;
        Ok(Message {
            id: row.get(0)?,
            recipient: row.get(1)?,
            sender: row.get(2)?,
            title: row.get(3)?,
            body: row.get(4)?,
            status: MessageStatus::parse(&status).unwrap_or(MessageStatus::Unread),
            urgent: row.get::<_, i64>(6)? != 0,
            thread_id: row.get(7)?,
            reply_to_message_id: row.get(8)?,
            dedupe_key: row.get(9)?,
            metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
            response_waiting: row.get::<_, i64>(11)? != 0,
            waiting_responder: row.get(12)?,
            waiting_since: row.get(13)?,
            created_at: row.get(14)?,
            viewed_at: row.get(15)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub urgent: Option<bool>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default, with = "id_string_opt")]
    pub reply_to_message_id: Option<i64>,
    #[serde(default)]
    pub dedupe_key: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub urgent: Option<bool>,
    #[serde(default)]
    pub dedupe_key: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct BatchAckBody {
    #[serde(default)]
    pub ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAckResponse {
    pub success: Vec<String>,
    pub not_found: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WaitingResponse {
    pub messages: Vec<Message>,
    pub count: usize,
}

// --- Presence ---

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PresenceInfo {
    pub user: String,
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    pub unread: i64,
    pub waiting: i64,
}

// --- Broadcast ---

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: String,
    pub app_name: String,
    pub title: String,
    pub owner: String,
    pub token: String,
    #[serde(rename = "for", skip_serializing_if = "Option::is_none")]
    pub for_users: Option<String>,
    pub enabled: bool,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest_url: Option<String>,
}

pub const WEBHOOK_COLS: &str =
    "id, app_name, title, owner, token, for_users, enabled, created_at";

impl Webhook {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Webhook> {
        Ok(Webhook {
            id: row.get(0)?,
            app_name: row.get(1)?,
            title: row.get(2)?,
            owner: row.get(3)?,
            token: row.get(4)?,
            for_users: row.get(5)?,
            enabled: row.get::<_, i64>(6)? != 0,
            created_at: row.get(7)?,
            ingest_url: None,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWebhookBody {
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "for")]
    pub for_users: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastEvent {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_id: Option<String>,
    pub app_name: String,
    pub title: String,
    #[serde(rename = "for", skip_serializing_if = "Option::is_none")]
    pub for_users: Option<String>,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_json: Option<serde_json::Value>,
    pub received_at: String,
}

pub const BROADCAST_EVENT_COLS: &str =
    "id, webhook_id, app_name, title, for_users, content_type, body_text, body_json, received_at";

impl BroadcastEvent {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<BroadcastEvent> {
        let body_json: Option<String> = row.get(7)?;
        Ok(BroadcastEvent {
            id: row.get(0)?,
            webhook_id: row.get(1)?,
            app_name: row.get(2)?,
            title: row.get(3)?,
            for_users: row.get(4)?,
            content_type: row.get(5)?,
            body_text: row.get(6)?,
            body_json: body_json.and_then(|b| serde_json::from_str(&b).ok()),
            received_at: row.get(8)?,
        })
    }

    /// A viewer may see an event when its `for_users` filter is empty or
    /// names them (comma-separated, trimmed, case-insensitive).
    pub fn visible_to(&self, user: &str, admin: bool) -> bool {
        if admin {
            return true;
        }
        match self.for_users.as_deref() {
            None | Some("") => true,
            Some(filter) => filter
                .split(',')
                .map(|s| s.trim())
                .any(|s| s.eq_ignore_ascii_case(user)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<BroadcastEvent>,
    pub count: usize,
}

// --- Swarm projects ---

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: String,
    pub project_lead_user_id: String,
    pub developer_lead_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onedev_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dokploy_deploy_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub const PROJECT_COLS: &str = "id, title, description, color, project_lead_user_id, \
     developer_lead_user_id, onedev_url, dokploy_deploy_url, archived_at, created_at, updated_at";

impl Project {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Project> {
        Ok(Project {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            color: row.get(3)?,
            project_lead_user_id: row.get(4)?,
            developer_lead_user_id: row.get(5)?,
            onedev_url: row.get(6)?,
            dokploy_deploy_url: row.get(7)?,
            archived_at: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub project_lead_user_id: Option<String>,
    #[serde(default)]
    pub developer_lead_user_id: Option<String>,
    #[serde(default)]
    pub onedev_url: Option<String>,
    #[serde(default)]
    pub dokploy_deploy_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub project_lead_user_id: Option<String>,
    #[serde(default)]
    pub developer_lead_user_id: Option<String>,
    #[serde(default)]
    pub onedev_url: Option<String>,
    #[serde(default)]
    pub dokploy_deploy_url: Option<String>,
}

// --- Swarm tasks ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Ready,
    InProgress,
    Holding,
    Review,
    Complete,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Ready => "ready",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Holding => "holding",
            TaskStatus::Review => "review",
            TaskStatus::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(TaskStatus::Queued),
            "ready" => Some(TaskStatus::Ready),
            "in_progress" => Some(TaskStatus::InProgress),
            "holding" => Some(TaskStatus::Holding),
            "review" => Some(TaskStatus::Review),
            "complete" => Some(TaskStatus::Complete),
            _ => None,
        }
    }

    /// Rank used by the planned listing sort.
    pub fn rank(&self) -> i64 {
        match self {
            TaskStatus::InProgress => 1,
            TaskStatus::Review => 2,
            TaskStatus::Ready => 3,
            TaskStatus::Queued => 4,
            TaskStatus::Holding => 5,
            TaskStatus::Complete => 6,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub creator_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_user_id: Option<String>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_or_after_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_be_done_after_task_id: Option<String>,
    pub sort_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_task_assignee_user_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_instance_at: Option<String>,
    /// Derived on read, never stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
}

pub const TASK_COLS: &str = "id, project_id, title, detail, creator_user_id, assignee_user_id, \
     status, on_or_after_at, must_be_done_after_task_id, sort_key, next_task_id, \
     next_task_assignee_user_id, created_at, updated_at, completed_at, \
     recurring_template_id, recurring_instance_at";

impl Task {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        let status: String = row.get(6)?;
        Ok(Task {
            id: row.get(0)?,
            project_id: row.get(1)?,
            title: row.get(2)?,
            detail: row.get(3)?,
            creator_user_id: row.get(4)?,
            assignee_user_id: row.get(5)?,
            status: TaskStatus::parse(&status).unwrap_or(TaskStatus::Queued),
            on_or_after_at: row.get(7)?,
            must_be_done_after_task_id: row.get(8)?,
            sort_key: row.get(9)?,
            next_task_id: row.get(10)?,
            next_task_assignee_user_id: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
            completed_at: row.get(14)?,
            recurring_template_id: row.get(15)?,
            recurring_instance_at: row.get(16)?,
            blocked_reason: None,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub assignee_user_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub on_or_after_at: Option<String>,
    #[serde(default)]
    pub must_be_done_after_task_id: Option<String>,
    #[serde(default)]
    pub next_task_id: Option<String>,
    #[serde(default)]
    pub next_task_assignee_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub assignee_user_id: Option<String>,
    #[serde(default)]
    pub on_or_after_at: Option<String>,
    #[serde(default)]
    pub must_be_done_after_task_id: Option<String>,
    #[serde(default)]
    pub next_task_id: Option<String>,
    #[serde(default)]
    pub next_task_assignee_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderBody {
    #[serde(default)]
    pub before_task_id: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TaskEvent {
    pub id: i64,
    pub task_id: String,
    pub actor_user_id: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_state: Option<serde_json::Value>,
    pub after_state: serde_json::Value,
    pub created_at: String,
}

pub const TASK_EVENT_COLS: &str =
    "id, task_id, actor_user_id, kind, before_state, after_state, created_at";

impl TaskEvent {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<TaskEvent> {
        let before: Option<String> = row.get(4)?;
        let after: String = row.get(5)?;
        Ok(TaskEvent {
            id: row.get(0)?,
            task_id: row.get(1)?,
            actor_user_id: row.get(2)?,
            kind: row.get(3)?,
            before_state: before.and_then(|b| serde_json::from_str(&b).ok()),
            after_state: serde_json::from_str(&after).unwrap_or(serde_json::json!({})),
            created_at: row.get(6)?,
        })
    }
}

// --- Recurring templates ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EveryUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl EveryUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            EveryUnit::Minute => "minute",
            EveryUnit::Hour => "hour",
            EveryUnit::Day => "day",
            EveryUnit::Week => "week",
            EveryUnit::Month => "month",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "minute" => Some(EveryUnit::Minute),
            "hour" => Some(EveryUnit::Hour),
            "day" => Some(EveryUnit::Day),
            "week" => Some(EveryUnit::Week),
            "month" => Some(EveryUnit::Month),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekParity {
    Any,
    Odd,
    Even,
}

impl WeekParity {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeekParity::Any => "any",
            WeekParity::Odd => "odd",
            WeekParity::Even => "even",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "any" => Some(WeekParity::Any),
            "odd" => Some(WeekParity::Odd),
            "even" => Some(WeekParity::Even),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RecurringTemplate {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub owner_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_agent: Option<String>,
    pub enabled: bool,
    pub start_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<String>,
    pub every_interval: i64,
    pub every_unit: EveryUnit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<String>>,
    pub week_parity: WeekParity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub between_hours_start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub between_hours_end: Option<i64>,
    pub timezone: String,
    pub mute: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mute_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub const TEMPLATE_COLS: &str = "id, title, detail, project_id, owner_user_id, primary_agent, \
     fallback_agent, enabled, start_at, end_at, every_interval, every_unit, days_of_week, \
     week_parity, between_hours_start, between_hours_end, timezone, mute, mute_interval, \
     repeat_count, last_run_at, created_at, updated_at";

impl RecurringTemplate {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<RecurringTemplate> {
        let unit: String = row.get(11)?;
        let days: Option<String> = row.get(12)?;
        let parity: String = row.get(13)?;
        Ok(RecurringTemplate {
            id: row.get(0)?,
            title: row.get(1)?,
            detail: row.get(2)?,
            project_id: row.get(3)?,
            owner_user_id: row.get(4)?,
            primary_agent: row.get(5)?,
            fallback_agent: row.get(6)?,
            enabled: row.get::<_, i64>(7)? != 0,
            start_at: row.get(8)?,
            end_at: row.get(9)?,
            every_interval: row.get(10)?,
            every_unit: EveryUnit::parse(&unit).unwrap_or(EveryUnit::Day),
            days_of_week: days.map(|d| {
                d.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
            week_parity: WeekParity::parse(&parity).unwrap_or(WeekParity::Any),
            between_hours_start: row.get(14)?,
            between_hours_end: row.get(15)?,
            timezone: row.get(16)?,
            mute: row.get::<_, i64>(17)? != 0,
            mute_interval: row.get(18)?,
            repeat_count: row.get(19)?,
            last_run_at: row.get(20)?,
            created_at: row.get(21)?,
            updated_at: row.get(22)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub primary_agent: Option<String>,
    #[serde(default)]
    pub fallback_agent: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub start_at: Option<String>,
    #[serde(default)]
    pub end_at: Option<String>,
    #[serde(default)]
    pub every_interval: Option<i64>,
    #[serde(default)]
    pub every_unit: Option<String>,
    #[serde(default)]
    pub days_of_week: Option<Vec<String>>,
    #[serde(default)]
    pub week_parity: Option<String>,
    #[serde(default)]
    pub between_hours_start: Option<i64>,
    #[serde(default)]
    pub between_hours_end: Option<i64>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub mute: Option<bool>,
    #[serde(default)]
    pub mute_interval: Option<String>,
    #[serde(default)]
    pub repeat_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub primary_agent: Option<String>,
    #[serde(default)]
    pub fallback_agent: Option<String>,
    #[serde(default)]
    pub start_at: Option<String>,
    #[serde(default)]
    pub end_at: Option<String>,
    #[serde(default)]
    pub every_interval: Option<i64>,
    #[serde(default)]
    pub every_unit: Option<String>,
    #[serde(default)]
    pub days_of_week: Option<Vec<String>>,
    #[serde(default)]
    pub week_parity: Option<String>,
    #[serde(default)]
    pub between_hours_start: Option<i64>,
    #[serde(default)]
    pub between_hours_end: Option<i64>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub mute: Option<bool>,
    #[serde(default)]
    pub mute_interval: Option<String>,
    #[serde(default)]
    pub repeat_count: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct GeneratorResult {
    pub generated: i64,
    pub errors: Vec<String>,
}
