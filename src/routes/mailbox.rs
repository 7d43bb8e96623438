use crate::config::Config;
use crate::db::{self, Db};
use crate::events::{EventBus, MailboxEvent};
use crate::models::*;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rusqlite::{Connection, params};

use super::{ApiError, AuthUser, err, internal};

pub(super) struct NewMessage<'a> {
    pub recipient: &'a str,
    pub sender: &'a str,
    pub title: String,
    pub body: Option<String>,
    pub urgent: bool,
    pub thread_id: Option<String>,
    pub reply_to_message_id: Option<i64>,
    pub dedupe_key: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Insert a message and publish it to the recipient's mailbox topic.
/// A dedupe-keyed send that hits an existing `(recipient, sender, key)`
/// row returns that row unchanged and publishes nothing.
pub(super) fn deliver(
    conn: &Connection,
    events: &EventBus,
    msg: NewMessage,
) -> Result<Message, ApiError> {
    let now = chrono::Utc::now().to_rfc3339();
    let metadata = msg
        .metadata
        .as_ref()
        .map(|m| serde_json::to_string(m).unwrap_or_default());

    let inserted = conn
        .execute(
            "INSERT INTO messages (recipient, sender, title, body, status, urgent, thread_id, \
             reply_to_message_id, dedupe_key, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, 'unread', ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT DO NOTHING",
            params![
                msg.recipient,
                msg.sender,
                &msg.title,
                &msg.body,
                msg.urgent as i64,
                &msg.thread_id,
                &msg.reply_to_message_id,
                &msg.dedupe_key,
                &metadata,
                &now
            ],
        )
        .map_err(internal)?;

    if inserted == 0 {
        // Idempotent send: hand back the row the dedupe key points at.
        let existing = conn
            .query_row(
                &format!(
                    "SELECT {MESSAGE_COLS} FROM messages \
                     WHERE recipient = ?1 AND sender = ?2 AND dedupe_key = ?3"
                ),
                params![msg.recipient, msg.sender, &msg.dedupe_key],
                |row| Message::from_row(row),
            )
            .map_err(internal)?;
        return Ok(existing);
    }

    let id = conn.last_insert_rowid();
    db::index_message_fts(conn, id);

    let message = conn
        .query_row(
            &format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1"),
            params![id],
            |row| Message::from_row(row),
        )
        .map_err(internal)?;

    events.publish_mailbox(
        msg.recipient,
        MailboxEvent::Message {
            id,
            sender: msg.sender.to_string(),
            title: message.title.clone(),
            urgent: message.urgent,
        },
    );

    Ok(message)
}

#[post("/mailboxes/<recipient>/messages", format = "json", data = "<body>")]
pub fn send_message(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    config: &State<Config>,
    recipient: &str,
    body: Json<SendMessageBody>,
) -> Result<(Status, Json<serde_json::Value>), ApiError> {
    let recipient = recipient.trim().to_lowercase();
    if recipient == "me" {
        return Err(err(
            Status::BadRequest,
            "'me' is your own mailbox; messages are sent to a named user",
        ));
    }
    if !config.is_roster_user(&recipient) {
        return Err(err(Status::BadRequest, "Recipient is not a roster user"));
    }
    let title = body.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        return Err(err(Status::BadRequest, "Title must not be empty"));
    }

    let conn = db.conn();
    let message = deliver(
        &conn,
        events,
        NewMessage {
            recipient: &recipient,
            sender: &auth.0.user,
            title,
            body: body.body.clone(),
            urgent: body.urgent.unwrap_or(false),
            thread_id: body.thread_id.clone(),
            reply_to_message_id: body.reply_to_message_id,
            dedupe_key: body.dedupe_key.clone(),
            metadata: body.metadata.clone(),
        },
    )?;

    Ok((Status::Created, Json(serde_json::json!({ "message": message }))))
}

#[get("/mailboxes/me/messages?<status>&<limit>&<cursor>&<sinceId>")]
#[allow(non_snake_case)]
pub fn list_messages(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    status: Option<&str>,
    limit: Option<i64>,
    cursor: Option<&str>,
    sinceId: Option<&str>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let viewer = &auth.0.user;
    let limit = limit.unwrap_or(50).clamp(1, 200);

    let status = match status {
        Some(s) => Some(
            MessageStatus::parse(s)
                .ok_or_else(|| err(Status::BadRequest, "status must be 'unread' or 'read'"))?,
        ),
        None => None,
    };
    let cursor: Option<i64> = match cursor {
        Some(c) => Some(
            c.parse()
                .map_err(|_| err(Status::BadRequest, "Invalid cursor"))?,
        ),
        None => None,
    };
    let since_id: Option<i64> = match sinceId {
        Some(s) => Some(
            s.parse()
                .map_err(|_| err(Status::BadRequest, "Invalid sinceId"))?,
        ),
        None => None,
    };

    let conn = db.conn();
    let mut sql = format!("SELECT {MESSAGE_COLS} FROM messages WHERE recipient = ?1");
    let mut param_values: Vec<String> = vec![viewer.clone()];
    let mut idx = 2;

    if let Some(status) = status {
        sql.push_str(&format!(" AND status = ?{idx}"));
        param_values.push(status.as_str().to_string());
        idx += 1;
    }
    if let Some(cursor) = cursor {
        sql.push_str(&format!(" AND id < ?{idx}"));
        param_values.push(cursor.to_string());
        idx += 1;
    }
    if let Some(since) = since_id {
        sql.push_str(&format!(" AND id > ?{idx}"));
        param_values.push(since.to_string());
        idx += 1;
    }
    sql.push_str(&format!(" ORDER BY id DESC LIMIT ?{idx}"));
    param_values.push(limit.to_string());

    let mut stmt = conn.prepare(&sql).map_err(internal)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> = param_values
        .iter()
        .map(|v| v as &dyn rusqlite::types::ToSql)
        .collect();
    let messages: Vec<Message> = stmt
        .query_map(params_refs.as_slice(), |row| Message::from_row(row))
        .map_err(internal)?
        .filter_map(|r| r.ok())
        .collect();

    let next_cursor = if messages.len() as i64 == limit {
        messages.last().map(|m| m.id.to_string())
    } else {
        None
    };

    events.publish_mailbox(
        viewer,
        MailboxEvent::InboxCheck {
            mailbox: viewer.clone(),
            action: "list".to_string(),
        },
    );

    Ok(Json(MessagesResponse {
        messages,
        next_cursor,
    }))
}

#[get("/mailboxes/me/messages/<id>")]
pub fn get_message(
    auth: AuthUser,
    db: &State<Db>,
    id: i64,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let message = conn
        .query_row(
            &format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1 AND recipient = ?2"),
            params![id, &auth.0.user],
            |row| Message::from_row(row),
        )
        .map_err(|_| err(Status::NotFound, "Message not found"))?;
    Ok(Json(serde_json::json!({ "message": message })))
}

#[post("/mailboxes/me/messages/<id>/ack")]
pub fn ack_message(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    id: i64,
) -> Result<Json<serde_json::Value>, ApiError> {
    let viewer = &auth.0.user;
    let conn = db.conn();
    let now = chrono::Utc::now().to_rfc3339();

    // First ack flips unread -> read; re-acks fall through to the select.
    conn.execute(
        "UPDATE messages SET status = 'read', viewed_at = ?1 \
         WHERE id = ?2 AND recipient = ?3 AND status = 'unread'",
        params![&now, id, viewer],
    )
    .map_err(internal)?;

    let message = conn
        .query_row(
            &format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1 AND recipient = ?2"),
            params![id, viewer],
            |row| Message::from_row(row),
        )
        .map_err(|_| err(Status::NotFound, "Message not found"))?;

    events.publish_mailbox(
        viewer,
        MailboxEvent::InboxCheck {
            mailbox: viewer.clone(),
            action: "ack".to_string(),
        },
    );

    Ok(Json(serde_json::json!({ "message": message })))
}

#[post("/mailboxes/me/messages/ack", format = "json", data = "<body>")]
pub fn batch_ack(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    body: Json<BatchAckBody>,
) -> Result<Json<BatchAckResponse>, ApiError> {
    let viewer = &auth.0.user;
    let ids = body
        .ids
        .as_ref()
        .ok_or_else(|| err(Status::BadRequest, "Field 'ids' is required"))?;

    let conn = db.conn();
    let now = chrono::Utc::now().to_rfc3339();
    let mut success = Vec::new();
    let mut not_found = Vec::new();

    for raw in ids {
        let Ok(id) = raw.parse::<i64>() else {
            not_found.push(raw.clone());
            continue;
        };
        let changed = conn
            .execute(
                "UPDATE messages SET status = 'read', viewed_at = ?1 \
                 WHERE id = ?2 AND recipient = ?3 AND status = 'unread'",
                params![&now, id, viewer],
            )
            .map_err(internal)?;
        if changed == 1 {
            success.push(raw.clone());
        } else {
            not_found.push(raw.clone());
        }
    }

    events.publish_mailbox(
        viewer,
        MailboxEvent::InboxCheck {
            mailbox: viewer.clone(),
            action: "ack".to_string(),
        },
    );

    Ok(Json(BatchAckResponse { success, not_found }))
}

#[post("/mailboxes/me/messages/<id>/reply", format = "json", data = "<body>")]
pub fn reply_message(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    id: i64,
    body: Json<ReplyBody>,
) -> Result<(Status, Json<serde_json::Value>), ApiError> {
    let viewer = &auth.0.user;
    if body.title.is_none() && body.body.is_none() {
        return Err(err(Status::BadRequest, "Either title or body is required"));
    }

    let conn = db.conn();
    let original = conn
        .query_row(
            &format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1 AND recipient = ?2"),
            params![id, viewer],
            |row| Message::from_row(row),
        )
        .map_err(|_| err(Status::NotFound, "Message not found"))?;

    let title = match body.title.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => format!("Re: {}", original.title),
    };
    let thread_id = original
        .thread_id
        .clone()
        .unwrap_or_else(|| original.id.to_string());

    let message = deliver(
        &conn,
        events,
        NewMessage {
            recipient: &original.sender,
            sender: viewer,
            title,
            body: body.body.clone(),
            urgent: body.urgent.unwrap_or(false),
            thread_id: Some(thread_id),
            reply_to_message_id: Some(original.id),
            dedupe_key: body.dedupe_key.clone(),
            metadata: body.metadata.clone(),
        },
    )?;

    Ok((Status::Created, Json(serde_json::json!({ "message": message }))))
}
