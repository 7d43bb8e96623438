use crate::config::Config;
use crate::db::Db;
use crate::events::{EventBus, MailboxEvent};
use crate::models::*;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post};
use rusqlite::params;
use std::collections::HashMap;

use super::{ApiError, AuthUser, err, internal};

/// The recipient promises to respond. Only they may make that promise, and
/// only the same user may withdraw it.
#[post("/mailboxes/me/messages/<id>/waiting")]
pub fn mark_waiting(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    id: i64,
) -> Result<Json<serde_json::Value>, ApiError> {
    let viewer = &auth.0.user;
    let conn = db.conn();
    let now = chrono::Utc::now().to_rfc3339();

    let changed = conn
        .execute(
            "UPDATE messages SET response_waiting = 1, waiting_responder = ?1, waiting_since = ?2 \
             WHERE id = ?3 AND recipient = ?1",
            params![viewer, &now, id],
        )
        .map_err(internal)?;
    if changed == 0 {
        return Err(err(Status::NotFound, "Message not found"));
    }

    let message = conn
        .query_row(
            &format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1"),
            params![id],
            |row| Message::from_row(row),
        )
        .map_err(internal)?;

    // Tell the original sender a commitment now exists.
    events.publish_mailbox(
        &message.sender,
        MailboxEvent::MessageWaiting {
            message_id: id,
            responder: viewer.clone(),
        },
    );

    Ok(Json(serde_json::json!({ "message": message })))
}

#[delete("/mailboxes/me/messages/<id>/waiting")]
pub fn clear_waiting(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    id: i64,
) -> Result<Json<serde_json::Value>, ApiError> {
    let viewer = &auth.0.user;
    let conn = db.conn();

    let message = conn
        .query_row(
            &format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1"),
            params![id],
            |row| Message::from_row(row),
        )
        .map_err(|_| err(Status::NotFound, "Message not found"))?;

    if !message.response_waiting {
        return Err(err(Status::BadRequest, "Message has no waiting flag"));
    }
    if message.waiting_responder.as_deref() != Some(viewer.as_str()) {
        return Err(err(
            Status::Forbidden,
            "Only the waiting responder may clear the flag",
        ));
    }

    conn.execute(
        "UPDATE messages SET response_waiting = 0, waiting_responder = NULL, waiting_since = NULL \
         WHERE id = ?1",
        params![id],
    )
    .map_err(internal)?;

    let message = conn
        .query_row(
            &format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1"),
            params![id],
            |row| Message::from_row(row),
        )
        .map_err(internal)?;

    events.publish_mailbox(
        &message.sender,
        MailboxEvent::WaitingCleared {
            message_id: id,
            responder: viewer.clone(),
        },
    );

    Ok(Json(serde_json::json!({ "message": message })))
}

/// Messages this viewer has promised to respond to.
#[get("/mailboxes/me/waiting")]
pub fn list_waiting(auth: AuthUser, db: &State<Db>) -> Result<Json<WaitingResponse>, ApiError> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {MESSAGE_COLS} FROM messages \
             WHERE response_waiting = 1 AND waiting_responder = ?1 ORDER BY id DESC"
        ))
        .map_err(internal)?;
    let messages: Vec<Message> = stmt
        .query_map(params![&auth.0.user], |row| Message::from_row(row))
        .map_err(internal)?
        .filter_map(|r| r.ok())
        .collect();
    let count = messages.len();
    Ok(Json(WaitingResponse { messages, count }))
}

/// Messages this viewer sent on which someone else has promised a response.
#[get("/mailboxes/me/waiting-on-others")]
pub fn list_waiting_on_others(
    auth: AuthUser,
    db: &State<Db>,
) -> Result<Json<WaitingResponse>, ApiError> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {MESSAGE_COLS} FROM messages \
             WHERE response_waiting = 1 AND sender = ?1 ORDER BY id DESC"
        ))
        .map_err(internal)?;
    let messages: Vec<Message> = stmt
        .query_map(params![&auth.0.user], |row| Message::from_row(row))
        .map_err(internal)?
        .filter_map(|r| r.ok())
        .collect();
    let count = messages.len();
    Ok(Json(WaitingResponse { messages, count }))
}

#[get("/waiting/counts")]
pub fn waiting_counts(
    _auth: AuthUser,
    db: &State<Db>,
    config: &State<Config>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let mut counts: HashMap<String, i64> =
        config.roster.iter().map(|u| (u.clone(), 0)).collect();
    let mut stmt = conn
        .prepare(
            "SELECT waiting_responder, COUNT(*) FROM messages \
             WHERE response_waiting = 1 AND waiting_responder IS NOT NULL \
             GROUP BY waiting_responder",
        )
        .map_err(internal)?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))
        .map_err(internal)?;
    for row in rows.filter_map(|r| r.ok()) {
        counts.insert(row.0, row.1);
    }
    Ok(Json(serde_json::json!({ "counts": counts })))
}
