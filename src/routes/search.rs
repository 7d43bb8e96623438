use crate::db::Db;
use crate::events::{EventBus, MailboxEvent};
use crate::models::*;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, get};

use super::{ApiError, AuthUser, err, internal};

/// Full-text search over the viewer's own messages (title + body).
/// FTS5 with porter stemming first; falls back to a LIKE substring scan
/// when the query doesn't survive FTS syntax.
#[get("/mailboxes/me/messages/search?<q>&<from>&<to>&<limit>")]
pub fn search_messages(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    q: &str,
    from: Option<&str>,
    to: Option<&str>,
    limit: Option<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let query = q.trim();
    if query.is_empty() {
        return Err(err(
            Status::BadRequest,
            "Query parameter 'q' must not be empty",
        ));
    }
    if query.len() > 500 {
        return Err(err(Status::BadRequest, "Query too long (max 500 characters)"));
    }

    let viewer = &auth.0.user;
    let conn = db.conn();
    let limit = limit.unwrap_or(50).clamp(1, 200);

    let fts_result: Result<Vec<Message>, rusqlite::Error> = (|| {
        // Strip FTS5 special characters and quote each term; stemming still
        // applies inside the quotes.
        let fts_query: String = query
            .split_whitespace()
            .map(|word| {
                let clean: String = word
                    .chars()
                    .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || *c == '\'')
                    .collect();
                let escaped = clean.replace('"', "\"\"");
                format!("\"{escaped}\"")
            })
            .filter(|s| s != "\"\"")
            .collect::<Vec<_>>()
            .join(" ");

        let mut sql = format!(
            "SELECT {MESSAGE_COLS_M} FROM messages_fts f \
             JOIN messages m ON m.id = f.message_id \
             WHERE messages_fts MATCH ?1 AND m.recipient = ?2",
            MESSAGE_COLS_M = prefixed_cols()
        );
        let mut param_values: Vec<String> = vec![fts_query, viewer.clone()];
        let mut idx = 3;

        if let Some(from) = from {
            sql.push_str(&format!(" AND m.created_at >= ?{idx}"));
            param_values.push(from.to_string());
            idx += 1;
        }
        if let Some(to) = to {
            sql.push_str(&format!(" AND m.created_at <= ?{idx}"));
            param_values.push(to.to_string());
            idx += 1;
        }
        sql.push_str(&format!(" ORDER BY m.id DESC LIMIT ?{idx}"));
        param_values.push(limit.to_string());

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::types::ToSql> = param_values
            .iter()
            .map(|v| v as &dyn rusqlite::types::ToSql)
            .collect();
        let messages: Vec<Message> = stmt
            .query_map(params_refs.as_slice(), |row| Message::from_row(row))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(messages)
    })();

    let messages = match fts_result {
        Ok(m) => m,
        Err(_) => {
            let escaped = query
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            let like_pattern = format!("%{escaped}%");

            let mut sql = format!(
                "SELECT {} FROM messages m \
                 WHERE m.recipient = ?1 \
                 AND (m.title LIKE ?2 ESCAPE '\\' OR m.body LIKE ?2 ESCAPE '\\')",
                prefixed_cols()
            );
            let mut param_values: Vec<String> = vec![viewer.clone(), like_pattern];
            let mut idx = 3;

            if let Some(from) = from {
                sql.push_str(&format!(" AND m.created_at >= ?{idx}"));
                param_values.push(from.to_string());
                idx += 1;
            }
            if let Some(to) = to {
                sql.push_str(&format!(" AND m.created_at <= ?{idx}"));
                param_values.push(to.to_string());
                idx += 1;
            }
            sql.push_str(&format!(" ORDER BY m.id DESC LIMIT ?{idx}"));
            param_values.push(limit.to_string());

            let mut stmt = conn.prepare(&sql).map_err(internal)?;
            let params_refs: Vec<&dyn rusqlite::types::ToSql> = param_values
                .iter()
                .map(|v| v as &dyn rusqlite::types::ToSql)
                .collect();
            stmt.query_map(params_refs.as_slice(), |row| Message::from_row(row))
                .map_err(internal)?
                .filter_map(|r| r.ok())
                .collect()
        }
    };

    events.publish_mailbox(
        viewer,
        MailboxEvent::InboxCheck {
            mailbox: viewer.clone(),
            action: "search".to_string(),
        },
    );

    Ok(Json(serde_json::json!({ "messages": messages })))
}

fn prefixed_cols() -> String {
    MESSAGE_COLS
        .split(',')
        .map(|c| format!("m.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
