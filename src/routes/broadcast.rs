use crate::config::Config;
use crate::db::{self, Db};
use crate::events::{EventBus, HiveEvent};
use crate::models::*;
use rocket::data::ToByteUnit;
use rocket::http::{ContentType, Status};
use rocket::serde::json::Json;
use rocket::{Data, State, delete, get, post};
use rusqlite::params;

use super::{ApiError, AuthUser, err, internal};

/// Ingest bodies beyond this size are rejected with 413.
const MAX_INGEST_BYTES: usize = 256 * 1024;

/// App name reserved for the Swarm activity bridge.
const SWARM_APP: &str = "swarm";

fn valid_app_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

fn with_ingest_url(mut hook: Webhook, config: &Config) -> Webhook {
    hook.ingest_url = Some(format!(
        "{}/api/ingest/{}/{}",
        config.base_url, hook.app_name, hook.token
    ));
    hook
}

#[post("/broadcast/webhooks", format = "json", data = "<body>")]
pub fn create_webhook(
    auth: AuthUser,
    db: &State<Db>,
    config: &State<Config>,
    body: Json<CreateWebhookBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let app_name = body.app_name.as_deref().unwrap_or("").trim().to_string();
    if !valid_app_name(&app_name) {
        return Err(err(
            Status::BadRequest,
            "appName must match ^[a-z][a-z0-9_-]*$",
        ));
    }
    if app_name == SWARM_APP {
        return Err(err(Status::BadRequest, "appName 'swarm' is reserved"));
    }
    let title = body.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        return Err(err(Status::BadRequest, "Title must not be empty"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let token = db::generate_ingest_token();
    let now = chrono::Utc::now().to_rfc3339();
    let conn = db.conn();
    conn.execute(
        "INSERT INTO webhooks (id, app_name, title, owner, token, for_users, enabled, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
        params![&id, &app_name, &title, &auth.0.user, &token, &body.for_users, &now],
    )
    .map_err(internal)?;

    let hook = with_ingest_url(
        Webhook {
            id,
            app_name,
            title,
            owner: auth.0.user.clone(),
            token,
            for_users: body.for_users.clone(),
            enabled: true,
            created_at: now,
            ingest_url: None,
        },
        config,
    );
    Ok(Json(serde_json::json!({ "webhook": hook })))
}

#[get("/broadcast/webhooks?<all>")]
pub fn list_webhooks(
    auth: AuthUser,
    db: &State<Db>,
    config: &State<Config>,
    all: Option<bool>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let everything = all.unwrap_or(false) && auth.0.admin;
    let (sql, args): (String, Vec<String>) = if everything {
        (
            format!("SELECT {WEBHOOK_COLS} FROM webhooks ORDER BY created_at DESC"),
            vec![],
        )
    } else {
        (
            format!("SELECT {WEBHOOK_COLS} FROM webhooks WHERE owner = ?1 ORDER BY created_at DESC"),
            vec![auth.0.user.clone()],
        )
    };
    let mut stmt = conn.prepare(&sql).map_err(internal)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> = args
        .iter()
        .map(|v| v as &dyn rusqlite::types::ToSql)
        .collect();
    let hooks: Vec<Webhook> = stmt
        .query_map(params_refs.as_slice(), |row| Webhook::from_row(row))
        .map_err(internal)?
        .filter_map(|r| r.ok())
        .map(|h| with_ingest_url(h, config))
        .collect();
    Ok(Json(serde_json::json!({ "webhooks": hooks })))
}

fn load_webhook(conn: &rusqlite::Connection, id: &str) -> Option<Webhook> {
    conn.query_row(
        &format!("SELECT {WEBHOOK_COLS} FROM webhooks WHERE id = ?1"),
        params![id],
        |row| Webhook::from_row(row),
    )
    .ok()
}

#[get("/broadcast/webhooks/<id>")]
pub fn get_webhook(
    auth: AuthUser,
    db: &State<Db>,
    config: &State<Config>,
    id: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let hook = load_webhook(&conn, id)
        // Not-owned reads 404 like absent ones, to avoid enumeration.
        .filter(|h| h.owner == auth.0.user || auth.0.admin)
        .ok_or_else(|| err(Status::NotFound, "Webhook not found"))?;
    Ok(Json(serde_json::json!({ "webhook": with_ingest_url(hook, config) })))
}

fn set_webhook_enabled(
    auth: &AuthUser,
    db: &Db,
    config: &Config,
    id: &str,
    enabled: bool,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let hook =
        load_webhook(&conn, id).ok_or_else(|| err(Status::NotFound, "Webhook not found"))?;
    if hook.owner != auth.0.user && !auth.0.admin {
        return Err(err(Status::Forbidden, "Only the owner may modify this webhook"));
    }
    conn.execute(
        "UPDATE webhooks SET enabled = ?1 WHERE id = ?2",
        params![enabled as i64, id],
    )
    .map_err(internal)?;
    let hook = load_webhook(&conn, id)
        .ok_or_else(|| err(Status::NotFound, "Webhook not found"))?;
    Ok(Json(serde_json::json!({ "webhook": with_ingest_url(hook, config) })))
}

#[post("/broadcast/webhooks/<id>/enable")]
pub fn enable_webhook(
    auth: AuthUser,
    db: &State<Db>,
    config: &State<Config>,
    id: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    set_webhook_enabled(&auth, db, config, id, true)
}

#[post("/broadcast/webhooks/<id>/disable")]
pub fn disable_webhook(
    auth: AuthUser,
    db: &State<Db>,
    config: &State<Config>,
    id: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    set_webhook_enabled(&auth, db, config, id, false)
}

#[delete("/broadcast/webhooks/<id>")]
pub fn delete_webhook(
    auth: AuthUser,
    db: &State<Db>,
    id: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let hook =
        load_webhook(&conn, id).ok_or_else(|| err(Status::NotFound, "Webhook not found"))?;
    if hook.owner != auth.0.user && !auth.0.admin {
        return Err(err(Status::Forbidden, "Only the owner may delete this webhook"));
    }
    conn.execute("DELETE FROM webhooks WHERE id = ?1", params![id])
        .map_err(internal)?;
    Ok(Json(serde_json::json!({ "deleted": true, "id": id })))
}

fn query_events(
    conn: &rusqlite::Connection,
    app: Option<&str>,
    since: Option<i64>,
) -> Result<Vec<BroadcastEvent>, ApiError> {
    let mut sql = format!("SELECT {BROADCAST_EVENT_COLS} FROM broadcast_events WHERE 1=1");
    let mut args: Vec<String> = vec![];
    let mut idx = 1;
    if let Some(app) = app {
        sql.push_str(&format!(" AND app_name = ?{idx}"));
        args.push(app.to_string());
        idx += 1;
    }
    if let Some(since) = since {
        sql.push_str(&format!(" AND id > ?{idx}"));
        args.push(since.to_string());
        idx += 1;
    }
    sql.push_str(&format!(" ORDER BY id DESC LIMIT ?{idx}"));
    args.push("500".to_string());

    let mut stmt = conn.prepare(&sql).map_err(internal)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> = args
        .iter()
        .map(|v| v as &dyn rusqlite::types::ToSql)
        .collect();
    Ok(stmt
        .query_map(params_refs.as_slice(), |row| BroadcastEvent::from_row(row))
        .map_err(internal)?
        .filter_map(|r| r.ok())
        .collect())
}

#[get("/broadcast/events?<app>&<limit>")]
pub fn list_events(
    auth: AuthUser,
    db: &State<Db>,
    app: Option<&str>,
    limit: Option<i64>,
) -> Result<Json<EventsResponse>, ApiError> {
    let limit = limit.unwrap_or(50).clamp(1, 200) as usize;
    let conn = db.conn();
    let events: Vec<BroadcastEvent> = query_events(&conn, app, None)?
        .into_iter()
        .filter(|e| e.visible_to(&auth.0.user, auth.0.admin))
        .take(limit)
        .collect();
    let count = events.len();
    Ok(Json(EventsResponse { events, count }))
}

/// Tail endpoint for agents: `since` is an exclusive id cursor, results
/// come back oldest-first so the last id is the next cursor.
#[get("/buzz?<app>&<limit>&<since>")]
pub fn buzz_tail(
    auth: AuthUser,
    db: &State<Db>,
    app: Option<&str>,
    limit: Option<i64>,
    since: Option<i64>,
) -> Result<Json<EventsResponse>, ApiError> {
    let limit = limit.unwrap_or(50).clamp(1, 200) as usize;
    let conn = db.conn();
    let mut events: Vec<BroadcastEvent> = query_events(&conn, app, since)?
        .into_iter()
        .filter(|e| e.visible_to(&auth.0.user, auth.0.admin))
        .collect();
    events.reverse();
    events.truncate(limit);
    let count = events.len();
    Ok(Json(EventsResponse { events, count }))
}

/// Public ingest endpoint: the token is the auth. Missing and disabled
/// webhooks are indistinguishable from the outside.
#[post("/ingest/<app_name>/<token>", data = "<data>")]
pub async fn ingest(
    db: &State<Db>,
    events: &State<EventBus>,
    app_name: &str,
    token: &str,
    content_type: Option<&ContentType>,
    data: Data<'_>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let capped = data
        .open(((MAX_INGEST_BYTES + 1) as u64).bytes())
        .into_bytes()
        .await
        .map_err(internal)?;
    let bytes = capped.value;
    if bytes.len() > MAX_INGEST_BYTES {
        return Err(err(Status::PayloadTooLarge, "Body exceeds 256 KiB"));
    }

    let conn = db.conn();
    let hook: Option<Webhook> = conn
        .query_row(
            &format!("SELECT {WEBHOOK_COLS} FROM webhooks WHERE app_name = ?1 AND token = ?2"),
            params![app_name, token],
            |row| Webhook::from_row(row),
        )
        .ok();
    let hook = match hook {
        Some(h) if h.enabled => h,
        _ => return Err(err(Status::NotFound, "Unknown webhook")),
    };

    let is_json = content_type.is_some_and(|c| c.is_json());
    let ct_string = content_type
        .map(|c| c.to_string())
        .unwrap_or_else(|| "text/plain".to_string());

    let (body_text, body_json): (Option<String>, Option<String>) = if is_json {
        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(v) => (None, Some(v.to_string())),
            // Claimed JSON that doesn't parse is kept as text.
            Err(_) => (Some(String::from_utf8_lossy(&bytes).into_owned()), None),
        }
    } else {
        (Some(String::from_utf8_lossy(&bytes).into_owned()), None)
    };

    let now = chrono::Utc::now().to_rfc3339();
    // Title and filter are snapshotted so later webhook edits don't
    // retroactively rewrite history.
    conn.execute(
        "INSERT INTO broadcast_events (webhook_id, app_name, title, for_users, content_type, body_text, body_json, received_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            &hook.id,
            &hook.app_name,
            &hook.title,
            &hook.for_users,
            &ct_string,
            &body_text,
            &body_json,
            &now
        ],
    )
    .map_err(internal)?;
    let id = conn.last_insert_rowid();

    events.publish(HiveEvent::Buzz(BroadcastEvent {
        id,
        webhook_id: Some(hook.id),
        app_name: hook.app_name,
        title: hook.title,
        for_users: hook.for_users,
        content_type: ct_string,
        body_text,
        body_json: body_json.and_then(|b| serde_json::from_str(&b).ok()),
        received_at: now,
    }));

    Ok(Json(serde_json::json!({ "ok": true, "eventId": id })))
}
