use crate::config::Config;
use crate::db::Db;
use crate::events::{EventBus, HiveEvent, PresenceChange};
use crate::models::{BROADCAST_EVENT_COLS, BroadcastEvent};
use crate::presence::{self, ConnKind, PresenceGuard, PresenceTracker};
use rocket::http::Status;
use rocket::response::stream::{Event, EventStream};
use rocket::{State, get};
use rusqlite::params;
use tokio::time::{Duration, interval};

use super::{ApiError, AuthUser, err};

/// Keepalive period; client disconnects are detected on the next write.
const KEEPALIVE_SECS: u64 = 30;

/// Buzz streams without a cursor replay this many stored events.
const BUZZ_REPLAY_LIMIT: i64 = 50;

fn redact_change(change: &PresenceChange, viewer: &str, admin: bool) -> PresenceChange {
    match change {
        PresenceChange::Join { user, presence } => PresenceChange::Join {
            user: user.clone(),
            presence: presence::redact_for(viewer, admin, presence),
        },
        PresenceChange::Leave { user, presence } => PresenceChange::Leave {
            user: user.clone(),
            presence: presence::redact_for(viewer, admin, presence),
        },
    }
}

fn register(
    db: &Db,
    events: &EventBus,
    tracker: &PresenceTracker,
    roster: &[String],
    user: &str,
    kind: ConnKind,
) -> PresenceGuard {
    let conn_id = uuid::Uuid::new_v4().to_string();
    if tracker.add(&conn_id, user, kind) {
        let snapshot = presence::snapshot(&db.conn(), tracker, roster);
        events.publish(HiveEvent::Presence(PresenceChange::Join {
            user: user.to_string(),
            presence: snapshot,
        }));
    }
    PresenceGuard {
        conn_id,
        tracker: tracker.clone(),
        db: db.clone(),
        events_sender: events.sender.clone(),
        roster: roster.to_vec(),
    }
}

/// The viewer's live feed: their mailbox topic plus presence and swarm.
#[get("/mailboxes/me/stream")]
pub fn mailbox_stream(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    tracker: &State<PresenceTracker>,
    config: &State<Config>,
) -> EventStream![] {
    let user = auth.0.user.clone();
    let admin = auth.0.admin;
    let mut rx = events.sender.subscribe();
    let guard = register(db, events, tracker, &config.roster, &user, ConnKind::Api);
    let initial = presence::redact_for(
        &user,
        admin,
        &presence::snapshot(&db.conn(), tracker, &config.roster),
    );

    EventStream! {
        // Held for the stream's lifetime; dropping it on disconnect
        // releases the presence registration.
        let _guard = guard;

        yield Event::json(&serde_json::json!({"ok": true, "mailbox": user})).event("connected");
        yield Event::json(&initial).event("presence");

        let mut keepalive = interval(Duration::from_secs(KEEPALIVE_SECS));
        keepalive.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Ok(HiveEvent::Mailbox { ref mailbox, ref event }) if *mailbox == user => {
                            yield Event::json(event).event(event.name());
                        }
                        Ok(HiveEvent::Presence(ref change)) => {
                            yield Event::json(&redact_change(change, &user, admin)).event("presence");
                        }
                        Ok(HiveEvent::Swarm(ref e)) => {
                            yield Event::json(e).event("swarm");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        _ => {} // other mailboxes, buzz, or lagged
                    }
                }
                _ = keepalive.tick() => {
                    yield Event::json(&serde_json::json!({"time": chrono::Utc::now().to_rfc3339()})).event("keepalive");
                }
            }
        }
    }
}

/// Keyed UI variant of the mailbox stream. The key maps to an identity in
/// startup configuration; the connection counts as a UI presence.
#[get("/ui/stream?<key>")]
pub fn ui_stream(
    db: &State<Db>,
    events: &State<EventBus>,
    tracker: &State<PresenceTracker>,
    config: &State<Config>,
    key: Option<&str>,
) -> Result<EventStream![], ApiError> {
    let identity = key
        .and_then(|k| config.ui_keys.get(k))
        .ok_or_else(|| err(Status::Unauthorized, "Unknown UI key"))?;
    let user = identity.user.clone();
    let admin = identity.admin;

    let mut rx = events.sender.subscribe();
    let guard = register(db, events, tracker, &config.roster, &user, ConnKind::Ui);
    let initial = presence::redact_for(
        &user,
        admin,
        &presence::snapshot(&db.conn(), tracker, &config.roster),
    );

    Ok(EventStream! {
        let _guard = guard;

        yield Event::json(&serde_json::json!({"ok": true, "mailbox": user})).event("connected");
        yield Event::json(&initial).event("presence");

        let mut keepalive = interval(Duration::from_secs(KEEPALIVE_SECS));
        keepalive.tick().await;

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Ok(HiveEvent::Mailbox { ref mailbox, ref event }) if *mailbox == user => {
                            yield Event::json(event).event(event.name());
                        }
                        Ok(HiveEvent::Presence(ref change)) => {
                            yield Event::json(&redact_change(change, &user, admin)).event("presence");
                        }
                        Ok(HiveEvent::Swarm(ref e)) => {
                            yield Event::json(e).event("swarm");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        _ => {}
                    }
                }
                _ = keepalive.tick() => {
                    yield Event::json(&serde_json::json!({"time": chrono::Utc::now().to_rfc3339()})).event("keepalive");
                }
            }
        }
    })
}

/// Tail the Buzz feed: stored events first (all of them after `since`, or
/// the most recent few), then live fan-out, always honoring each event's
/// `for_users` filter.
#[get("/broadcast/stream?<since>")]
pub fn buzz_stream(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    tracker: &State<PresenceTracker>,
    config: &State<Config>,
    since: Option<i64>,
) -> EventStream![] {
    let user = auth.0.user.clone();
    let admin = auth.0.admin;
    let mut rx = events.sender.subscribe();
    let guard = register(db, events, tracker, &config.roster, &user, ConnKind::Api);

    let (initial, replay) = {
        let conn = db.conn();
        let initial = presence::redact_for(
            &user,
            admin,
            &presence::snapshot(&conn, tracker, &config.roster),
        );

        let replay: Vec<BroadcastEvent> = match since {
            Some(since) => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {BROADCAST_EVENT_COLS} FROM broadcast_events \
                         WHERE id > ?1 ORDER BY id ASC LIMIT 500"
                    ))
                    .ok();
                stmt.as_mut()
                    .and_then(|s| {
                        s.query_map(params![since], |row| BroadcastEvent::from_row(row))
                            .ok()
                            .map(|rows| rows.filter_map(|r| r.ok()).collect())
                    })
                    .unwrap_or_default()
            }
            None => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {BROADCAST_EVENT_COLS} FROM broadcast_events \
                         ORDER BY id DESC LIMIT ?1"
                    ))
                    .ok();
                let mut rows: Vec<BroadcastEvent> = stmt
                    .as_mut()
                    .and_then(|s| {
                        s.query_map(params![BUZZ_REPLAY_LIMIT], |row| {
                            BroadcastEvent::from_row(row)
                        })
                        .ok()
                        .map(|rows| rows.filter_map(|r| r.ok()).collect())
                    })
                    .unwrap_or_default();
                rows.reverse();
                rows
            }
        };
        let replay = replay
            .into_iter()
            .filter(|e| e.visible_to(&user, admin))
            .collect::<Vec<_>>();
        (initial, replay)
    };

    EventStream! {
        let _guard = guard;

        yield Event::json(&serde_json::json!({"ok": true})).event("connected");
        yield Event::json(&initial).event("presence");

        for event in replay {
            yield Event::json(&event).event("buzz");
        }

        let mut keepalive = interval(Duration::from_secs(KEEPALIVE_SECS));
        keepalive.tick().await;

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Ok(HiveEvent::Buzz(ref event)) if event.visible_to(&user, admin) => {
                            yield Event::json(event).event("buzz");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        _ => {}
                    }
                }
                _ = keepalive.tick() => {
                    yield Event::json(&serde_json::json!({"time": chrono::Utc::now().to_rfc3339()})).event("keepalive");
                }
            }
        }
    }
}
