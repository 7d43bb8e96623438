use crate::db::Db;
use crate::events::{EventBus, HiveEvent, PresenceChange};
use crate::models::PresenceInfo;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// API activity keeps a user online this long after their last call.
pub const API_PRESENCE_TIMEOUT_SECS: i64 = 5 * 60;

/// How often the background sweep checks for stale API activity.
const SWEEP_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnKind {
    Ui,
    Api,
}

struct ConnectionEntry {
    user: String,
    #[allow(dead_code)]
    joined_at: DateTime<Utc>,
    kind: ConnKind,
}

#[derive(Default)]
struct PresenceState {
    connections: HashMap<String, ConnectionEntry>,
    last_api_activity: HashMap<String, DateTime<Utc>>,
    last_seen: HashMap<String, DateTime<Utc>>,
    /// Users currently announced as online; transitions are diffs against this.
    announced: HashSet<String>,
}

impl PresenceState {
    /// Online ⇔ at least one UI connection, or API activity within the timeout.
    fn computed_online(&self, user: &str, now: DateTime<Utc>) -> bool {
        let has_ui = self
            .connections
            .values()
            .any(|c| c.user == user && c.kind == ConnKind::Ui);
        if has_ui {
            return true;
        }
        self.last_api_activity
            .get(user)
            .is_some_and(|t| (now - *t).num_seconds() < API_PRESENCE_TIMEOUT_SECS)
    }
}

/// Tracks who is live right now: hybrid of open push streams and recent
/// API activity. Eventually consistent; clients tolerate leave/join churn.
#[derive(Clone, Default)]
pub struct PresenceTracker {
    inner: Arc<RwLock<PresenceState>>,
}

impl PresenceTracker {
    /// Register a connection. Returns true if the user transitioned
    /// offline -> online.
    pub fn add(&self, conn_id: &str, user: &str, kind: ConnKind) -> bool {
        let now = Utc::now();
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        state.connections.insert(
            conn_id.to_string(),
            ConnectionEntry {
                user: user.to_string(),
                joined_at: now,
                kind,
            },
        );
        if state.computed_online(user, now) {
            return state.announced.insert(user.to_string());
        }
        false
    }

    /// Unregister a connection. Returns the user if they just went offline.
    pub fn remove(&self, conn_id: &str) -> Option<String> {
        let now = Utc::now();
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let user = state.connections.remove(conn_id)?.user;
        state.last_seen.insert(user.clone(), now);
        if state.announced.contains(&user) && !state.computed_online(&user, now) {
            state.announced.remove(&user);
            return Some(user);
        }
        None
    }

    /// Record an authenticated API call. Returns true if the user
    /// transitioned offline -> online.
    pub fn record_api_activity(&self, user: &str) -> bool {
        let now = Utc::now();
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        state.last_api_activity.insert(user.to_string(), now);
        state.announced.insert(user.to_string())
    }

    pub fn online(&self, user: &str) -> bool {
        let state = self.inner.read().unwrap_or_else(|e| e.into_inner());
        state.computed_online(user, Utc::now())
    }

    pub fn last_seen(&self, user: &str) -> Option<String> {
        let state = self.inner.read().unwrap_or_else(|e| e.into_inner());
        state.last_seen.get(user).map(|t| t.to_rfc3339())
    }

    /// Find users whose API activity went stale since the last sweep and who
    /// hold no UI connection. Marks them offline and returns them.
    pub fn sweep(&self) -> Vec<String> {
        let now = Utc::now();
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let gone: Vec<String> = state
            .announced
            .iter()
            .filter(|u| !state.computed_online(u, now))
            .cloned()
            .collect();
        for user in &gone {
            state.announced.remove(user);
            state.last_seen.insert(user.clone(), now);
        }
        gone
    }
}

/// Build the full presence snapshot: per roster user the online flag,
/// last-seen time and real unread/waiting counts from the database.
/// Redaction for non-admin viewers happens at emission time.
pub fn snapshot(
    conn: &rusqlite::Connection,
    tracker: &PresenceTracker,
    roster: &[String],
) -> Vec<PresenceInfo> {
    let mut unread: HashMap<String, i64> = HashMap::new();
    if let Ok(mut stmt) = conn.prepare(
        "SELECT recipient, COUNT(*) FROM messages WHERE status = 'unread' GROUP BY recipient",
    ) && let Ok(rows) = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))
    {
        unread.extend(rows.filter_map(|r| r.ok()));
    }

    let mut waiting: HashMap<String, i64> = HashMap::new();
    if let Ok(mut stmt) = conn.prepare(
        "SELECT waiting_responder, COUNT(*) FROM messages
         WHERE response_waiting = 1 AND waiting_responder IS NOT NULL
         GROUP BY waiting_responder",
    ) && let Ok(rows) = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))
    {
        waiting.extend(rows.filter_map(|r| r.ok()));
    }

    roster
        .iter()
        .map(|user| PresenceInfo {
            user: user.clone(),
            online: tracker.online(user),
            last_seen: tracker.last_seen(user),
            unread: unread.get(user).copied().unwrap_or(0),
            waiting: waiting.get(user).copied().unwrap_or(0),
        })
        .collect()
}

/// Admins see real counts for everyone; other viewers only for their own row.
/// Online state and last-seen stay visible to all.
pub fn redact_for(viewer: &str, admin: bool, infos: &[PresenceInfo]) -> Vec<PresenceInfo> {
    infos
        .iter()
        .map(|p| {
            if admin || p.user == viewer {
                p.clone()
            } else {
                PresenceInfo {
                    unread: 0,
                    waiting: 0,
                    ..p.clone()
                }
            }
        })
        .collect()
}

/// Record API activity as a side effect of authentication. Failure is
/// acceptable; presence is best-effort.
pub fn note_api_activity(
    db: &Db,
    tracker: &PresenceTracker,
    events: &EventBus,
    roster: &[String],
    user: &str,
) {
    if tracker.record_api_activity(user) {
        let presence = snapshot(&db.conn(), tracker, roster);
        events.publish(HiveEvent::Presence(PresenceChange::Join {
            user: user.to_string(),
            presence,
        }));
    }
}

/// RAII registration for a push stream connection. Dropping the guard
/// (client disconnect or write failure) releases the presence entry and
/// publishes a leave event if the user went offline.
pub struct PresenceGuard {
    pub conn_id: String,
    pub tracker: PresenceTracker,
    pub db: Db,
    pub events_sender: broadcast::Sender<HiveEvent>,
    pub roster: Vec<String>,
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        if let Some(user) = self.tracker.remove(&self.conn_id) {
            let presence = snapshot(&self.db.conn(), &self.tracker, &self.roster);
            let _ = self
                .events_sender
                .send(HiveEvent::Presence(PresenceChange::Leave { user, presence }));
        }
    }
}

/// Spawns the 30 s background sweep that turns stale API activity into
/// leave events.
pub fn spawn_presence_sweeper(
    db: Db,
    tracker: PresenceTracker,
    events_sender: broadcast::Sender<HiveEvent>,
    roster: Vec<String>,
) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS)).await;
            for user in tracker.sweep() {
                let presence = snapshot(&db.conn(), &tracker, &roster);
                let _ = events_sender.send(HiveEvent::Presence(PresenceChange::Leave {
                    user,
                    presence,
                }));
            }
        }
    });
}
