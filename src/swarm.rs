use crate::events::{EventBus, HiveEvent, SwarmEvent};
use crate::models::{BroadcastEvent, Project, TASK_COLS, Task, TaskStatus};
use crate::schedule::parse_ts;
use chrono::Utc;
use rusqlite::{Connection, params};

pub fn load_task(conn: &Connection, id: &str) -> Option<Task> {
    conn.query_row(
        &format!("SELECT {TASK_COLS} FROM tasks WHERE id = ?1"),
        params![id],
        |row| Task::from_row(row),
    )
    .ok()
}

pub fn load_project(conn: &Connection, id: &str) -> Option<Project> {
    conn.query_row(
        &format!(
            "SELECT {} FROM projects WHERE id = ?1",
            crate::models::PROJECT_COLS
        ),
        params![id],
        |row| Project::from_row(row),
    )
    .ok()
}

/// Why a task cannot progress right now. Computed on read, never stored.
pub fn blocked_reason(conn: &Connection, task: &Task) -> Option<String> {
    if let Some(ts) = &task.on_or_after_at
        && let Ok(t) = parse_ts(ts)
        && t > Utc::now()
    {
        return Some(format!("not-before {ts}"));
    }
    if let Some(pred_id) = &task.must_be_done_after_task_id
        && let Some(pred) = load_task(conn, pred_id)
        && pred.status != TaskStatus::Complete
    {
        return Some(format!("waiting on: {}", pred.title));
    }
    None
}

pub fn enriched(conn: &Connection, mut task: Task) -> Task {
    task.blocked_reason = blocked_reason(conn, &task);
    task
}

/// Append an audit row with before/after snapshots.
pub fn record_task_event(
    conn: &Connection,
    actor: &str,
    kind: &str,
    before: Option<&Task>,
    after: &Task,
) {
    let before_json = before.map(|t| serde_json::to_string(t).unwrap_or_default());
    let after_json = serde_json::to_string(after).unwrap_or_default();
    conn.execute(
        "INSERT INTO task_events (task_id, actor_user_id, kind, before_state, after_state, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &after.id,
            actor,
            kind,
            before_json,
            after_json,
            Utc::now().to_rfc3339()
        ],
    )
    .ok();
}

/// Mirror a Swarm mutation into the broadcast event store (reserved app
/// name `swarm`) and publish structured bus events, so Buzz doubles as the
/// unified activity feed.
fn insert_activity(
    conn: &Connection,
    events: &EventBus,
    actor: &str,
    event_type: &str,
    human_title: &str,
    task_id: Option<&str>,
    project_id: Option<&str>,
    body: serde_json::Value,
) {
    let now = Utc::now().to_rfc3339();
    let body_str = serde_json::to_string(&body).unwrap_or_default();
    let inserted = conn.execute(
        "INSERT INTO broadcast_events (webhook_id, app_name, title, for_users, content_type, body_json, received_at)
         VALUES (NULL, 'swarm', ?1, NULL, 'application/json', ?2, ?3)",
        params![human_title, &body_str, &now],
    );
    if let Ok(1) = inserted {
        events.publish(HiveEvent::Buzz(BroadcastEvent {
            id: conn.last_insert_rowid(),
            webhook_id: None,
            app_name: "swarm".to_string(),
            title: human_title.to_string(),
            for_users: None,
            content_type: "application/json".to_string(),
            body_text: None,
            body_json: Some(body),
            received_at: now,
        }));
    }
    events.publish(HiveEvent::Swarm(SwarmEvent {
        event_type: event_type.to_string(),
        task_id: task_id.map(String::from),
        project_id: project_id.map(String::from),
        actor: actor.to_string(),
    }));
}

pub fn emit_task_activity(
    conn: &Connection,
    events: &EventBus,
    actor: &str,
    event_type: &str,
    human_title: &str,
    task: &Task,
    diff_summary: Option<String>,
) {
    let mut body = serde_json::json!({
        "eventType": event_type,
        "taskId": task.id,
        "projectId": task.project_id,
        "title": task.title,
        "actor": actor,
        "assignee": task.assignee_user_id,
        "status": task.status,
        "deepLink": format!("/swarm/tasks/{}", task.id),
    });
    if let Some(diff) = diff_summary {
        body["diffSummary"] = serde_json::Value::String(diff);
    }
    insert_activity(
        conn,
        events,
        actor,
        event_type,
        human_title,
        Some(&task.id),
        task.project_id.as_deref(),
        body,
    );
}

pub fn emit_project_activity(
    conn: &Connection,
    events: &EventBus,
    actor: &str,
    event_type: &str,
    human_title: &str,
    project: &Project,
) {
    let body = serde_json::json!({
        "eventType": event_type,
        "projectId": project.id,
        "title": project.title,
        "actor": actor,
        "deepLink": format!("/swarm/projects/{}", project.id),
    });
    insert_activity(
        conn,
        events,
        actor,
        event_type,
        human_title,
        None,
        Some(&project.id),
        body,
    );
}
