use crate::db::Db;
use crate::events::EventBus;
use crate::models::*;
use crate::ordering::key_between;
use crate::swarm;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, get, patch, post};
use rusqlite::{Connection, params};

use super::{ApiError, AuthUser, err, internal};

const PLANNED_ORDER: &str = "CASE status \
     WHEN 'in_progress' THEN 1 WHEN 'review' THEN 2 WHEN 'ready' THEN 3 \
     WHEN 'queued' THEN 4 WHEN 'holding' THEN 5 ELSE 6 END, sort_key ASC, created_at ASC";

fn end_of_bucket_key(conn: &Connection, status: TaskStatus) -> String {
    let max: Option<String> = conn
        .query_row(
            "SELECT MAX(sort_key) FROM tasks WHERE status = ?1",
            params![status.as_str()],
            |r| r.get(0),
        )
        .unwrap_or(None);
    key_between(max.as_deref(), None)
}

#[post("/swarm/tasks", format = "json", data = "<body>")]
pub fn create_task(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    body: Json<CreateTaskBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let title = body.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        return Err(err(Status::BadRequest, "Title must not be empty"));
    }
    let status = match body.status.as_deref() {
        Some(s) => TaskStatus::parse(s).ok_or_else(|| err(Status::BadRequest, "Invalid status"))?,
        None => TaskStatus::Queued,
    };

    let conn = db.conn();
    if let Some(ref pid) = body.project_id
        && swarm::load_project(&conn, pid).is_none()
    {
        return Err(err(Status::BadRequest, "Unknown project"));
    }
    if let Some(ref pred) = body.must_be_done_after_task_id
        && swarm::load_task(&conn, pred).is_none()
    {
        return Err(err(Status::BadRequest, "Unknown predecessor task"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let sort_key = end_of_bucket_key(&conn, status);
    let completed_at = (status == TaskStatus::Complete).then(|| now.clone());
    conn.execute(
        "INSERT INTO tasks (id, project_id, title, detail, creator_user_id, assignee_user_id, \
         status, on_or_after_at, must_be_done_after_task_id, sort_key, next_task_id, \
         next_task_assignee_user_id, created_at, updated_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13, ?14)",
        params![
            &id,
            &body.project_id,
            &title,
            &body.detail,
            &auth.0.user,
            &body.assignee_user_id,
            status.as_str(),
            &body.on_or_after_at,
            &body.must_be_done_after_task_id,
            &sort_key,
            &body.next_task_id,
            &body.next_task_assignee_user_id,
            &now,
            &completed_at
        ],
    )
    .map_err(internal)?;

    let task = swarm::load_task(&conn, &id)
        .ok_or_else(|| err(Status::InternalServerError, "Task vanished after insert"))?;
    swarm::record_task_event(&conn, &auth.0.user, "created", None, &task);
    swarm::emit_task_activity(
        &conn,
        events,
        &auth.0.user,
        "swarm.task.created",
        &format!("{} created task \"{}\"", auth.0.user, task.title),
        &task,
        None,
    );
    let task = swarm::enriched(&conn, task);
    Ok(Json(serde_json::json!({ "task": task })))
}

#[get("/swarm/tasks?<projectId>&<status>&<assignee>&<sort>&<limit>")]
#[allow(non_snake_case)]
pub fn list_tasks(
    _auth: AuthUser,
    db: &State<Db>,
    projectId: Option<&str>,
    status: Option<&str>,
    assignee: Option<&str>,
    sort: Option<&str>,
    limit: Option<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = limit.unwrap_or(200).clamp(1, 500);
    let status = match status {
        Some(s) => Some(
            TaskStatus::parse(s).ok_or_else(|| err(Status::BadRequest, "Invalid status"))?,
        ),
        None => None,
    };

    let conn = db.conn();
    let mut sql = format!("SELECT {TASK_COLS} FROM tasks WHERE 1=1");
    let mut args: Vec<String> = vec![];
    let mut idx = 1;
    if let Some(pid) = projectId {
        sql.push_str(&format!(" AND project_id = ?{idx}"));
        args.push(pid.to_string());
        idx += 1;
    }
    if let Some(status) = status {
        sql.push_str(&format!(" AND status = ?{idx}"));
        args.push(status.as_str().to_string());
        idx += 1;
    }
    if let Some(assignee) = assignee {
        sql.push_str(&format!(" AND assignee_user_id = ?{idx}"));
        args.push(assignee.to_string());
        idx += 1;
    }
    match sort.unwrap_or("planned") {
        "planned" => sql.push_str(&format!(" ORDER BY {PLANNED_ORDER}")),
        "created" => sql.push_str(" ORDER BY created_at DESC"),
        _ => return Err(err(Status::BadRequest, "sort must be 'planned' or 'created'")),
    }
    sql.push_str(&format!(" LIMIT ?{idx}"));
    args.push(limit.to_string());

    let mut stmt = conn.prepare(&sql).map_err(internal)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> = args
        .iter()
        .map(|v| v as &dyn rusqlite::types::ToSql)
        .collect();
    let tasks: Vec<Task> = stmt
        .query_map(params_refs.as_slice(), |row| Task::from_row(row))
        .map_err(internal)?
        .filter_map(|r| r.ok())
        .map(|t| swarm::enriched(&conn, t))
        .collect();
    Ok(Json(serde_json::json!({ "tasks": tasks })))
}

#[get("/swarm/tasks/<id>")]
pub fn get_task(
    _auth: AuthUser,
    db: &State<Db>,
    id: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let task = swarm::load_task(&conn, id).ok_or_else(|| err(Status::NotFound, "Task not found"))?;
    let task = swarm::enriched(&conn, task);
    Ok(Json(serde_json::json!({ "task": task })))
}

#[patch("/swarm/tasks/<id>", format = "json", data = "<body>")]
pub fn update_task(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    id: &str,
    body: Json<UpdateTaskBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let before =
        swarm::load_task(&conn, id).ok_or_else(|| err(Status::NotFound, "Task not found"))?;

    let mut updates: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    let mut changed_fields: Vec<&str> = Vec::new();
    let mut idx = 1;

    if let Some(ref title) = body.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(err(Status::BadRequest, "Title must not be empty"));
        }
        updates.push(format!("title = ?{idx}"));
        values.push(Box::new(title.to_string()));
        changed_fields.push("title");
        idx += 1;
    }
    if let Some(ref detail) = body.detail {
        updates.push(format!("detail = ?{idx}"));
        values.push(Box::new(detail.clone()));
        changed_fields.push("detail");
        idx += 1;
    }
    if let Some(ref pid) = body.project_id {
        if swarm::load_project(&conn, pid).is_none() {
            return Err(err(Status::BadRequest, "Unknown project"));
        }
        updates.push(format!("project_id = ?{idx}"));
        values.push(Box::new(pid.clone()));
        changed_fields.push("projectId");
        idx += 1;
    }
    if let Some(ref assignee) = body.assignee_user_id {
        updates.push(format!("assignee_user_id = ?{idx}"));
        values.push(Box::new(assignee.clone()));
        changed_fields.push("assigneeUserId");
        idx += 1;
    }
    if let Some(ref at) = body.on_or_after_at {
        updates.push(format!("on_or_after_at = ?{idx}"));
        values.push(Box::new(at.clone()));
        changed_fields.push("onOrAfterAt");
        idx += 1;
    }
    if let Some(ref pred) = body.must_be_done_after_task_id {
        if pred == id {
            return Err(err(Status::BadRequest, "A task cannot depend on itself"));
        }
        if swarm::load_task(&conn, pred).is_none() {
            return Err(err(Status::BadRequest, "Unknown predecessor task"));
        }
        updates.push(format!("must_be_done_after_task_id = ?{idx}"));
        values.push(Box::new(pred.clone()));
        changed_fields.push("mustBeDoneAfterTaskId");
        idx += 1;
    }
    if let Some(ref next) = body.next_task_id {
        updates.push(format!("next_task_id = ?{idx}"));
        values.push(Box::new(next.clone()));
        changed_fields.push("nextTaskId");
        idx += 1;
    }
    if let Some(ref next) = body.next_task_assignee_user_id {
        updates.push(format!("next_task_assignee_user_id = ?{idx}"));
        values.push(Box::new(next.clone()));
        changed_fields.push("nextTaskAssigneeUserId");
        idx += 1;
    }

    if updates.is_empty() {
        return Err(err(Status::BadRequest, "No fields to update"));
    }

    updates.push(format!("updated_at = ?{idx}"));
    values.push(Box::new(chrono::Utc::now().to_rfc3339()));
    idx += 1;

    let sql = format!("UPDATE tasks SET {} WHERE id = ?{idx}", updates.join(", "));
    values.push(Box::new(id.to_string()));
    let param_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    conn.execute(&sql, param_refs.as_slice()).map_err(internal)?;

    let task = swarm::load_task(&conn, id).ok_or_else(|| err(Status::NotFound, "Task not found"))?;
    swarm::record_task_event(&conn, &auth.0.user, "updated", Some(&before), &task);

    // Assignment changes get their own event type on the feed.
    let assignment_changed = body.assignee_user_id.is_some()
        && body.assignee_user_id != before.assignee_user_id;
    let (event_type, human_title) = if assignment_changed {
        (
            "swarm.task.assigned",
            format!(
                "{} assigned \"{}\" to {}",
                auth.0.user,
                task.title,
                task.assignee_user_id.as_deref().unwrap_or("nobody")
            ),
        )
    } else {
        (
            "swarm.task.updated",
            format!("{} updated \"{}\"", auth.0.user, task.title),
        )
    };
    swarm::emit_task_activity(
        &conn,
        events,
        &auth.0.user,
        event_type,
        &human_title,
        &task,
        Some(changed_fields.join(", ")),
    );

    let task = swarm::enriched(&conn, task);
    Ok(Json(serde_json::json!({ "task": task })))
}

/// Take a task. Permissive: claiming an already-assigned task reassigns it
/// (explicit hand-offs go through PATCH and get the `assigned` event type).
#[post("/swarm/tasks/<id>/claim")]
pub fn claim_task(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    id: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let before =
        swarm::load_task(&conn, id).ok_or_else(|| err(Status::NotFound, "Task not found"))?;

    conn.execute(
        "UPDATE tasks SET assignee_user_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![&auth.0.user, chrono::Utc::now().to_rfc3339(), id],
    )
    .map_err(internal)?;

    let task = swarm::load_task(&conn, id).ok_or_else(|| err(Status::NotFound, "Task not found"))?;
    swarm::record_task_event(&conn, &auth.0.user, "claimed", Some(&before), &task);
    swarm::emit_task_activity(
        &conn,
        events,
        &auth.0.user,
        "swarm.task.claimed",
        &format!("{} claimed \"{}\"", auth.0.user, task.title),
        &task,
        None,
    );
    let task = swarm::enriched(&conn, task);
    Ok(Json(serde_json::json!({ "task": task })))
}

#[post("/swarm/tasks/<id>/status", format = "json", data = "<body>")]
pub fn set_task_status(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    id: &str,
    body: Json<StatusBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let target = body
        .status
        .as_deref()
        .and_then(TaskStatus::parse)
        .ok_or_else(|| err(Status::BadRequest, "Invalid status"))?;

    let conn = db.conn();
    let before =
        swarm::load_task(&conn, id).ok_or_else(|| err(Status::NotFound, "Task not found"))?;

    // A blocked task may not move forward; rewinds stay allowed.
    if matches!(
        target,
        TaskStatus::InProgress | TaskStatus::Review | TaskStatus::Complete
    ) && let Some(reason) = swarm::blocked_reason(&conn, &before)
    {
        return Err(err(
            Status::BadRequest,
            &format!("Task is blocked by: {reason}"),
        ));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let completed_at = (target == TaskStatus::Complete).then(|| now.clone());
    conn.execute(
        "UPDATE tasks SET status = ?1, completed_at = ?2, updated_at = ?3 WHERE id = ?4",
        params![target.as_str(), &completed_at, &now, id],
    )
    .map_err(internal)?;

    let task = swarm::load_task(&conn, id).ok_or_else(|| err(Status::NotFound, "Task not found"))?;
    swarm::record_task_event(&conn, &auth.0.user, "status_changed", Some(&before), &task);
    let event_type = if target == TaskStatus::Complete {
        "swarm.task.completed"
    } else {
        "swarm.task.status_changed"
    };
    swarm::emit_task_activity(
        &conn,
        events,
        &auth.0.user,
        event_type,
        &format!(
            "{} changed \"{}\" to {}",
            auth.0.user,
            task.title,
            target.as_str()
        ),
        &task,
        Some(format!("{} -> {}", before.status.as_str(), target.as_str())),
    );
    let task = swarm::enriched(&conn, task);
    Ok(Json(serde_json::json!({ "task": task })))
}

#[get("/swarm/tasks/<id>/events")]
pub fn list_task_events(
    _auth: AuthUser,
    db: &State<Db>,
    id: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    if swarm::load_task(&conn, id).is_none() {
        return Err(err(Status::NotFound, "Task not found"));
    }
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {TASK_EVENT_COLS} FROM task_events WHERE task_id = ?1 ORDER BY id ASC"
        ))
        .map_err(internal)?;
    let events: Vec<TaskEvent> = stmt
        .query_map(params![id], |row| TaskEvent::from_row(row))
        .map_err(internal)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(Json(serde_json::json!({ "events": events })))
}

/// Move a task within its status bucket: directly before `beforeTaskId`,
/// or to the end of the bucket when the target is null. Neighbors keep
/// their keys.
#[post("/swarm/tasks/<id>/reorder", format = "json", data = "<body>")]
pub fn reorder_task(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    id: &str,
    body: Json<ReorderBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let task = swarm::load_task(&conn, id).ok_or_else(|| err(Status::NotFound, "Task not found"))?;

    if body.before_task_id.as_deref() == Some(id) {
        let task = swarm::enriched(&conn, task);
        return Ok(Json(serde_json::json!({ "task": task })));
    }

    // Bucket neighbors in planned order, excluding the moving task itself.
    let mut stmt = conn
        .prepare(
            "SELECT id, sort_key FROM tasks WHERE status = ?1 AND id != ?2 \
             ORDER BY sort_key ASC, created_at ASC",
        )
        .map_err(internal)?;
    let bucket: Vec<(String, String)> = stmt
        .query_map(params![task.status.as_str(), id], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .map_err(internal)?
        .filter_map(|r| r.ok())
        .collect();

    let new_key = match body.before_task_id.as_deref() {
        Some(before_id) => {
            let pos = bucket
                .iter()
                .position(|(bid, _)| bid == before_id)
                .ok_or_else(|| {
                    err(
                        Status::BadRequest,
                        "beforeTaskId is not a task in the same status bucket",
                    )
                })?;
            let lo = pos.checked_sub(1).map(|p| bucket[p].1.as_str());
            key_between(lo, Some(bucket[pos].1.as_str()))
        }
        None => key_between(bucket.last().map(|(_, k)| k.as_str()), None),
    };

    conn.execute(
        "UPDATE tasks SET sort_key = ?1, updated_at = ?2 WHERE id = ?3",
        params![&new_key, chrono::Utc::now().to_rfc3339(), id],
    )
    .map_err(internal)?;

    let before = task;
    let task = swarm::load_task(&conn, id).ok_or_else(|| err(Status::NotFound, "Task not found"))?;
    swarm::record_task_event(&conn, &auth.0.user, "reordered", Some(&before), &task);
    swarm::emit_task_activity(
        &conn,
        events,
        &auth.0.user,
        "swarm.task.reordered",
        &format!("{} reordered \"{}\"", auth.0.user, task.title),
        &task,
        None,
    );
    let task = swarm::enriched(&conn, task);
    Ok(Json(serde_json::json!({ "task": task })))
}
