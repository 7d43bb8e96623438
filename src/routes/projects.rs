use crate::db::Db;
use crate::events::EventBus;
use crate::models::*;
use crate::swarm;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, delete, get, patch, post};
use rusqlite::params;

use super::{ApiError, AuthUser, err, internal};

fn valid_color(c: &str) -> bool {
    c.len() == 7
        && c.starts_with('#')
        && c[1..].chars().all(|ch| ch.is_ascii_hexdigit())
}

#[post("/swarm/projects", format = "json", data = "<body>")]
pub fn create_project(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    body: Json<CreateProjectBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let title = body.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        return Err(err(Status::BadRequest, "Title must not be empty"));
    }
    let color = body.color.as_deref().unwrap_or("").trim().to_string();
    if !valid_color(&color) {
        return Err(err(Status::BadRequest, "Color must be #RRGGBB"));
    }
    let project_lead = body
        .project_lead_user_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(Status::BadRequest, "projectLeadUserId is required"))?;
    let developer_lead = body
        .developer_lead_user_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(Status::BadRequest, "developerLeadUserId is required"))?;

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let conn = db.conn();
    conn.execute(
        "INSERT INTO projects (id, title, description, color, project_lead_user_id, \
         developer_lead_user_id, onedev_url, dokploy_deploy_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            &id,
            &title,
            &body.description,
            &color,
            project_lead,
            developer_lead,
            &body.onedev_url,
            &body.dokploy_deploy_url,
            &now
        ],
    )
    .map_err(internal)?;

    let project = swarm::load_project(&conn, &id)
        .ok_or_else(|| err(Status::InternalServerError, "Project vanished after insert"))?;
    swarm::emit_project_activity(
        &conn,
        events,
        &auth.0.user,
        "swarm.project.created",
        &format!("{} created project \"{}\"", auth.0.user, project.title),
        &project,
    );
    Ok(Json(serde_json::json!({ "project": project })))
}

#[get("/swarm/projects?<archived>")]
pub fn list_projects(
    _auth: AuthUser,
    db: &State<Db>,
    archived: Option<bool>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let sql = if archived.unwrap_or(false) {
        format!("SELECT {PROJECT_COLS} FROM projects WHERE archived_at IS NOT NULL ORDER BY created_at DESC")
    } else {
        format!("SELECT {PROJECT_COLS} FROM projects WHERE archived_at IS NULL ORDER BY created_at DESC")
    };
    let mut stmt = conn.prepare(&sql).map_err(internal)?;
    let projects: Vec<Project> = stmt
        .query_map([], |row| Project::from_row(row))
        .map_err(internal)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(Json(serde_json::json!({ "projects": projects })))
}

#[get("/swarm/projects/<id>")]
pub fn get_project(
    _auth: AuthUser,
    db: &State<Db>,
    id: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let project =
        swarm::load_project(&conn, id).ok_or_else(|| err(Status::NotFound, "Project not found"))?;
    Ok(Json(serde_json::json!({ "project": project })))
}

#[patch("/swarm/projects/<id>", format = "json", data = "<body>")]
pub fn update_project(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    id: &str,
    body: Json<UpdateProjectBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    if swarm::load_project(&conn, id).is_none() {
        return Err(err(Status::NotFound, "Project not found"));
    }

    let mut updates: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    let mut idx = 1;

    if let Some(ref title) = body.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(err(Status::BadRequest, "Title must not be empty"));
        }
        updates.push(format!("title = ?{idx}"));
        values.push(Box::new(title.to_string()));
        idx += 1;
    }
    if let Some(ref color) = body.color {
        if !valid_color(color.trim()) {
            return Err(err(Status::BadRequest, "Color must be #RRGGBB"));
        }
        updates.push(format!("color = ?{idx}"));
        values.push(Box::new(color.trim().to_string()));
        idx += 1;
    }
    if let Some(ref description) = body.description {
        updates.push(format!("description = ?{idx}"));
        values.push(Box::new(description.clone()));
        idx += 1;
    }
    if let Some(ref lead) = body.project_lead_user_id {
        updates.push(format!("project_lead_user_id = ?{idx}"));
        values.push(Box::new(lead.clone()));
        idx += 1;
    }
    if let Some(ref lead) = body.developer_lead_user_id {
        updates.push(format!("developer_lead_user_id = ?{idx}"));
        values.push(Box::new(lead.clone()));
        idx += 1;
    }
    if let Some(ref url) = body.onedev_url {
        updates.push(format!("onedev_url = ?{idx}"));
        values.push(Box::new(url.clone()));
        idx += 1;
    }
    if let Some(ref url) = body.dokploy_deploy_url {
        updates.push(format!("dokploy_deploy_url = ?{idx}"));
        values.push(Box::new(url.clone()));
        idx += 1;
    }

    if updates.is_empty() {
        return Err(err(Status::BadRequest, "No fields to update"));
    }

    updates.push(format!("updated_at = ?{idx}"));
    values.push(Box::new(chrono::Utc::now().to_rfc3339()));
    idx += 1;

    let sql = format!("UPDATE projects SET {} WHERE id = ?{idx}", updates.join(", "));
    values.push(Box::new(id.to_string()));
    let param_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    conn.execute(&sql, param_refs.as_slice()).map_err(internal)?;

    let project = swarm::load_project(&conn, id)
        .ok_or_else(|| err(Status::NotFound, "Project not found"))?;
    swarm::emit_project_activity(
        &conn,
        events,
        &auth.0.user,
        "swarm.project.updated",
        &format!("{} updated project \"{}\"", auth.0.user, project.title),
        &project,
    );
    Ok(Json(serde_json::json!({ "project": project })))
}

#[post("/swarm/projects/<id>/archive")]
pub fn archive_project(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    id: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let now = chrono::Utc::now().to_rfc3339();
    let changed = conn
        .execute(
            "UPDATE projects SET archived_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![&now, id],
        )
        .map_err(internal)?;
    if changed == 0 {
        return Err(err(Status::NotFound, "Project not found"));
    }
    let project = swarm::load_project(&conn, id)
        .ok_or_else(|| err(Status::NotFound, "Project not found"))?;
    swarm::emit_project_activity(
        &conn,
        events,
        &auth.0.user,
        "swarm.project.archived",
        &format!("{} archived project \"{}\"", auth.0.user, project.title),
        &project,
    );
    Ok(Json(serde_json::json!({ "project": project })))
}

#[delete("/swarm/projects/<id>/archive")]
pub fn unarchive_project(
    auth: AuthUser,
    db: &State<Db>,
    events: &State<EventBus>,
    id: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let now = chrono::Utc::now().to_rfc3339();
    let changed = conn
        .execute(
            "UPDATE projects SET archived_at = NULL, updated_at = ?1 WHERE id = ?2",
            params![&now, id],
        )
        .map_err(internal)?;
    if changed == 0 {
        return Err(err(Status::NotFound, "Project not found"));
    }
    let project = swarm::load_project(&conn, id)
        .ok_or_else(|| err(Status::NotFound, "Project not found"))?;
    swarm::emit_project_activity(
        &conn,
        events,
        &auth.0.user,
        "swarm.project.unarchived",
        &format!("{} unarchived project \"{}\"", auth.0.user, project.title),
        &project,
    );
    Ok(Json(serde_json::json!({ "project": project })))
}
