use crate::db::Db;
use crate::models::*;
use crate::schedule;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, delete, get, patch, post};
use rusqlite::params;

use super::{ApiError, AuthUser, err, internal};

const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

fn validate_days(days: &[String]) -> Result<Option<String>, ApiError> {
    if days.is_empty() {
        return Ok(None);
    }
    let mut cleaned: Vec<String> = Vec::new();
    for d in days {
        let d = d.trim().to_lowercase();
        if !WEEKDAYS.contains(&d.as_str()) {
            return Err(err(
                Status::BadRequest,
                "daysOfWeek entries must be mon..sun",
            ));
        }
        if !cleaned.contains(&d) {
            cleaned.push(d);
        }
    }
    Ok(Some(cleaned.join(",")))
}

fn validate_hour(h: i64) -> Result<(), ApiError> {
    if !(0..=23).contains(&h) {
        return Err(err(Status::BadRequest, "betweenHours must be 0..23"));
    }
    Ok(())
}

fn validate_timezone(tz: &str) -> Result<(), ApiError> {
    tz.parse::<chrono_tz::Tz>()
        .map(|_| ())
        .map_err(|_| err(Status::BadRequest, "Invalid IANA timezone"))
}

fn load_template(conn: &rusqlite::Connection, id: &str) -> Option<RecurringTemplate> {
    conn.query_row(
        &format!("SELECT {TEMPLATE_COLS} FROM recurring_templates WHERE id = ?1"),
        params![id],
        |row| RecurringTemplate::from_row(row),
    )
    .ok()
}

#[post("/swarm/recurring/templates", format = "json", data = "<body>")]
pub fn create_template(
    auth: AuthUser,
    db: &State<Db>,
    body: Json<CreateTemplateBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let title = body.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        return Err(err(Status::BadRequest, "Title must not be empty"));
    }
    let start_at = body
        .start_at
        .as_deref()
        .ok_or_else(|| err(Status::BadRequest, "startAt is required"))?;
    schedule::parse_ts(start_at).map_err(|e| err(Status::BadRequest, &e))?;
    if let Some(end) = body.end_at.as_deref() {
        schedule::parse_ts(end).map_err(|e| err(Status::BadRequest, &e))?;
    }
    let every_interval = body.every_interval.unwrap_or(1);
    if every_interval < 1 {
        return Err(err(Status::BadRequest, "everyInterval must be at least 1"));
    }
    let every_unit = match body.every_unit.as_deref() {
        Some(u) => EveryUnit::parse(u).ok_or_else(|| err(Status::BadRequest, "Invalid everyUnit"))?,
        None => EveryUnit::Day,
    };
    let week_parity = match body.week_parity.as_deref() {
        Some(p) => WeekParity::parse(p).ok_or_else(|| err(Status::BadRequest, "Invalid weekParity"))?,
        None => WeekParity::Any,
    };
    let days_of_week = match body.days_of_week.as_deref() {
        Some(days) => validate_days(days)?,
        None => None,
    };
    if let Some(h) = body.between_hours_start {
        validate_hour(h)?;
    }
    if let Some(h) = body.between_hours_end {
        validate_hour(h)?;
    }
    let timezone = body.timezone.clone().unwrap_or_else(|| "UTC".to_string());
    validate_timezone(&timezone)?;
    if let Some(rc) = body.repeat_count
        && rc < 1
    {
        return Err(err(Status::BadRequest, "repeatCount must be at least 1"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let conn = db.conn();
    conn.execute(
        "INSERT INTO recurring_templates (id, title, detail, project_id, owner_user_id, \
         primary_agent, fallback_agent, enabled, start_at, end_at, every_interval, every_unit, \
         days_of_week, week_parity, between_hours_start, between_hours_end, timezone, mute, \
         mute_interval, repeat_count, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?21)",
        params![
            &id,
            &title,
            &body.detail,
            &body.project_id,
            &auth.0.user,
            &body.primary_agent,
            &body.fallback_agent,
            body.enabled.unwrap_or(true) as i64,
            start_at,
            &body.end_at,
            every_interval,
            every_unit.as_str(),
            &days_of_week,
            week_parity.as_str(),
            &body.between_hours_start,
            &body.between_hours_end,
            &timezone,
            body.mute.unwrap_or(false) as i64,
            &body.mute_interval,
            &body.repeat_count,
            &now
        ],
    )
    .map_err(internal)?;

    let template = load_template(&conn, &id)
        .ok_or_else(|| err(Status::InternalServerError, "Template vanished after insert"))?;
    Ok(Json(serde_json::json!({ "template": template })))
}

#[get("/swarm/recurring/templates")]
pub fn list_templates(
    _auth: AuthUser,
    db: &State<Db>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {TEMPLATE_COLS} FROM recurring_templates ORDER BY created_at DESC"
        ))
        .map_err(internal)?;
    let templates: Vec<RecurringTemplate> = stmt
        .query_map([], |row| RecurringTemplate::from_row(row))
        .map_err(internal)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(Json(serde_json::json!({ "templates": templates })))
}

#[get("/swarm/recurring/templates/<id>")]
pub fn get_template(
    _auth: AuthUser,
    db: &State<Db>,
    id: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let template =
        load_template(&conn, id).ok_or_else(|| err(Status::NotFound, "Template not found"))?;
    Ok(Json(serde_json::json!({ "template": template })))
}

#[patch("/swarm/recurring/templates/<id>", format = "json", data = "<body>")]
pub fn update_template(
    _auth: AuthUser,
    db: &State<Db>,
    id: &str,
    body: Json<UpdateTemplateBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    if load_template(&conn, id).is_none() {
        return Err(err(Status::NotFound, "Template not found"));
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
    if let Some(ref detail) = body.detail {
        updates.push(format!("detail = ?{idx}"));
        values.push(Box::new(detail.clone()));
        idx += 1;
    }
    if let Some(ref pid) = body.project_id {
        updates.push(format!("project_id = ?{idx}"));
        values.push(Box::new(pid.clone()));
        idx += 1;
    }
    if let Some(ref agent) = body.primary_agent {
        updates.push(format!("primary_agent = ?{idx}"));
        values.push(Box::new(agent.clone()));
        idx += 1;
    }
    if let Some(ref agent) = body.fallback_agent {
        updates.push(format!("fallback_agent = ?{idx}"));
        values.push(Box::new(agent.clone()));
        idx += 1;
    }
    if let Some(ref start) = body.start_at {
        schedule::parse_ts(start).map_err(|e| err(Status::BadRequest, &e))?;
        updates.push(format!("start_at = ?{idx}"));
        values.push(Box::new(start.clone()));
        idx += 1;
    }
    if let Some(ref end) = body.end_at {
        schedule::parse_ts(end).map_err(|e| err(Status::BadRequest, &e))?;
        updates.push(format!("end_at = ?{idx}"));
        values.push(Box::new(end.clone()));
        idx += 1;
    }
    if let Some(iv) = body.every_interval {
        if iv < 1 {
            return Err(err(Status::BadRequest, "everyInterval must be at least 1"));
        }
        updates.push(format!("every_interval = ?{idx}"));
        values.push(Box::new(iv));
        idx += 1;
    }
    if let Some(ref unit) = body.every_unit {
        let unit =
            EveryUnit::parse(unit).ok_or_else(|| err(Status::BadRequest, "Invalid everyUnit"))?;
        updates.push(format!("every_unit = ?{idx}"));
        values.push(Box::new(unit.as_str().to_string()));
        idx += 1;
    }
    if let Some(ref days) = body.days_of_week {
        let days = validate_days(days)?;
        updates.push(format!("days_of_week = ?{idx}"));
        values.push(Box::new(days));
        idx += 1;
    }
    if let Some(ref parity) = body.week_parity {
        let parity =
            WeekParity::parse(parity).ok_or_else(|| err(Status::BadRequest, "Invalid weekParity"))?;
        updates.push(format!("week_parity = ?{idx}"));
        values.push(Box::new(parity.as_str().to_string()));
        idx += 1;
    }
    if let Some(h) = body.between_hours_start {
        validate_hour(h)?;
        updates.push(format!("between_hours_start = ?{idx}"));
        values.push(Box::new(h));
        idx += 1;
    }
    if let Some(h) = body.between_hours_end {
        validate_hour(h)?;
        updates.push(format!("between_hours_end = ?{idx}"));
        values.push(Box::new(h));
        idx += 1;
    }
    if let Some(ref tz) = body.timezone {
        validate_timezone(tz)?;
        updates.push(format!("timezone = ?{idx}"));
        values.push(Box::new(tz.clone()));
        idx += 1;
    }
    if let Some(mute) = body.mute {
        updates.push(format!("mute = ?{idx}"));
        values.push(Box::new(mute as i64));
        idx += 1;
    }
    if let Some(ref mi) = body.mute_interval {
        updates.push(format!("mute_interval = ?{idx}"));
        values.push(Box::new(mi.clone()));
        idx += 1;
    }
    if let Some(rc) = body.repeat_count {
        if rc < 1 {
            return Err(err(Status::BadRequest, "repeatCount must be at least 1"));
        }
        updates.push(format!("repeat_count = ?{idx}"));
        values.push(Box::new(rc));
        idx += 1;
    }

    if updates.is_empty() {
        return Err(err(Status::BadRequest, "No fields to update"));
    }

    updates.push(format!("updated_at = ?{idx}"));
    values.push(Box::new(chrono::Utc::now().to_rfc3339()));
    idx += 1;

    let sql = format!(
        "UPDATE recurring_templates SET {} WHERE id = ?{idx}",
        updates.join(", ")
    );
    values.push(Box::new(id.to_string()));
    let param_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    conn.execute(&sql, param_refs.as_slice()).map_err(internal)?;

    let template =
        load_template(&conn, id).ok_or_else(|| err(Status::NotFound, "Template not found"))?;
    Ok(Json(serde_json::json!({ "template": template })))
}

#[delete("/swarm/recurring/templates/<id>")]
pub fn delete_template(
    _auth: AuthUser,
    db: &State<Db>,
    id: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let deleted = conn
        .execute("DELETE FROM recurring_templates WHERE id = ?1", params![id])
        .map_err(internal)?;
    if deleted == 0 {
        return Err(err(Status::NotFound, "Template not found"));
    }
    Ok(Json(serde_json::json!({ "deleted": true, "id": id })))
}

fn set_template_enabled(
    db: &Db,
    id: &str,
    enabled: bool,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = db.conn();
    let changed = conn
        .execute(
            "UPDATE recurring_templates SET enabled = ?1, updated_at = ?2 WHERE id = ?3",
            params![enabled as i64, chrono::Utc::now().to_rfc3339(), id],
        )
        .map_err(internal)?;
    if changed == 0 {
        return Err(err(Status::NotFound, "Template not found"));
    }
    let template =
        load_template(&conn, id).ok_or_else(|| err(Status::NotFound, "Template not found"))?;
    Ok(Json(serde_json::json!({ "template": template })))
}

#[post("/swarm/recurring/templates/<id>/enable")]
pub fn enable_template(
    _auth: AuthUser,
    db: &State<Db>,
    id: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    set_template_enabled(db, id, true)
}

#[post("/swarm/recurring/templates/<id>/disable")]
pub fn disable_template(
    _auth: AuthUser,
    db: &State<Db>,
    id: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    set_template_enabled(db, id, false)
}

/// On-demand expansion of templates into queued task instances.
#[post("/swarm/recurring/run?<templateId>")]
#[allow(non_snake_case)]
pub fn run_recurring(
    _auth: AuthUser,
    db: &State<Db>,
    templateId: Option<&str>,
) -> Json<GeneratorResult> {
    let result = schedule::run_generator(db, templateId, chrono::Utc::now());
    Json(result)
}
