//! Recurring template expansion.
//!
//! The generator is invoked on demand and must be safely re-runnable: every
//! instance inserts with `ON CONFLICT DO NOTHING` against the unique
//! `(recurring_template_id, recurring_instance_at)` pair, so re-running
//! only ever adds occurrences that became due since the last run.
//!
//! Occurrences live on an interval grid anchored at `start_at`; the cursor
//! `max(last_run_at, start_at)` is mapped back onto that grid before
//! stepping so consecutive runs compute identical instants.

use crate::db::Db;
use crate::models::{EveryUnit, GeneratorResult, RecurringTemplate, TEMPLATE_COLS, WeekParity};
use chrono::{
    DateTime, Datelike, Days, Duration, Months, NaiveDateTime, TimeZone, Timelike, Utc, Weekday,
};
use chrono_tz::Tz;
use rusqlite::{Connection, params};

/// Instances are generated this far ahead of `now`.
pub const GENERATION_HORIZON_DAYS: i64 = 14;

/// Runaway guard for dense schedules (a minute-interval template over the
/// full horizon would otherwise expand to ~20k rows in one request).
pub const MAX_INSTANCES_PER_RUN: i64 = 100;

/// Bound on calendar stepping when catching up a template with
/// day-of-week/hour constraints.
const MAX_CALENDAR_STEPS: usize = 10_000;

pub fn parse_ts(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp {s:?}: {e}"))
}

fn weekday_from_str(s: &str) -> Option<Weekday> {
    match s.to_lowercase().as_str() {
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn allowed_weekdays(t: &RecurringTemplate) -> Vec<Weekday> {
    t.days_of_week
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .filter_map(|d| weekday_from_str(d))
        .collect()
}

fn resolve_local(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>, String> {
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        chrono::LocalResult::Ambiguous(a, _) => Ok(a.with_timezone(&Utc)),
        chrono::LocalResult::None => {
            // Spring-forward gap: the wall time doesn't exist, take the next hour.
            let shifted = naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|d| d.with_timezone(&Utc))
                .ok_or_else(|| format!("unresolvable local time {naive}"))
        }
    }
}

/// Compute the occurrence following cursor `c`:
/// interval step, then day-of-week advance (at most 7 days), then ISO week
/// parity (+7 days on mismatch), then the between-hours window (with
/// wrap-around when start > end).
pub fn next_occurrence(
    c: DateTime<Utc>,
    t: &RecurringTemplate,
    tz: Tz,
) -> Result<DateTime<Utc>, String> {
    let iv = t.every_interval.max(1);
    let stepped = match t.every_unit {
        EveryUnit::Minute => c + Duration::minutes(iv),
        EveryUnit::Hour => c + Duration::hours(iv),
        EveryUnit::Day => c + Duration::days(iv),
        EveryUnit::Week => c + Duration::weeks(iv),
        EveryUnit::Month => {
            let local = c.with_timezone(&tz).naive_local();
            let bumped = local
                .checked_add_months(Months::new(iv as u32))
                .ok_or_else(|| "month step overflow".to_string())?;
            resolve_local(bumped, tz)?
        }
    };

    let mut local = stepped.with_timezone(&tz).naive_local();
    let mut adjusted = false;

    let days = allowed_weekdays(t);
    if !days.is_empty() {
        for _ in 0..7 {
            if days.contains(&local.weekday()) {
                break;
            }
            local += Duration::days(1);
            adjusted = true;
        }
    }

    if t.week_parity != WeekParity::Any {
        let want_odd = t.week_parity == WeekParity::Odd;
        if (local.iso_week().week() % 2 == 1) != want_odd {
            local += Duration::days(7);
            adjusted = true;
        }
    }

    if let (Some(s), Some(e)) = (t.between_hours_start, t.between_hours_end) {
        let h = local.hour() as i64;
        let inside = if s <= e { h >= s && h <= e } else { h >= s || h <= e };
        if !inside {
            // Past the window: shift to the start hour on the next day;
            // before it (or in the wrapped gap): same day.
            let date = if s <= e && h > e {
                local
                    .date()
                    .checked_add_days(Days::new(1))
                    .ok_or_else(|| "date overflow".to_string())?
            } else {
                local.date()
            };
            local = date
                .and_hms_opt(s as u32, 0, 0)
                .ok_or_else(|| format!("invalid between-hours start {s}"))?;
            adjusted = true;
        }
    }

    if adjusted {
        resolve_local(local, tz)
    } else {
        Ok(stepped)
    }
}

/// For fixed-width intervals with no calendar adjustments we can jump the
/// grid to the last point at or before `floor` arithmetically; otherwise
/// the caller steps iteratively from `start`.
fn fast_forward(start: DateTime<Utc>, floor: DateTime<Utc>, t: &RecurringTemplate) -> DateTime<Utc> {
    if floor <= start {
        return start;
    }
    let plain = allowed_weekdays(t).is_empty()
        && t.week_parity == WeekParity::Any
        && (t.between_hours_start.is_none() || t.between_hours_end.is_none());
    let step_secs = match t.every_unit {
        EveryUnit::Minute => 60,
        EveryUnit::Hour => 3600,
        EveryUnit::Day => 86_400,
        EveryUnit::Week => 7 * 86_400,
        EveryUnit::Month => return start,
    } * t.every_interval.max(1);
    if !plain {
        return start;
    }
    let k = (floor - start).num_seconds() / step_secs;
    start + Duration::seconds(k * step_secs)
}

fn generate_for_template(
    conn: &Connection,
    t: &RecurringTemplate,
    now: DateTime<Utc>,
) -> Result<i64, String> {
    let tz: Tz = t
        .timezone
        .parse()
        .map_err(|_| format!("invalid timezone {:?}", t.timezone))?;
    let start = parse_ts(&t.start_at)?;
    if start > now {
        return Ok(0);
    }
    if let Some(end) = t.end_at.as_deref() {
        if parse_ts(end)? < now {
            return Ok(0);
        }
    }

    let floor = match t.last_run_at.as_deref() {
        Some(last) => parse_ts(last)?.max(start),
        None => start,
    };
    let horizon = now + Duration::days(GENERATION_HORIZON_DAYS);

    let mut existing: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM tasks WHERE recurring_template_id = ?1",
            params![&t.id],
            |r| r.get(0),
        )
        .map_err(|e| e.to_string())?;

    let mut c = fast_forward(start, floor, t);
    let mut inserted = 0i64;
    let mut steps = 0usize;
    loop {
        c = next_occurrence(c, t, tz)?;
        steps += 1;
        if steps > MAX_CALENDAR_STEPS {
            return Err("schedule did not converge (too many steps)".to_string());
        }
        if c > horizon {
            break;
        }
        if c <= floor {
            continue;
        }
        if let Some(rc) = t.repeat_count
            && existing >= rc
        {
            break;
        }

        let task_id = uuid::Uuid::new_v4().to_string();
        let sort_key = end_of_queue_key(conn);
        let stamp = Utc::now().to_rfc3339();
        let n = conn
            .execute(
                "INSERT INTO tasks (id, project_id, title, detail, creator_user_id, \
                 assignee_user_id, status, sort_key, created_at, updated_at, \
                 recurring_template_id, recurring_instance_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'queued', ?7, ?8, ?8, ?9, ?10)
                 ON CONFLICT DO NOTHING",
                params![
                    &task_id,
                    &t.project_id,
                    &t.title,
                    &t.detail,
                    &t.owner_user_id,
                    &t.primary_agent,
                    &sort_key,
                    &stamp,
                    &t.id,
                    c.to_rfc3339(),
                ],
            )
            .map_err(|e| e.to_string())?;
        if n > 0 {
            inserted += 1;
            existing += 1;
        }
        if inserted >= MAX_INSTANCES_PER_RUN {
            break;
        }
    }
    Ok(inserted)
}

fn end_of_queue_key(conn: &Connection) -> String {
    let max: Option<String> = conn
        .query_row(
            "SELECT MAX(sort_key) FROM tasks WHERE status = 'queued'",
            [],
            |r| r.get(0),
        )
        .unwrap_or(None);
    crate::ordering::key_between(max.as_deref(), None)
}

/// Run the generator over all enabled templates (or one, when scoped).
/// Per-template failures are collected, not fatal.
pub fn run_generator(db: &Db, template_id: Option<&str>, now: DateTime<Utc>) -> GeneratorResult {
    let conn = db.conn();
    let templates: Vec<RecurringTemplate> = {
        let (sql, args): (String, Vec<String>) = match template_id {
            Some(id) => (
                format!(
                    "SELECT {TEMPLATE_COLS} FROM recurring_templates WHERE enabled = 1 AND id = ?1"
                ),
                vec![id.to_string()],
            ),
            None => (
                format!("SELECT {TEMPLATE_COLS} FROM recurring_templates WHERE enabled = 1"),
                vec![],
            ),
        };
        let mut stmt = match conn.prepare(&sql) {
            Ok(s) => s,
            Err(e) => {
                return GeneratorResult {
                    generated: 0,
                    errors: vec![e.to_string()],
                };
            }
        };
        let params_refs: Vec<&dyn rusqlite::types::ToSql> = args
            .iter()
            .map(|v| v as &dyn rusqlite::types::ToSql)
            .collect();
        match stmt.query_map(params_refs.as_slice(), |row| RecurringTemplate::from_row(row)) {
            Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
            Err(e) => {
                return GeneratorResult {
                    generated: 0,
                    errors: vec![e.to_string()],
                };
            }
        }
    };

    let mut result = GeneratorResult {
        generated: 0,
        errors: Vec::new(),
    };
    for t in templates {
        match generate_for_template(&conn, &t, now) {
            Ok(n) => {
                result.generated += n;
                conn.execute(
                    "UPDATE recurring_templates SET last_run_at = ?1 WHERE id = ?2",
                    params![now.to_rfc3339(), &t.id],
                )
                .ok();
            }
            Err(e) => result.errors.push(format!("{}: {e}", t.id)),
        }
    }
    result
}
