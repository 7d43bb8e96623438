use crate::config::Config;
use crate::db::Db;
use crate::presence::{self, PresenceTracker};
use rocket::serde::json::Json;
use rocket::{State, get};

use super::AuthUser;

/// Snapshot of who is live right now. Counts are redacted the same way
/// the push streams redact them: admins see everyone's, others only
/// their own.
#[get("/presence")]
pub fn get_presence(
    auth: AuthUser,
    db: &State<Db>,
    tracker: &State<PresenceTracker>,
    config: &State<Config>,
) -> Json<serde_json::Value> {
    let infos = presence::snapshot(&db.conn(), tracker, &config.roster);
    let infos = presence::redact_for(&auth.0.user, auth.0.admin, &infos);
    Json(serde_json::json!({ "presence": infos }))
}
