// Route module decomposition — each domain area in its own file.
// Shared types (request guard, error helpers, catchers) live here; route
// functions in submodules.

mod broadcast;
mod mailbox;
mod presence_routes;
mod projects;
mod recurring;
mod search;
mod stream;
mod system;
mod tasks;
mod waiting;

// --- Re-exports (all route functions used by lib.rs mount) ---

pub use broadcast::{
    buzz_tail, create_webhook, delete_webhook, disable_webhook, enable_webhook, get_webhook,
    ingest, list_events, list_webhooks,
};
pub use mailbox::{
    ack_message, batch_ack, get_message, list_messages, reply_message, send_message,
};
pub use presence_routes::get_presence;
pub use projects::{
    archive_project, create_project, get_project, list_projects, unarchive_project,
    update_project,
};
pub use recurring::{
    create_template, delete_template, disable_template, enable_template, get_template,
    list_templates, run_recurring, update_template,
};
pub use search::search_messages;
pub use stream::{buzz_stream, mailbox_stream, ui_stream};
pub use system::{
    bad_request, forbidden, healthz, internal_error, not_found, payload_too_large, readyz,
    unauthorized, unprocessable,
};
pub use tasks::{
    claim_task, create_task, get_task, list_task_events, list_tasks, reorder_task,
    set_task_status, update_task,
};
pub use waiting::{
    clear_waiting, list_waiting, list_waiting_on_others, mark_waiting, waiting_counts,
};

// --- Shared error shape ---

use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::serde::json::Json;

pub type ApiError = (Status, Json<serde_json::Value>);

pub fn err(status: Status, msg: &str) -> ApiError {
    (status, Json(serde_json::json!({ "error": msg })))
}

pub fn internal(e: impl std::fmt::Display) -> ApiError {
    err(Status::InternalServerError, &e.to_string())
}

// --- Auth guard ---

/// Bearer-token identity. Successful authentication records API activity
/// into the presence tracker as a side effect; failure there is ignored
/// (presence is best-effort).
pub struct AuthUser(pub crate::config::Identity);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = req
            .headers()
            .get_one("Authorization")
            .and_then(|a| a.strip_prefix("Bearer "))
            .map(str::trim);
        let Some(token) = token else {
            return Outcome::Error((Status::Unauthorized, ()));
        };
        let Some(config) = req.rocket().state::<crate::config::Config>() else {
            return Outcome::Error((Status::InternalServerError, ()));
        };
        let Some(identity) = config.tokens.get(token) else {
            return Outcome::Error((Status::Unauthorized, ()));
        };
        if let (Some(db), Some(events), Some(tracker)) = (
            req.rocket().state::<crate::db::Db>(),
            req.rocket().state::<crate::events::EventBus>(),
            req.rocket().state::<crate::presence::PresenceTracker>(),
        ) {
            crate::presence::note_api_activity(db, tracker, events, &config.roster, &identity.user);
        }
        Outcome::Success(AuthUser(identity.clone()))
    }
}
