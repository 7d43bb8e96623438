use crate::db::Db;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, get};

#[get("/healthz")]
pub fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[get("/readyz")]
pub fn readyz(db: &State<Db>) -> (Status, Json<serde_json::Value>) {
    let ok = db
        .conn()
        .query_row("SELECT 1", [], |r| r.get::<_, i64>(0))
        .is_ok();
    if ok {
        (Status::Ok, Json(serde_json::json!({ "status": "ok", "db": true })))
    } else {
        (
            Status::ServiceUnavailable,
            Json(serde_json::json!({ "status": "error", "db": false })),
        )
    }
}

// --- Catchers: keep framework-level failures on the {"error": ...} envelope ---

#[rocket::catch(400)]
pub fn bad_request() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": "Bad request" }))
}

#[rocket::catch(401)]
pub fn unauthorized() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": "Unauthorized" }))
}

#[rocket::catch(403)]
pub fn forbidden() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": "Forbidden" }))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": "Not found" }))
}

#[rocket::catch(413)]
pub fn payload_too_large() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": "Payload too large" }))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": "Invalid request body" }))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": "Internal server error" }))
}
