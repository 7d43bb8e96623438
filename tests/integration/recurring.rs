use crate::common::{auth, test_client};
use chrono::{Duration, Utc};
use rocket::http::{ContentType, Status};

fn create_template(client: &rocket::local::blocking::Client, body: &str) -> serde_json::Value {
    let res = client
        .post("/swarm/recurring/templates")
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(body.to_string())
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let v: serde_json::Value = res.into_json().unwrap();
    v["template"].clone()
}

fn run(client: &rocket::local::blocking::Client, scope: Option<&str>) -> serde_json::Value {
    let path = match scope {
        Some(id) => format!("/swarm/recurring/run?templateId={id}"),
        None => "/swarm/recurring/run".to_string(),
    };
    let res = client.post(path).header(auth("chris")).dispatch();
    assert_eq!(res.status(), Status::Ok);
    res.into_json().unwrap()
}

#[test]
fn test_template_validation() {
    let client = test_client();
    // Missing startAt
    let res = client
        .post("/swarm/recurring/templates")
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(r#"{"title": "t"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);

    // Bad timezone
    let res = client
        .post("/swarm/recurring/templates")
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(r#"{"title": "t", "startAt": "2026-01-01T08:00:00Z", "timezone": "Mars/Olympus"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);

    // Bad weekday
    let res = client
        .post("/swarm/recurring/templates")
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(r#"{"title": "t", "startAt": "2026-01-01T08:00:00Z", "daysOfWeek": ["funday"]}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);

    let template = create_template(
        &client,
        r#"{"title": "standup", "startAt": "2026-01-01T08:00:00Z",
            "everyUnit": "day", "primaryAgent": "clio", "timezone": "Europe/Berlin"}"#,
    );
    assert_eq!(template["enabled"], true);
    assert_eq!(template["everyInterval"], 1);
    assert_eq!(template["weekParity"], "any");
    assert_eq!(template["ownerUserId"], "chris");
}

#[test]
fn test_daily_generator_fills_horizon_then_is_idempotent() {
    let client = test_client();
    // Daily schedule that started 23 hours ago: 14 occurrences fall inside
    // the 14-day horizon, the first due in one hour.
    let start = (Utc::now() - Duration::hours(23)).to_rfc3339();
    let template = create_template(&client, &format!(
        r#"{{"title": "standup", "startAt": "{start}", "everyUnit": "day", "primaryAgent": "clio"}}"#
    ));
    let id = template["id"].as_str().unwrap();

    let result = run(&client, None);
    assert_eq!(result["generated"], 14);
    assert!(result["errors"].as_array().unwrap().is_empty());

    // Re-running immediately finds nothing new to do
    let result = run(&client, None);
    assert_eq!(result["generated"], 0);

    // Instances are queued tasks assigned to the primary agent
    let res = client
        .get("/swarm/tasks?assignee=clio&status=queued")
        .header(auth("chris"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 14);
    assert_eq!(tasks[0]["recurringTemplateId"], *id);
    assert_eq!(tasks[0]["creatorUserId"], "chris");
    assert!(tasks[0]["recurringInstanceAt"].is_string());
}

#[test]
fn test_repeat_count_caps_instances() {
    let client = test_client();
    let start = (Utc::now() - Duration::hours(23)).to_rfc3339();
    create_template(&client, &format!(
        r#"{{"title": "limited", "startAt": "{start}", "everyUnit": "day", "repeatCount": 3}}"#
    ));

    let result = run(&client, None);
    assert_eq!(result["generated"], 3);
    let result = run(&client, None);
    assert_eq!(result["generated"], 0);
}

#[test]
fn test_future_start_generates_nothing_yet() {
    let client = test_client();
    let start = (Utc::now() + Duration::days(30)).to_rfc3339();
    create_template(&client, &format!(
        r#"{{"title": "later", "startAt": "{start}", "everyUnit": "day"}}"#
    ));
    let result = run(&client, None);
    assert_eq!(result["generated"], 0);
}

#[test]
fn test_disabled_templates_are_skipped() {
    let client = test_client();
    let start = (Utc::now() - Duration::hours(23)).to_rfc3339();
    let template = create_template(&client, &format!(
        r#"{{"title": "paused", "startAt": "{start}", "everyUnit": "day"}}"#
    ));
    let id = template["id"].as_str().unwrap();

    client
        .post(format!("/swarm/recurring/templates/{id}/disable"))
        .header(auth("chris"))
        .dispatch();
    let result = run(&client, None);
    assert_eq!(result["generated"], 0);

    client
        .post(format!("/swarm/recurring/templates/{id}/enable"))
        .header(auth("chris"))
        .dispatch();
    let result = run(&client, Some(id));
    assert_eq!(result["generated"], 14);
}

#[test]
fn test_scoped_run_touches_only_one_template() {
    let client = test_client();
    let start = (Utc::now() - Duration::hours(23)).to_rfc3339();
    let a = create_template(&client, &format!(
        r#"{{"title": "a", "startAt": "{start}", "everyUnit": "day"}}"#
    ));
    create_template(&client, &format!(
        r#"{{"title": "b", "startAt": "{start}", "everyUnit": "day"}}"#
    ));

    let result = run(&client, Some(a["id"].as_str().unwrap()));
    assert_eq!(result["generated"], 14);
    // The other template is still pending in a full run
    let result = run(&client, None);
    assert_eq!(result["generated"], 14);
}

#[test]
fn test_template_crud() {
    let client = test_client();
    let template = create_template(
        &client,
        r#"{"title": "weekly", "startAt": "2026-01-05T09:00:00Z", "everyUnit": "week"}"#,
    );
    let id = template["id"].as_str().unwrap();

    let res = client
        .patch(format!("/swarm/recurring/templates/{id}"))
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(r#"{"title": "weekly sync", "everyInterval": 2, "weekParity": "odd"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["template"]["title"], "weekly sync");
    assert_eq!(body["template"]["everyInterval"], 2);
    assert_eq!(body["template"]["weekParity"], "odd");

    let res = client
        .get("/swarm/recurring/templates")
        .header(auth("clio"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["templates"].as_array().unwrap().len(), 1);

    let res = client
        .delete(format!("/swarm/recurring/templates/{id}"))
        .header(auth("chris"))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let res = client
        .get(format!("/swarm/recurring/templates/{id}"))
        .header(auth("chris"))
        .dispatch();
    assert_eq!(res.status(), Status::NotFound);
}
