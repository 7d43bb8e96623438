use crate::common::{auth, test_client};
use rocket::http::{ContentType, Status};

fn make_hook(client: &rocket::local::blocking::Client) -> (String, String) {
    let res = client
        .post("/broadcast/webhooks")
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(r#"{"appName": "ci", "title": "CI"}"#)
        .dispatch();
    let v: serde_json::Value = res.into_json().unwrap();
    (
        v["webhook"]["id"].as_str().unwrap().to_string(),
        v["webhook"]["token"].as_str().unwrap().to_string(),
    )
}

#[test]
fn test_ingest_requires_no_auth() {
    let client = test_client();
    let (_, token) = make_hook(&client);
    let res = client
        .post(format!("/ingest/ci/{token}"))
        .header(ContentType::Text)
        .body("hello")
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["ok"], true);
}

#[test]
fn test_ingest_json_body_is_parsed() {
    let client = test_client();
    let (_, token) = make_hook(&client);
    client
        .post(format!("/ingest/ci/{token}"))
        .header(ContentType::JSON)
        .body(r#"{"build": 17, "ok": true}"#)
        .dispatch();

    let res = client.get("/broadcast/events").header(auth("clio")).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let event = &body["events"][0];
    assert_eq!(event["bodyJson"]["build"], 17);
    assert!(event.get("bodyText").is_none());
}

#[test]
fn test_ingest_invalid_json_falls_back_to_text() {
    let client = test_client();
    let (_, token) = make_hook(&client);
    client
        .post(format!("/ingest/ci/{token}"))
        .header(ContentType::JSON)
        .body("{not json")
        .dispatch();

    let res = client.get("/broadcast/events").header(auth("clio")).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let event = &body["events"][0];
    assert_eq!(event["bodyText"], "{not json");
    assert!(event.get("bodyJson").is_none());
}

#[test]
fn test_ingest_unknown_token_is_404() {
    let client = test_client();
    make_hook(&client);
    let res = client
        .post("/ingest/ci/00000000000000")
        .header(ContentType::Text)
        .body("x")
        .dispatch();
    assert_eq!(res.status(), Status::NotFound);
}

#[test]
fn test_ingest_disabled_webhook_is_404_too() {
    let client = test_client();
    let (id, token) = make_hook(&client);
    client
        .post(format!("/broadcast/webhooks/{id}/disable"))
        .header(auth("chris"))
        .dispatch();

    let res = client
        .post(format!("/ingest/ci/{token}"))
        .header(ContentType::Text)
        .body("x")
        .dispatch();
    // Indistinguishable from a missing webhook
    assert_eq!(res.status(), Status::NotFound);
}

#[test]
fn test_ingest_body_size_cap() {
    let client = test_client();
    let (_, token) = make_hook(&client);

    // Exactly 256 KiB is accepted
    let exact = "x".repeat(256 * 1024);
    let res = client
        .post(format!("/ingest/ci/{token}"))
        .header(ContentType::Text)
        .body(exact)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);

    // One byte over is rejected
    let over = "x".repeat(256 * 1024 + 1);
    let res = client
        .post(format!("/ingest/ci/{token}"))
        .header(ContentType::Text)
        .body(over)
        .dispatch();
    assert_eq!(res.status(), Status::PayloadTooLarge);
}
