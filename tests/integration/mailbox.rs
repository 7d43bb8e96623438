use crate::common::{auth, send_message, test_client};
use rocket::http::{ContentType, Status};

#[test]
fn test_send_and_list() {
    let client = test_client();
    let msg = send_message(&client, "chris", "clio", r#"{"title": "hello", "body": "world"}"#);
    assert_eq!(msg["recipient"], "clio");
    assert_eq!(msg["sender"], "chris");
    assert_eq!(msg["status"], "unread");
    assert_eq!(msg["urgent"], false);
    // 64-bit ids cross the wire as decimal strings
    assert!(msg["id"].is_string());

    let res = client
        .get("/mailboxes/me/messages")
        .header(auth("clio"))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["title"], "hello");
}

#[test]
fn test_dedupe_key_makes_send_idempotent() {
    let client = test_client();
    let first = send_message(
        &client,
        "chris",
        "clio",
        r#"{"title": "ping", "dedupeKey": "k1"}"#,
    );
    let second = send_message(
        &client,
        "chris",
        "clio",
        r#"{"title": "ping", "dedupeKey": "k1"}"#,
    );
    assert_eq!(first["id"], second["id"]);

    let res = client
        .get("/mailboxes/me/messages?status=unread")
        .header(auth("clio"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
}

#[test]
fn test_same_dedupe_key_different_pair_is_distinct() {
    let client = test_client();
    let a = send_message(&client, "chris", "clio", r#"{"title": "a", "dedupeKey": "k"}"#);
    let b = send_message(&client, "clio", "chris", r#"{"title": "b", "dedupeKey": "k"}"#);
    assert_ne!(a["id"], b["id"]);
}

#[test]
fn test_send_empty_title_rejected() {
    let client = test_client();
    let res = client
        .post("/mailboxes/clio/messages")
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(r#"{"title": ""}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn test_send_to_me_rejected() {
    let client = test_client();
    let res = client
        .post("/mailboxes/me/messages")
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(r#"{"title": "hi"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn test_send_to_unknown_user_rejected() {
    let client = test_client();
    let res = client
        .post("/mailboxes/stranger/messages")
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(r#"{"title": "hi"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn test_get_message_scoped_to_recipient() {
    let client = test_client();
    let msg = send_message(&client, "chris", "clio", r#"{"title": "private"}"#);
    let id = msg["id"].as_str().unwrap();

    let res = client
        .get(format!("/mailboxes/me/messages/{id}"))
        .header(auth("clio"))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["message"]["title"], "private");
    // Reading does not ack
    assert_eq!(body["message"]["status"], "unread");

    // The sender is not the recipient: unified 404
    let res = client
        .get(format!("/mailboxes/me/messages/{id}"))
        .header(auth("chris"))
        .dispatch();
    assert_eq!(res.status(), Status::NotFound);
}

#[test]
fn test_list_newest_first_with_cursor() {
    let client = test_client();
    for i in 0..5 {
        send_message(&client, "chris", "clio", &format!(r#"{{"title": "m{i}"}}"#));
    }

    let res = client
        .get("/mailboxes/me/messages?limit=2")
        .header(auth("clio"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["title"], "m4");
    assert_eq!(messages[1]["title"], "m3");
    let cursor = body["nextCursor"].as_str().unwrap().to_string();

    let res = client
        .get(format!("/mailboxes/me/messages?limit=2&cursor={cursor}"))
        .header(auth("clio"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages[0]["title"], "m2");
    assert_eq!(messages[1]["title"], "m1");
}

#[test]
fn test_list_since_id_catches_up() {
    let client = test_client();
    let first = send_message(&client, "chris", "clio", r#"{"title": "old"}"#);
    send_message(&client, "chris", "clio", r#"{"title": "new"}"#);

    let since = first["id"].as_str().unwrap();
    let res = client
        .get(format!("/mailboxes/me/messages?sinceId={since}"))
        .header(auth("clio"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["title"], "new");
}

#[test]
fn test_list_invalid_status_rejected() {
    let client = test_client();
    let res = client
        .get("/mailboxes/me/messages?status=bogus")
        .header(auth("clio"))
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn test_urgent_and_metadata_round_trip() {
    let client = test_client();
    let msg = send_message(
        &client,
        "chris",
        "clio",
        r#"{"title": "alert", "urgent": true, "metadata": {"source": "ci"}}"#,
    );
    assert_eq!(msg["urgent"], true);
    assert_eq!(msg["metadata"]["source"], "ci");
}
