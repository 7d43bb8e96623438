use crate::common::{auth, send_message, test_client};
use rocket::http::{ContentType, Status};

#[test]
fn test_ack_sets_viewed_at_once() {
    let client = test_client();
    let msg = send_message(&client, "chris", "clio", r#"{"title": "read me"}"#);
    let id = msg["id"].as_str().unwrap();
    assert!(msg.get("viewedAt").is_none());

    let res = client
        .post(format!("/mailboxes/me/messages/{id}/ack"))
        .header(auth("clio"))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["message"]["status"], "read");
    let viewed = body["message"]["viewedAt"].as_str().unwrap().to_string();

    // Re-ack is an idempotent no-op returning the same terminal row
    let res = client
        .post(format!("/mailboxes/me/messages/{id}/ack"))
        .header(auth("clio"))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["message"]["status"], "read");
    assert_eq!(body["message"]["viewedAt"], viewed.as_str());
}

#[test]
fn test_ack_of_other_users_message_is_404() {
    let client = test_client();
    let msg = send_message(&client, "chris", "clio", r#"{"title": "not yours"}"#);
    let id = msg["id"].as_str().unwrap();

    let res = client
        .post(format!("/mailboxes/me/messages/{id}/ack"))
        .header(auth("chris"))
        .dispatch();
    assert_eq!(res.status(), Status::NotFound);
}

#[test]
fn test_batch_ack_splits_success_and_not_found() {
    let client = test_client();
    let m1 = send_message(&client, "chris", "clio", r#"{"title": "one"}"#);
    let m2 = send_message(&client, "chris", "clio", r#"{"title": "two"}"#);
    let m3 = send_message(&client, "chris", "clio", r#"{"title": "three"}"#);
    // This one belongs to chris, not clio
    let foreign = send_message(&client, "clio", "chris", r#"{"title": "other inbox"}"#);

    let ids: Vec<String> = [&m1, &m2, &m3, &foreign]
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect();
    let payload = serde_json::json!({ "ids": [ids[0], ids[1], ids[2], ids[3], "99999"] });

    let res = client
        .post("/mailboxes/me/messages/ack")
        .header(ContentType::JSON)
        .header(auth("clio"))
        .body(payload.to_string())
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    let success: Vec<&str> = body["success"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    let not_found: Vec<&str> = body["notFound"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(success, vec![ids[0].as_str(), ids[1].as_str(), ids[2].as_str()]);
    assert_eq!(not_found, vec![ids[3].as_str(), "99999"]);

    // Second identical call: everything is already read or not owned
    let res = client
        .post("/mailboxes/me/messages/ack")
        .header(ContentType::JSON)
        .header(auth("clio"))
        .body(payload.to_string())
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["success"].as_array().unwrap().is_empty());
    assert_eq!(body["notFound"].as_array().unwrap().len(), 5);
}

#[test]
fn test_batch_ack_requires_ids() {
    let client = test_client();
    let res = client
        .post("/mailboxes/me/messages/ack")
        .header(ContentType::JSON)
        .header(auth("clio"))
        .body("{}")
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}
