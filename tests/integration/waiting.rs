use crate::common::{auth, send_message, test_client};
use rocket::http::Status;

#[test]
fn test_waiting_flag_lifecycle() {
    let client = test_client();
    let msg = send_message(&client, "chris", "clio", r#"{"title": "need an answer"}"#);
    let id = msg["id"].as_str().unwrap();

    // The recipient promises to respond
    let res = client
        .post(format!("/mailboxes/me/messages/{id}/waiting"))
        .header(auth("clio"))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["message"]["responseWaiting"], true);
    assert_eq!(body["message"]["waitingResponder"], "clio");
    assert!(body["message"]["waitingSince"].is_string());

    // The sender sees it under waiting-on-others
    let res = client
        .get("/mailboxes/me/waiting-on-others")
        .header(auth("chris"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["messages"][0]["id"], *id);

    // The responder sees it under their own waiting list
    let res = client
        .get("/mailboxes/me/waiting")
        .header(auth("clio"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["count"], 1);

    // Only the responder may clear
    let res = client
        .delete(format!("/mailboxes/me/messages/{id}/waiting"))
        .header(auth("chris"))
        .dispatch();
    assert_eq!(res.status(), Status::Forbidden);

    let res = client
        .delete(format!("/mailboxes/me/messages/{id}/waiting"))
        .header(auth("clio"))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["message"]["responseWaiting"], false);
    assert!(body["message"].get("waitingResponder").is_none());
    assert!(body["message"].get("waitingSince").is_none());
}

#[test]
fn test_only_recipient_may_mark_waiting() {
    let client = test_client();
    let msg = send_message(&client, "chris", "clio", r#"{"title": "q"}"#);
    let id = msg["id"].as_str().unwrap();

    let res = client
        .post(format!("/mailboxes/me/messages/{id}/waiting"))
        .header(auth("chris"))
        .dispatch();
    assert_eq!(res.status(), Status::NotFound);
}

#[test]
fn test_clear_without_flag_is_rejected() {
    let client = test_client();
    let msg = send_message(&client, "chris", "clio", r#"{"title": "q"}"#);
    let id = msg["id"].as_str().unwrap();

    let res = client
        .delete(format!("/mailboxes/me/messages/{id}/waiting"))
        .header(auth("clio"))
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn test_waiting_is_independent_of_read_state() {
    let client = test_client();
    let msg = send_message(&client, "chris", "clio", r#"{"title": "q"}"#);
    let id = msg["id"].as_str().unwrap();

    client
        .post(format!("/mailboxes/me/messages/{id}/ack"))
        .header(auth("clio"))
        .dispatch();
    let res = client
        .post(format!("/mailboxes/me/messages/{id}/waiting"))
        .header(auth("clio"))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["message"]["status"], "read");
    assert_eq!(body["message"]["responseWaiting"], true);
}

#[test]
fn test_waiting_counts_per_user() {
    let client = test_client();
    for i in 0..2 {
        let msg = send_message(&client, "chris", "clio", &format!(r#"{{"title": "q{i}"}}"#));
        let id = msg["id"].as_str().unwrap();
        client
            .post(format!("/mailboxes/me/messages/{id}/waiting"))
            .header(auth("clio"))
            .dispatch();
    }

    let res = client.get("/waiting/counts").header(auth("chris")).dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["counts"]["clio"], 2);
    assert_eq!(body["counts"]["chris"], 0);
}
