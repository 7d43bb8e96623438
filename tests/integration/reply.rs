use crate::common::{auth, send_message, test_client};
use rocket::http::{ContentType, Status};

#[test]
fn test_reply_threads_back_to_sender() {
    let client = test_client();
    let original = send_message(&client, "chris", "clio", r#"{"title": "hello"}"#);
    let id = original["id"].as_str().unwrap();
    assert!(original.get("threadId").is_none());

    let res = client
        .post(format!("/mailboxes/me/messages/{id}/reply"))
        .header(ContentType::JSON)
        .header(auth("clio"))
        .body(r#"{"body": "hi"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Created);
    let body: serde_json::Value = res.into_json().unwrap();
    let reply = &body["message"];
    assert_eq!(reply["recipient"], "chris");
    assert_eq!(reply["sender"], "clio");
    assert_eq!(reply["title"], "Re: hello");
    // Thread id falls back to the original's id, stringified
    assert_eq!(reply["threadId"], *id);
    assert_eq!(reply["replyToMessageId"], *id);
}

#[test]
fn test_reply_reuses_existing_thread_id() {
    let client = test_client();
    let original = send_message(
        &client,
        "chris",
        "clio",
        r#"{"title": "topic", "threadId": "release-42"}"#,
    );
    let id = original["id"].as_str().unwrap();

    let res = client
        .post(format!("/mailboxes/me/messages/{id}/reply"))
        .header(ContentType::JSON)
        .header(auth("clio"))
        .body(r#"{"body": "ack"}"#)
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["message"]["threadId"], "release-42");
}

#[test]
fn test_reply_with_explicit_title() {
    let client = test_client();
    let original = send_message(&client, "chris", "clio", r#"{"title": "hello"}"#);
    let id = original["id"].as_str().unwrap();

    let res = client
        .post(format!("/mailboxes/me/messages/{id}/reply"))
        .header(ContentType::JSON)
        .header(auth("clio"))
        .body(r#"{"title": "custom subject"}"#)
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["message"]["title"], "custom subject");
}

#[test]
fn test_reply_requires_title_or_body() {
    let client = test_client();
    let original = send_message(&client, "chris", "clio", r#"{"title": "hello"}"#);
    let id = original["id"].as_str().unwrap();

    let res = client
        .post(format!("/mailboxes/me/messages/{id}/reply"))
        .header(ContentType::JSON)
        .header(auth("clio"))
        .body("{}")
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn test_reply_to_foreign_message_is_404() {
    let client = test_client();
    let original = send_message(&client, "chris", "clio", r#"{"title": "hello"}"#);
    let id = original["id"].as_str().unwrap();

    // chris is the sender, not the recipient, so they cannot reply to it
    let res = client
        .post(format!("/mailboxes/me/messages/{id}/reply"))
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(r#"{"body": "me again"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::NotFound);
}
