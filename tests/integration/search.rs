use crate::common::{auth, send_message, test_client};
use rocket::http::Status;

#[test]
fn test_search_matches_title_and_body() {
    let client = test_client();
    send_message(&client, "chris", "clio", r#"{"title": "deploy finished"}"#);
    send_message(
        &client,
        "chris",
        "clio",
        r#"{"title": "note", "body": "the deploy failed at step 3"}"#,
    );
    send_message(&client, "chris", "clio", r#"{"title": "lunch plans"}"#);

    let res = client
        .get("/mailboxes/me/messages/search?q=deploy")
        .header(auth("clio"))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
}

#[test]
fn test_search_is_scoped_to_viewer() {
    let client = test_client();
    send_message(&client, "chris", "clio", r#"{"title": "secret plans"}"#);

    let res = client
        .get("/mailboxes/me/messages/search?q=secret")
        .header(auth("chris"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["messages"].as_array().unwrap().is_empty());
}

#[test]
fn test_search_empty_query_rejected() {
    let client = test_client();
    let res = client
        .get("/mailboxes/me/messages/search?q=")
        .header(auth("clio"))
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn test_search_created_at_filters() {
    let client = test_client();
    send_message(&client, "chris", "clio", r#"{"title": "findable"}"#);

    let res = client
        .get("/mailboxes/me/messages/search?q=findable&from=2099-01-01T00:00:00Z")
        .header(auth("clio"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["messages"].as_array().unwrap().is_empty());

    let res = client
        .get("/mailboxes/me/messages/search?q=findable&to=2099-01-01T00:00:00Z")
        .header(auth("clio"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
}
