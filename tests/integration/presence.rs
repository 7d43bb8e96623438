use crate::common::{auth, send_message, test_client};
use rocket::http::Status;

#[test]
fn test_api_activity_marks_user_online() {
    let client = test_client();
    // Any authenticated call records activity; this one is clio's first.
    client
        .get("/mailboxes/me/messages")
        .header(auth("clio"))
        .dispatch();

    let res = client.get("/presence").header(auth("clio")).dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    let infos = body["presence"].as_array().unwrap();
    // Full roster, one row per user
    assert_eq!(infos.len(), 3);
    let clio = infos.iter().find(|p| p["user"] == "clio").unwrap();
    assert_eq!(clio["online"], true);
}

#[test]
fn test_counts_redacted_for_non_admin() {
    let client = test_client();
    send_message(&client, "chris", "clio", r#"{"title": "one"}"#);
    send_message(&client, "chris", "clio", r#"{"title": "two"}"#);

    // clio sees their own unread count
    let res = client.get("/presence").header(auth("clio")).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let clio = body["presence"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["user"] == "clio")
        .unwrap()
        .clone();
    assert_eq!(clio["unread"], 2);

    // chris sees zeros on clio's row
    let res = client.get("/presence").header(auth("chris")).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let clio = body["presence"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["user"] == "clio")
        .unwrap()
        .clone();
    assert_eq!(clio["unread"], 0);

    // The admin sees real counts for everyone
    let res = client.get("/presence").header(auth("nova")).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let clio = body["presence"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["user"] == "clio")
        .unwrap()
        .clone();
    assert_eq!(clio["unread"], 2);
}

#[test]
fn test_waiting_counts_surface_in_presence() {
    let client = test_client();
    let msg = send_message(&client, "chris", "clio", r#"{"title": "q"}"#);
    let id = msg["id"].as_str().unwrap();
    client
        .post(format!("/mailboxes/me/messages/{id}/waiting"))
        .header(auth("clio"))
        .dispatch();

    let res = client.get("/presence").header(auth("nova")).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let clio = body["presence"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["user"] == "clio")
        .unwrap()
        .clone();
    assert_eq!(clio["waiting"], 1);
}
