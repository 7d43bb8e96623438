use crate::common::{auth, test_client};
use rocket::http::{ContentType, Header, Status};

#[test]
fn test_missing_token_is_401() {
    let client = test_client();
    let res = client.get("/mailboxes/me/messages").dispatch();
    assert_eq!(res.status(), Status::Unauthorized);
    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["error"].is_string());
}

#[test]
fn test_unknown_token_is_401() {
    let client = test_client();
    let res = client
        .get("/mailboxes/me/messages")
        .header(Header::new("Authorization", "Bearer nope"))
        .dispatch();
    assert_eq!(res.status(), Status::Unauthorized);
}

#[test]
fn test_malformed_json_is_400() {
    let client = test_client();
    let res = client
        .post("/mailboxes/clio/messages")
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body("{definitely not json")
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn test_unknown_route_is_json_404() {
    let client = test_client();
    let res = client.get("/no/such/route").header(auth("chris")).dispatch();
    assert_eq!(res.status(), Status::NotFound);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["error"], "Not found");
}

#[test]
fn test_invalid_enum_is_400() {
    let client = test_client();
    let res = client
        .post("/swarm/tasks")
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(r#"{"title": "t", "status": "paused"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn test_healthz_needs_no_auth() {
    let client = test_client();
    let res = client.get("/healthz").dispatch();
    assert_eq!(res.status(), Status::Ok);
}
