use crate::common::test_client;
use rocket::http::Status;

#[test]
fn test_healthz() {
    let client = test_client();
    let res = client.get("/healthz").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["status"], "ok");
}

#[test]
fn test_readyz_reports_db() {
    let client = test_client();
    let res = client.get("/readyz").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db"], true);
}

#[test]
fn test_api_prefix_is_equivalent() {
    let client = test_client();
    let res = client.get("/api/healthz").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["status"], "ok");
}
