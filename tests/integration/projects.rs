use crate::common::{auth, test_client};
use rocket::http::{ContentType, Status};

fn create_project(client: &rocket::local::blocking::Client) -> serde_json::Value {
    let res = client
        .post("/swarm/projects")
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(
            r##"{"title": "Hive", "color": "#aabb01",
                "projectLeadUserId": "chris", "developerLeadUserId": "clio"}"##,
        )
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let v: serde_json::Value = res.into_json().unwrap();
    v["project"].clone()
}

#[test]
fn test_create_project_requires_color_and_leads() {
    let client = test_client();
    let res = client
        .post("/swarm/projects")
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(r#"{"title": "p", "color": "red", "projectLeadUserId": "chris", "developerLeadUserId": "clio"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);

    let res = client
        .post("/swarm/projects")
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(r##"{"title": "p", "color": "#aabbcc"}"##)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);

    let project = create_project(&client);
    assert_eq!(project["color"], "#aabb01");
    assert_eq!(project["projectLeadUserId"], "chris");
}

#[test]
fn test_archive_hides_from_default_listing() {
    let client = test_client();
    let project = create_project(&client);
    let id = project["id"].as_str().unwrap();

    let res = client.get("/swarm/projects").header(auth("clio")).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["projects"].as_array().unwrap().len(), 1);

    let res = client
        .post(format!("/swarm/projects/{id}/archive"))
        .header(auth("chris"))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["project"]["archivedAt"].is_string());

    let res = client.get("/swarm/projects").header(auth("clio")).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["projects"].as_array().unwrap().is_empty());

    let res = client
        .get("/swarm/projects?archived=true")
        .header(auth("clio"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["projects"].as_array().unwrap().len(), 1);

    // Unarchive restores it
    let res = client
        .delete(format!("/swarm/projects/{id}/archive"))
        .header(auth("chris"))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let res = client.get("/swarm/projects").header(auth("clio")).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["projects"].as_array().unwrap().len(), 1);
}

#[test]
fn test_patch_project_fields() {
    let client = test_client();
    let project = create_project(&client);
    let id = project["id"].as_str().unwrap();

    let res = client
        .patch(format!("/swarm/projects/{id}"))
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(r#"{"description": "the team server", "onedevUrl": "https://dev.example/hive"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["project"]["description"], "the team server");
    assert_eq!(body["project"]["onedevUrl"], "https://dev.example/hive");

    let res = client
        .patch(format!("/swarm/projects/{id}"))
        .header(ContentType::JSON)
        .header(auth("chris"))
        .body(r#"{"color": "zzz"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn test_project_mutations_land_in_buzz() {
    let client = test_client();
    create_project(&client);
    let res = client
        .get("/buzz?app=swarm")
        .header(auth("nova"))
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["appName"], "swarm");
    assert_eq!(events[0]["bodyJson"]["eventType"], "swarm.project.created");
    assert!(events[0]["title"].as_str().unwrap().contains("created project"));
}
