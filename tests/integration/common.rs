use hive::config::{Config, Identity};
use rocket::http::{ContentType, Header};
use rocket::local::blocking::Client;
use std::collections::HashMap;

/// Wrapper around Client that auto-deletes the temp DB on drop.
/// Uses Option<Client> so we can drop the DB connection before deleting
/// the file (WAL mode holds it open).
pub struct TestClient {
    client: Option<Client>,
    db_path: String,
}

impl Drop for TestClient {
    fn drop(&mut self) {
        drop(self.client.take());
        let _ = std::fs::remove_file(&self.db_path);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_path));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_path));
    }
}

impl std::ops::Deref for TestClient {
    type Target = Client;
    fn deref(&self) -> &Client {
        self.client.as_ref().unwrap()
    }
}

/// Fixed test roster: chris and clio are regular users, nova is admin.
fn test_config() -> Config {
    let mut tokens = HashMap::new();
    tokens.insert(
        "tok-chris".to_string(),
        Identity {
            user: "chris".to_string(),
            admin: false,
        },
    );
    tokens.insert(
        "tok-clio".to_string(),
        Identity {
            user: "clio".to_string(),
            admin: false,
        },
    );
    tokens.insert(
        "tok-nova".to_string(),
        Identity {
            user: "nova".to_string(),
            admin: true,
        },
    );
    let mut ui_keys = HashMap::new();
    ui_keys.insert(
        "ui-chris".to_string(),
        Identity {
            user: "chris".to_string(),
            admin: false,
        },
    );
    Config::new(tokens, ui_keys, vec![], "http://localhost:8000".to_string())
}

pub fn test_client() -> TestClient {
    // Unique temp DB for each test (avoids parallel test contention)
    let db_path = format!(
        "/tmp/hive_test_{}.db",
        uuid::Uuid::new_v4().to_string().split('-').next().unwrap()
    );
    let rocket = hive::rocket_with_config(&db_path, test_config());
    let client = Client::tracked(rocket).expect("valid rocket instance");
    TestClient {
        client: Some(client),
        db_path,
    }
}

pub fn auth(user: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer tok-{user}"))
}

/// Helper: send a message and return the created message JSON.
pub fn send_message(client: &Client, from: &str, to: &str, body: &str) -> serde_json::Value {
    use rocket::http::Status;
    let res = client
        .post(format!("/mailboxes/{to}/messages"))
        .header(ContentType::JSON)
        .header(auth(from))
        .body(body.to_string())
        .dispatch();
    assert_eq!(res.status(), Status::Created);
    let v: serde_json::Value = res.into_json().unwrap();
    v["message"].clone()
}

/// Helper: create a task and return its JSON.
pub fn create_task(client: &Client, user: &str, body: &str) -> serde_json::Value {
    use rocket::http::Status;
    let res = client
        .post("/swarm/tasks")
        .header(ContentType::JSON)
        .header(auth(user))
        .body(body.to_string())
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let v: serde_json::Value = res.into_json().unwrap();
    v["task"].clone()
}
