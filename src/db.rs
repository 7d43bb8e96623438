use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

/// Clone-able handle over a single SQLite connection in WAL mode.
/// Background tasks and drop guards hold their own clone.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

/// Generate an ingest token: 14 hex chars.
pub fn generate_ingest_token() -> String {
    format!("{:032x}", uuid::Uuid::new_v4().as_u128())[..14].to_string()
}

impl Db {
    pub fn new(path: &str) -> Self {
        let conn = Connection::open(path).expect("Failed to open database");
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .expect("Failed to set pragmas");
        let db = Db {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate();
        db
    }

    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn migrate(&self) {
        let conn = self.conn();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipient TEXT NOT NULL,
                sender TEXT NOT NULL,
                title TEXT NOT NULL,
                body TEXT,
                status TEXT NOT NULL DEFAULT 'unread',
                urgent INTEGER NOT NULL DEFAULT 0,
                thread_id TEXT,
                reply_to_message_id INTEGER,
                dedupe_key TEXT,
                metadata TEXT,
                response_waiting INTEGER NOT NULL DEFAULT 0,
                waiting_responder TEXT,
                waiting_since TEXT,
                created_at TEXT NOT NULL,
                viewed_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_messages_recipient ON messages(recipient, id DESC);
            CREATE INDEX IF NOT EXISTS idx_messages_recipient_status ON messages(recipient, status, id DESC);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_messages_dedupe
                ON messages(recipient, sender, dedupe_key) WHERE dedupe_key IS NOT NULL;
            CREATE INDEX IF NOT EXISTS idx_messages_waiting
                ON messages(waiting_responder) WHERE response_waiting = 1;",
        )
        .expect("Failed to create messages table");

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS webhooks (
                id TEXT PRIMARY KEY,
                app_name TEXT NOT NULL,
                title TEXT NOT NULL,
                owner TEXT NOT NULL,
                token TEXT NOT NULL,
                for_users TEXT,
                enabled INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                UNIQUE(app_name, token)
            );
            CREATE INDEX IF NOT EXISTS idx_webhooks_owner ON webhooks(owner);

            CREATE TABLE IF NOT EXISTS broadcast_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                webhook_id TEXT,
                app_name TEXT NOT NULL,
                title TEXT NOT NULL,
                for_users TEXT,
                content_type TEXT NOT NULL DEFAULT 'text/plain',
                body_text TEXT,
                body_json TEXT,
                received_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_broadcast_events_app ON broadcast_events(app_name, id DESC);",
        )
        .expect("Failed to create broadcast tables");

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                color TEXT NOT NULL,
                project_lead_user_id TEXT NOT NULL,
                developer_lead_user_id TEXT NOT NULL,
                onedev_url TEXT,
                dokploy_deploy_url TEXT,
                archived_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                project_id TEXT,
                title TEXT NOT NULL,
                detail TEXT,
                creator_user_id TEXT NOT NULL,
                assignee_user_id TEXT,
                status TEXT NOT NULL DEFAULT 'queued',
                on_or_after_at TEXT,
                must_be_done_after_task_id TEXT,
                sort_key TEXT NOT NULL,
                next_task_id TEXT,
                next_task_assignee_user_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                completed_at TEXT,
                recurring_template_id TEXT,
                recurring_instance_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_status_sort ON tasks(status, sort_key);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_recurring
                ON tasks(recurring_template_id, recurring_instance_at)
                WHERE recurring_template_id IS NOT NULL AND recurring_instance_at IS NOT NULL;

            CREATE TABLE IF NOT EXISTS task_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                actor_user_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                before_state TEXT,
                after_state TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_task_events_task ON task_events(task_id, id);

            CREATE TABLE IF NOT EXISTS recurring_templates (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                detail TEXT,
                project_id TEXT,
                owner_user_id TEXT NOT NULL,
                primary_agent TEXT,
                fallback_agent TEXT,
                enabled INTEGER NOT NULL DEFAULT 1,
                start_at TEXT NOT NULL,
                end_at TEXT,
                every_interval INTEGER NOT NULL DEFAULT 1,
                every_unit TEXT NOT NULL DEFAULT 'day',
                days_of_week TEXT,
                week_parity TEXT NOT NULL DEFAULT 'any',
                between_hours_start INTEGER,
                between_hours_end INTEGER,
                timezone TEXT NOT NULL DEFAULT 'UTC',
                mute INTEGER NOT NULL DEFAULT 0,
                mute_interval TEXT,
                repeat_count INTEGER,
                last_run_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .expect("Failed to create swarm tables");

        // FTS5 full-text index over message title + body for search
        conn.execute_batch(
            "CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(
                message_id UNINDEXED,
                title,
                body,
                tokenize='porter unicode61'
            );",
        )
        .expect("Failed to create FTS5 table");
    }
}

/// Index a message for search (call after insert; messages are immutable).
pub fn index_message_fts(conn: &Connection, message_id: i64) {
    conn.execute(
        "INSERT INTO messages_fts (message_id, title, body)
         SELECT id, title, COALESCE(body, '') FROM messages WHERE id = ?1",
        [message_id],
    )
    .ok();
}
