pub mod config;
pub mod db;
pub mod events;
pub mod models;
pub mod ordering;
pub mod presence;
pub mod routes;
pub mod schedule;
pub mod swarm;

use config::Config;
use db::Db;
use events::EventBus;
use presence::PresenceTracker;
use std::env;

pub fn rocket() -> rocket::Rocket<rocket::Build> {
    let db_path = env::var("DATABASE_PATH").unwrap_or_else(|_| "data/hive.db".to_string());
    rocket_with_db(&db_path)
}

pub fn rocket_with_db(db_path: &str) -> rocket::Rocket<rocket::Build> {
    build_rocket(db_path, Config::from_env())
}

pub fn rocket_with_config(db_path: &str, config: Config) -> rocket::Rocket<rocket::Build> {
    build_rocket(db_path, config)
}

fn api_routes() -> Vec<rocket::Route> {
    rocket::routes![
        routes::healthz,
        routes::readyz,
        routes::send_message,
        routes::list_messages,
        routes::search_messages,
        routes::get_message,
        routes::ack_message,
        routes::batch_ack,
        routes::reply_message,
        routes::mark_waiting,
        routes::clear_waiting,
        routes::list_waiting,
        routes::list_waiting_on_others,
        routes::waiting_counts,
        routes::mailbox_stream,
        routes::ui_stream,
        routes::buzz_stream,
        routes::get_presence,
        routes::create_webhook,
        routes::list_webhooks,
        routes::get_webhook,
        routes::enable_webhook,
        routes::disable_webhook,
        routes::delete_webhook,
        routes::list_events,
        routes::buzz_tail,
        routes::ingest,
        routes::create_project,
        routes::list_projects,
        routes::get_project,
        routes::update_project,
        routes::archive_project,
        routes::unarchive_project,
        routes::create_task,
        routes::list_tasks,
        routes::get_task,
        routes::update_task,
        routes::claim_task,
        routes::set_task_status,
        routes::list_task_events,
        routes::reorder_task,
        routes::create_template,
        routes::list_templates,
        routes::get_template,
        routes::update_template,
        routes::delete_template,
        routes::enable_template,
        routes::disable_template,
        routes::run_recurring,
    ]
}

fn build_rocket(db_path: &str, config: Config) -> rocket::Rocket<rocket::Build> {
    // Ensure data directory exists
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let db = Db::new(db_path);
    let events = EventBus::new();
    let tracker = PresenceTracker::default();

    // Clones for the background sweep, taken before Rocket owns the state.
    let sweeper_db = db.clone();
    let sweeper_tracker = tracker.clone();
    let sweeper_sender = events.sender.clone();
    let sweeper_roster = config.roster.clone();

    let figment = rocket::Config::figment().merge(("limits.json", 1024 * 1024)); // 1 MiB

    rocket::custom(figment)
        .manage(db)
        .manage(events)
        .manage(tracker)
        .manage(config)
        .register(
            "/",
            rocket::catchers![
                routes::bad_request,
                routes::unauthorized,
                routes::forbidden,
                routes::not_found,
                routes::payload_too_large,
                routes::unprocessable,
                routes::internal_error,
            ],
        )
        // The /api prefix is equivalent to none: mount the same table twice.
        .mount("/", api_routes())
        .mount("/api", api_routes())
        .attach(rocket::fairing::AdHoc::on_liftoff(
            "Presence Sweeper",
            move |_rocket| {
                Box::pin(async move {
                    presence::spawn_presence_sweeper(
                        sweeper_db,
                        sweeper_tracker,
                        sweeper_sender,
                        sweeper_roster,
                    );
                    println!("👁  Presence sweeper started");
                })
            },
        ))
}
