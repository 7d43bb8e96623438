use serde::Deserialize;
use std::collections::HashMap;
use std::env;

/// Resolved caller identity. Produced by token/UI-key lookup, consumed by
/// every authenticated handler.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub user: String,
    #[serde(default)]
    pub admin: bool,
}

/// Immutable startup configuration. Loaded once; reload requires restart.
///
/// Environment:
/// - `HIVE_TOKENS` — JSON map of bearer token -> {"user": "...", "admin": bool}
/// - `HIVE_UI_KEYS` — JSON map of UI key -> {"user": "...", "admin": bool}
/// - `HIVE_ROSTER` — optional comma-separated extra roster users
/// - `HIVE_BASE_URL` — public base URL used to build ingest URLs
pub struct Config {
    pub tokens: HashMap<String, Identity>,
    pub ui_keys: HashMap<String, Identity>,
    pub roster: Vec<String>,
    pub base_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        let tokens = parse_key_map(&env::var("HIVE_TOKENS").unwrap_or_default());
        let ui_keys = parse_key_map(&env::var("HIVE_UI_KEYS").unwrap_or_default());
        let extra: Vec<String> = env::var("HIVE_ROSTER")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        let base_url =
            env::var("HIVE_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
        Config::new(tokens, ui_keys, extra, base_url)
    }

    pub fn new(
        tokens: HashMap<String, Identity>,
        ui_keys: HashMap<String, Identity>,
        extra_roster: Vec<String>,
        base_url: String,
    ) -> Self {
        let mut roster: Vec<String> = tokens
            .values()
            .chain(ui_keys.values())
            .map(|i| i.user.to_lowercase())
            .chain(extra_roster)
            .collect();
        roster.sort();
        roster.dedup();
        Config {
            tokens,
            ui_keys,
            roster,
            base_url,
        }
    }

    pub fn is_roster_user(&self, name: &str) -> bool {
        self.roster.iter().any(|u| u == name)
    }
}

fn parse_key_map(raw: &str) -> HashMap<String, Identity> {
    if raw.trim().is_empty() {
        return HashMap::new();
    }
    match serde_json::from_str::<HashMap<String, Identity>>(raw) {
        Ok(map) => map
            .into_iter()
            .map(|(k, mut v)| {
                v.user = v.user.to_lowercase();
                (k, v)
            })
            .collect(),
        Err(e) => {
            eprintln!("⚠️  Failed to parse key map from env: {e} (ignoring)");
            HashMap::new()
        }
    }
}
