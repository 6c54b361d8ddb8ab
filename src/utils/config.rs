// src/utils/config.rs - Environment-driven runtime configuration
use log::{debug, info};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SYNC_MAX_ITEMS: usize = 100;
pub const DEFAULT_SYNC_TIME_BUDGET_SECS: u64 = 540;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
}

impl PostgresSettings {
    pub fn from_env() -> Self {
        Self {
            host: env::var("POSTGRES_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("POSTGRES_PORT", 5432),
            dbname: env::var("POSTGRES_DB").unwrap_or_else(|_| "catalog".to_string()),
            user: env::var("POSTGRES_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: env::var("POSTGRES_PASSWORD").unwrap_or_default(),
            max_connections: parse_var("POSTGRES_MAX_CONNECTIONS", 8),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    pub store: StoreBackend,
    pub snapshot_path: Option<PathBuf>,
    pub postgres: PostgresSettings,
    /// Per-call cap on ids in one promotion batch.
    pub sync_max_items: usize,
    pub sync_time_budget: Duration,
    pub bucketed_duplicate_scan: bool,
    /// Principal recorded on audit records.
    pub actor_id: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::Postgres,
            snapshot_path: None,
            postgres: PostgresSettings::from_env(),
            sync_max_items: DEFAULT_SYNC_MAX_ITEMS,
            sync_time_budget: Duration::from_secs(DEFAULT_SYNC_TIME_BUDGET_SECS),
            bucketed_duplicate_scan: false,
            actor_id: "system".to_string(),
        }
    }
}

impl ReconcileConfig {
    pub fn from_env() -> Self {
        let store = match env::var("RECONCILE_STORE")
            .unwrap_or_default()
            .trim()
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            _ => StoreBackend::Postgres,
        };
        let config = Self {
            store,
            snapshot_path: env::var("RECONCILE_SNAPSHOT_PATH").ok().map(PathBuf::from),
            postgres: PostgresSettings::from_env(),
            sync_max_items: parse_var("SYNC_MAX_ITEMS", DEFAULT_SYNC_MAX_ITEMS).max(1),
            sync_time_budget: Duration::from_secs(parse_var(
                "SYNC_TIME_BUDGET_SECS",
                DEFAULT_SYNC_TIME_BUDGET_SECS,
            )),
            bucketed_duplicate_scan: parse_var("DUPLICATE_SCAN_BUCKETED", false),
            actor_id: env::var("RECONCILE_ACTOR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "system".to_string()),
        };
        debug!("Reconcile config: {:?}", config.without_secrets());
        config
    }

    pub fn log_config(&self) {
        info!(
            "⚙️  Store: {:?}, sync cap: {} items, time budget: {}s, bucketed scan: {}, actor: {}",
            self.store,
            self.sync_max_items,
            self.sync_time_budget.as_secs(),
            self.bucketed_duplicate_scan,
            self.actor_id
        );
    }

    fn without_secrets(&self) -> Self {
        let mut redacted = self.clone();
        if !redacted.postgres.password.is_empty() {
            redacted.postgres.password = "[hidden]".to_string();
        }
        redacted
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
