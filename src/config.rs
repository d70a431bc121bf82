use std::env;
use std::str::FromStr;

use crate::constants::{DEFAULT_EXPIRE_INTERVAL_SECS, DEFAULT_WORKER_TIMEOUT_SECS};

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub data_dir: String,
    pub worker: WorkerConfig,
    pub trashbin: TrashbinConfig,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub is_leader: bool,
    pub enable_expire_trash: bool,
    pub expire_trash_interval_secs: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct TrashbinConfig {
    /// `"<min>, <max>"` in days, each part a number or `auto`; or `disabled`.
    pub retention_obligation: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/trash-expiry.sled"),
            data_dir: env_or("DATA_DIR", "./data/users"),
            worker: WorkerConfig {
                is_leader: env_or_bool("WORKER_LEADER", true),
                enable_expire_trash: env_or_bool("ENABLE_EXPIRE_TRASH_WORKER", true),
                expire_trash_interval_secs: env_or_parse(
                    "EXPIRE_TRASH_INTERVAL_SECS",
                    DEFAULT_EXPIRE_INTERVAL_SECS,
                ),
                timeout_secs: env_or_parse("WORKER_TIMEOUT_SECS", DEFAULT_WORKER_TIMEOUT_SECS),
            },
            trashbin: TrashbinConfig {
                retention_obligation: env_or("TRASHBIN_RETENTION_OBLIGATION", "auto"),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn managed_keys() -> &'static [&'static str] {
        &[
            "RUST_LOG",
            "DATA_DIR",
            "WORKER_LEADER",
            "EXPIRE_TRASH_INTERVAL_SECS",
            "WORKER_TIMEOUT_SECS",
            "TRASHBIN_RETENTION_OBLIGATION",
        ]
    }

    fn clear_keys(keys: &[&str]) {
        for key in keys {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_when_missing() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        let cfg = Config::from_env();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.worker.expire_trash_interval_secs, 1800);
        assert!(cfg.worker.is_leader);
        assert_eq!(cfg.trashbin.retention_obligation, "auto");
    }

    #[test]
    fn parses_numeric_values() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("EXPIRE_TRASH_INTERVAL_SECS", "60");
        env::set_var("WORKER_TIMEOUT_SECS", "42");

        let cfg = Config::from_env();
        assert_eq!(cfg.worker.expire_trash_interval_secs, 60);
        assert_eq!(cfg.worker.timeout_secs, 42);
        clear_keys(managed_keys());
    }

    #[test]
    fn invalid_values_fall_back() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("EXPIRE_TRASH_INTERVAL_SECS", "soon");
        env::set_var("WORKER_LEADER", "maybe");

        let cfg = Config::from_env();
        assert_eq!(cfg.worker.expire_trash_interval_secs, 1800);
        assert!(cfg.worker.is_leader);
        clear_keys(managed_keys());
    }

    #[test]
    fn retention_obligation_is_passed_through() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("TRASHBIN_RETENTION_OBLIGATION", "7, 30");
        env::set_var("DATA_DIR", "/srv/users");

        let cfg = Config::from_env();
        assert_eq!(cfg.trashbin.retention_obligation, "7, 30");
        assert_eq!(cfg.data_dir, "/srv/users");
        clear_keys(managed_keys());
    }
}
