//! Configuration Loader
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults (`#[serde(default)]` on every section)
//! 2. A TOML file: explicit path, `WORKOUT_QUEUE_CONFIG_PATH`, or `config/workout-queue.toml` if present
//! 3. Environment overrides, e.g. `WORKOUT_QUEUE_WORKER__COUNT=8`
//!
//! `DATABASE_URL` fills `database.url` when nothing else set it.

use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::QueueConfig;
use crate::error::QueueResult;

const ENV_PREFIX: &str = "WORKOUT_QUEUE";
const CONFIG_PATH_ENV: &str = "WORKOUT_QUEUE_CONFIG_PATH";
const DEFAULT_CONFIG_FILE: &str = "config/workout-queue";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration using the process environment
    pub fn load(path: Option<&Path>) -> QueueResult<QueueConfig> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::load_with_env(path, env)
    }

    /// Load configuration against an explicit environment map.
    /// Tests use this to avoid mutating process-wide state.
    pub fn load_with_env(
        path: Option<&Path>,
        env: HashMap<String, String>,
    ) -> QueueResult<QueueConfig> {
        let explicit_path: Option<PathBuf> = path
            .map(Path::to_path_buf)
            .or_else(|| env.get(CONFIG_PATH_ENV).map(PathBuf::from));

        let file_source = match &explicit_path {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration file");
                File::from(path.as_path()).required(true)
            }
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let database_url_fallback = env.get("DATABASE_URL").cloned();

        let mut config: QueueConfig = Config::builder()
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env)),
            )
            .build()?
            .try_deserialize()?;

        if config.database.url.trim().is_empty() {
            if let Some(url) = database_url_fallback {
                config.database.url = url;
            }
        }

        config.validate()?;

        info!(
            workers = config.worker.count,
            listener_enabled = config.listener.enabled,
            channel = %config.listener.channel,
            "Configuration loaded successfully"
        );
        debug!(config = %config.sanitized(), "Effective configuration");

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_database_url_fallback() {
        let config = ConfigLoader::load_with_env(
            None,
            env(&[("DATABASE_URL", "postgresql://localhost/workouts")]),
        )
        .unwrap();
        assert_eq!(config.database.url, "postgresql://localhost/workouts");
        assert_eq!(config.worker.count, 4);
    }

    #[test]
    fn test_missing_database_url_fails_validation() {
        assert!(ConfigLoader::load_with_env(None, env(&[])).is_err());
    }

    #[test]
    fn test_file_then_environment_precedence() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[database]
url = "postgresql://file-host/workouts"

[worker]
count = 2
poll_interval_seconds = 15

[listener]
channel = "custom_updates"
"#
        )
        .unwrap();

        let config = ConfigLoader::load_with_env(
            Some(file.path()),
            env(&[
                ("WORKOUT_QUEUE_WORKER__COUNT", "8"),
                ("DATABASE_URL", "postgresql://ignored/db"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database.url, "postgresql://file-host/workouts");
        assert_eq!(config.worker.count, 8);
        assert_eq!(config.worker.poll_interval_seconds, 15);
        assert_eq!(config.listener.channel, "custom_updates");
        assert_eq!(config.listener.buffer_size, 100);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let result = ConfigLoader::load_with_env(
            Some(Path::new("/nonexistent/workout-queue.toml")),
            env(&[("DATABASE_URL", "postgresql://localhost/workouts")]),
        );
        assert!(result.is_err());
    }
}
