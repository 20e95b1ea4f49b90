use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub tasks_source: String,
    pub results_store: String,
    pub results_dir: String,
    pub prefetch_enabled: bool,
    pub unlock_offset_minutes: i32,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load environment variables from root .env file (two levels up)
        // Try root .env first, then fallback to local .env
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            // Fallback to current directory .env for backward compatibility
            dotenvy::dotenv().ok();
        }

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            // Load base config from TOML file
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        // Extract values with fallbacks to ENV or defaults
        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        let tasks_source = settings
            .get_string("tasks.source")
            .or_else(|_| env::var("TASKS_SOURCE"))
            .unwrap_or_else(|_| "config/tasks.json".to_string());

        let results_store = settings
            .get_string("results.store")
            .or_else(|_| env::var("RESULTS_STORE"))
            .unwrap_or_else(|_| "memory".to_string());

        let results_dir = settings
            .get_string("results.dir")
            .or_else(|_| env::var("RESULTS_DIR"))
            .unwrap_or_else(|_| "data/results".to_string());

        let prefetch_enabled = settings
            .get_bool("prefetch.enabled")
            .ok()
            .or_else(|| {
                env::var("PREFETCH_ENABLED")
                    .ok()
                    .and_then(|value| value.parse().ok())
            })
            .unwrap_or(true);

        let unlock_offset_minutes = settings
            .get_int("unlock.offset_minutes")
            .ok()
            .map(|value| value as i32)
            .or_else(|| {
                env::var("UNLOCK_OFFSET_MINUTES")
                    .ok()
                    .and_then(|value| value.parse().ok())
            })
            .unwrap_or(0);

        Ok(Config {
            bind_addr,
            tasks_source,
            results_store,
            results_dir,
            prefetch_enabled,
            unlock_offset_minutes,
        })
    }
}
