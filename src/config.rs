use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub mongo_url: String,
    pub mongo_db: String,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "5000"),
            mongo_url: try_load("MONGO_URL", "mongodb://localhost:27017"),
            mongo_db: try_load("MONGO_DB", "seatbook"),
            jwt_secret: read_secret("JWT_SECRET"),
            token_ttl_minutes: try_load("TOKEN_TTL_MINUTES", "60"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn read_secret(secret_name: &str) -> String {
    if let Ok(value) = env::var(secret_name) {
        return value;
    }

    // Docker secrets mount point, used when the env var is absent.
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
        })
        .expect("Secrets misconfigured!")
}
