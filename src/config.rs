use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub session_hours: i64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("PORT", "8000"),
            database_url: require("DATABASE_URL"),
            jwt_secret: require("JWT_SECRET"),
            session_hours: try_load("SESSION_HOURS", "24"),
        }
    }
}

fn require(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} must be set"))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().unwrap_or_else(|e| {
        warn!("invalid {key} value: {e}");
        panic!("environment misconfigured");
    })
}
