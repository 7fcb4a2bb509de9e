use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Limits applied to practice-mode sessions
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeSettings {
    /// Global cap on concurrently running practice sessions, 0 for no cap
    pub max_concurrent_sessions: u32,
    pub default_session_minutes: f64,
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 0,
            default_session_minutes: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: String,
    /// No url means the in-memory store
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub event_capacity: usize,
    pub practice: PracticeSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_url: None,
            db_max_connections: 5,
            event_capacity: 100,
            practice: PracticeSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unparseable values keep their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            bind_addr: lookup("GAMEBOARD_BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            db_max_connections: parse_or(
                &lookup,
                "GAMEBOARD_DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            ),
            event_capacity: parse_or(&lookup, "GAMEBOARD_EVENT_CAPACITY", defaults.event_capacity),
            practice: PracticeSettings {
                max_concurrent_sessions: parse_or(
                    &lookup,
                    "GAMEBOARD_PRACTICE_MAX_SESSIONS",
                    defaults.practice.max_concurrent_sessions,
                ),
                default_session_minutes: parse_or(
                    &lookup,
                    "GAMEBOARD_PRACTICE_SESSION_MINUTES",
                    defaults.practice.default_session_minutes,
                ),
            },
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = %key, value = %raw, "Ignoring unparseable config value");
            default
        }),
        None => default,
    }
}
