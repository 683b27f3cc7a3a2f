#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the dispatch SQLite database
    pub database_url: String,
    /// How many eligible providers one job is offered to
    pub broadcast_limit: u32,
    /// Support line quoted in client-facing service messages
    pub support_contact: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env_str("DISPATCH_DATABASE_URL", "sqlite:./data/dispatch.db"),
            broadcast_limit: env_parse("DISPATCH_BROADCAST_LIMIT", 3)?,
            support_contact: env_str("DISPATCH_SUPPORT_CONTACT", "09045955670"),
        })
    }
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        Err(_) => Ok(default),
    }
}
