use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

pub const DEFAULT_DSN : &str = "pinub.db";
pub const DEFAULT_LOG_FILTER : &str = "pinub=info";

/// Settings read from the environment (and `.env`, when present).
///
/// - `DSN`: path of the sqlite database
/// - `PINUB_LOG`: tracing filter directives
#[derive(Debug, Clone)]
pub struct Config {
    pub dsn :        PathBuf,
    pub log_filter : String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup : F) -> Self
    where
        F : Fn(&str) -> Option<String>,
    {
        Self {
            dsn :        lookup("DSN")
                .filter(|dsn| !dsn.is_empty())
                .unwrap_or_else(|| DEFAULT_DSN.to_string())
                .into(),
            log_filter : lookup("PINUB_LOG")
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    /// Installs the global subscriber, logging to stderr. Bad filter
    /// directives fall back to the default filter.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_new(&self.log_filter)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults() {
        let config = Config::from_lookup(|_| None);

        assert_eq!(config.dsn, PathBuf::from("pinub.db"));
        assert_eq!(config.log_filter, "pinub=info");
    }

    #[test]
    fn overrides() {
        let vars = HashMap::from([
            ("DSN", "/var/lib/pinub/links.db"),
            ("PINUB_LOG", "pinub=debug"),
        ]);
        let config =
            Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.dsn, PathBuf::from("/var/lib/pinub/links.db"));
        assert_eq!(config.log_filter, "pinub=debug");
    }

    #[test]
    fn empty_dsn_uses_default() {
        let config = Config::from_lookup(|key| {
            (key == "DSN").then(String::new)
        });

        assert_eq!(config.dsn, PathBuf::from("pinub.db"));
    }
}
