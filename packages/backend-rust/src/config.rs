use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

/// Process configuration, resolved once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub database_url: String,
    /// Directory for rolling file logs; `None` disables file logging.
    pub log_dir: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env_var("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let host = env_var("HOST")
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = env_var("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let database_url =
            env_var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let file_logs_enabled = env_var("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let log_dir = file_logs_enabled
            .then(|| env_var("LOG_DIR").unwrap_or_else(|| "./logs".to_string()));

        Self {
            host,
            port,
            log_level,
            database_url,
            log_dir,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test: these env vars are process-global, so the scenarios run
    // sequentially instead of racing across test threads.
    #[test]
    fn test_from_env_resolution() {
        for name in ["PORT", "HOST", "DATABASE_URL", "ENABLE_FILE_LOGS", "LOG_DIR"] {
            std::env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert!(config.log_dir.is_none());
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:3000");

        std::env::set_var("ENABLE_FILE_LOGS", "0");
        assert!(Config::from_env().log_dir.is_none());

        std::env::set_var("ENABLE_FILE_LOGS", "true");
        std::env::set_var("LOG_DIR", "/tmp/adaptiq-logs");
        std::env::set_var("DATABASE_URL", "sqlite:./adaptiq.db");
        let config = Config::from_env();
        assert_eq!(config.log_dir.as_deref(), Some("/tmp/adaptiq-logs"));
        assert_eq!(config.database_url, "sqlite:./adaptiq.db");

        for name in ["ENABLE_FILE_LOGS", "LOG_DIR", "DATABASE_URL"] {
            std::env::remove_var(name);
        }
    }
}
