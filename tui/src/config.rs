use std::{path::PathBuf, time::Duration};

use clap::Parser;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Terminal client for room based chat servers
#[derive(Parser, Debug, Clone)]
#[command(name = "room-chat")]
#[command(about = "Terminal client for room based chat servers")]
#[command(version)]
pub struct Config {
    /// Base url of the room server
    #[arg(long, env = "ROOM_CHAT_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Milliseconds to wait before reconnecting a dropped room stream
    #[arg(long, default_value_t = 3000)]
    pub retry_delay_ms: u64,

    /// Milliseconds before a create, join or send request is abandoned
    #[arg(long, default_value_t = 10_000)]
    pub request_timeout_ms: u64,

    /// Directory the log files are written to
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error), RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        Config::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::try_parse_from([
            "room-chat",
            "--server-url",
            "http://chat.example.com",
            "--retry-delay-ms",
            "250",
            "--request-timeout-ms",
            "1500",
            "--log-dir",
            "/tmp/room-chat",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(config.server_url, "http://chat.example.com");
        assert_eq!(config.retry_delay(), Duration::from_millis(250));
        assert_eq!(config.request_timeout(), Duration::from_millis(1500));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/room-chat"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_requests_time_out_after_ten_seconds_by_default() {
        let config = Config::try_parse_from(["room-chat"]).unwrap();

        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.retry_delay(), Duration::from_secs(3));
    }

    #[test]
    fn test_retry_delay_must_be_a_number() {
        assert!(Config::try_parse_from(["room-chat", "--retry-delay-ms", "soon"]).is_err());
    }
}
