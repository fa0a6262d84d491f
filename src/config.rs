use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATABASE_URL: &str = "sqlite:roomcast.db?mode=rwc";
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;
pub const DEFAULT_COMMAND_CAPACITY: usize = 1024;
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunables for the real-time hub and its sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Pending commands the hub will buffer before callers wait.
    pub command_capacity: usize,
    /// Per-session outbound queue size; a session whose queue is full when a
    /// broadcast arrives is disconnected.
    pub outbound_capacity: usize,
    /// Close sessions that send nothing for this long. `None` disables it.
    pub idle_timeout: Option<Duration>,
    /// Longest a single frame write may block on a peer that is not reading.
    /// Also bounds the final drain and close frame once a session ends.
    pub write_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            idle_timeout: None,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub gateway: GatewayConfig,
}

fn env_capacity(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let idle_timeout = std::env::var("ROOMCAST_IDLE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs);
        let write_timeout = std::env::var("ROOMCAST_WRITE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_WRITE_TIMEOUT);

        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            gateway: GatewayConfig {
                command_capacity: env_capacity(
                    "ROOMCAST_COMMAND_CAPACITY",
                    DEFAULT_COMMAND_CAPACITY,
                ),
                outbound_capacity: env_capacity(
                    "ROOMCAST_OUTBOUND_CAPACITY",
                    DEFAULT_OUTBOUND_CAPACITY,
                ),
                idle_timeout,
                write_timeout,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var("PORT");
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("ROOMCAST_COMMAND_CAPACITY");
        std::env::remove_var("ROOMCAST_OUTBOUND_CAPACITY");
        std::env::remove_var("ROOMCAST_IDLE_TIMEOUT_SECS");
        std::env::remove_var("ROOMCAST_WRITE_TIMEOUT_SECS");
    }

    #[test]
    #[serial]
    fn test_default_config() {
        clear_env();
        let config = Config::from_env();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "sqlite:roomcast.db?mode=rwc");
        assert_eq!(config.gateway, GatewayConfig::default());
        assert_eq!(config.gateway.outbound_capacity, 256);
        assert!(config.gateway.idle_timeout.is_none());
        assert_eq!(config.gateway.write_timeout, Duration::from_secs(10));
    }

    #[test]
    #[serial]
    fn test_port_from_env() {
        clear_env();
        std::env::set_var("PORT", "9000");
        let config = Config::from_env();
        assert_eq!(config.port, 9000);
    }

    #[test]
    #[serial]
    fn test_invalid_port_falls_back_to_default() {
        clear_env();
        std::env::set_var("PORT", "not_a_number");
        let config = Config::from_env();
        assert_eq!(config.port, 8080);
    }

    #[test]
    #[serial]
    fn test_database_url_from_env() {
        clear_env();
        std::env::set_var("DATABASE_URL", "sqlite:test.db");
        let config = Config::from_env();
        assert_eq!(config.database_url, "sqlite:test.db");
    }

    #[test]
    #[serial]
    fn test_capacities_from_env() {
        clear_env();
        std::env::set_var("ROOMCAST_OUTBOUND_CAPACITY", "4");
        std::env::set_var("ROOMCAST_COMMAND_CAPACITY", "64");
        let config = Config::from_env();
        assert_eq!(config.gateway.outbound_capacity, 4);
        assert_eq!(config.gateway.command_capacity, 64);
    }

    #[test]
    #[serial]
    fn test_zero_capacity_falls_back_to_default() {
        clear_env();
        std::env::set_var("ROOMCAST_OUTBOUND_CAPACITY", "0");
        let config = Config::from_env();
        assert_eq!(config.gateway.outbound_capacity, DEFAULT_OUTBOUND_CAPACITY);
    }

    #[test]
    #[serial]
    fn test_idle_timeout() {
        clear_env();
        std::env::set_var("ROOMCAST_IDLE_TIMEOUT_SECS", "30");
        let config = Config::from_env();
        assert_eq!(config.gateway.idle_timeout, Some(Duration::from_secs(30)));

        std::env::set_var("ROOMCAST_IDLE_TIMEOUT_SECS", "0");
        let config = Config::from_env();
        assert!(config.gateway.idle_timeout.is_none());
    }

    #[test]
    #[serial]
    fn test_write_timeout() {
        clear_env();
        std::env::set_var("ROOMCAST_WRITE_TIMEOUT_SECS", "3");
        let config = Config::from_env();
        assert_eq!(config.gateway.write_timeout, Duration::from_secs(3));

        std::env::set_var("ROOMCAST_WRITE_TIMEOUT_SECS", "0");
        let config = Config::from_env();
        assert_eq!(config.gateway.write_timeout, DEFAULT_WRITE_TIMEOUT);
    }
}
