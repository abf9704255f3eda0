use std::env;
use std::str::FromStr;
use std::time::Duration;

use log::warn;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_RELAY_URL: &str = "https://chess-server-5mll.onrender.com/";

/// Runtime knobs for the listener, the relay tasks and the main loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    /// Site prefix; a room's base URL is this plus the room code.
    pub relay_url: String,
    pub poll_interval: Duration,
    pub roster_timeout: Duration,
    pub move_timeout: Duration,
    pub offer_timeout: Duration,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    /// How often background tasks look at their stop signal.
    pub stop_check: Duration,
    pub tick_hz: u32,
    pub create_attempts: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            relay_url: DEFAULT_RELAY_URL.to_string(),
            poll_interval: Duration::from_millis(100),
            roster_timeout: Duration::from_secs(5),
            move_timeout: Duration::from_secs(10),
            offer_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            send_timeout: Duration::from_secs(10),
            stop_check: Duration::from_millis(50),
            tick_hz: 30,
            create_attempts: 20,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `CHESS_*` keys.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.port = parse_or(&lookup, "CHESS_PORT", config.port);
        config.tick_hz = parse_or(&lookup, "CHESS_TICK_HZ", config.tick_hz).max(1);
        let poll_ms = parse_or(&lookup, "CHESS_POLL_MS", config.poll_interval.as_millis() as u64);
        config.poll_interval = Duration::from_millis(poll_ms.max(1));
        if let Some(url) = lookup("CHESS_RELAY_URL").filter(|u| !u.trim().is_empty()) {
            let url = url.trim();
            config.relay_url = if url.ends_with('/') {
                url.to_string()
            } else {
                format!("{}/", url)
            };
        }
        config
    }

    /// Duration of one main-loop tick.
    pub fn tick(&self) -> Duration {
        Duration::from_secs(1) / self.tick_hz.max(1)
    }

    pub fn room_url(&self, code: &str) -> String {
        format!("{}{}", self.relay_url, code)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("ignoring {}={:?}: not a valid value", key, raw);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 8000);
        assert_eq!(config.room_url("4821"), "https://chess-server-5mll.onrender.com/4821");
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(lookup(&[
            ("CHESS_PORT", "9100"),
            ("CHESS_POLL_MS", "250"),
            ("CHESS_TICK_HZ", "60"),
            ("CHESS_RELAY_URL", "http://127.0.0.1:3000"),
        ]));
        assert_eq!(config.port, 9100);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.tick_hz, 60);
        assert_eq!(config.room_url("1000"), "http://127.0.0.1:3000/1000");
    }

    #[test]
    fn bad_values_keep_defaults() {
        let config = Config::from_lookup(lookup(&[("CHESS_PORT", "eighty"), ("CHESS_TICK_HZ", "-3")]));
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.tick_hz, 30);
    }

    #[test]
    fn tick_length_follows_rate() {
        let config = Config::default();
        assert_eq!(config.tick(), Duration::from_secs(1) / 30);
    }
}
