//! Server configuration from environment
//!
//! | Variable                       | Default        |
//! |--------------------------------|----------------|
//! | `RENDEZVOUS_ADDR`              | `0.0.0.0:8080` |
//! | `RENDEZVOUS_SEND_TIMEOUT_MS`   | `10000`        |
//! | `RENDEZVOUS_PRUNE_EMPTY_ROOMS` | `false`        |
//!
//! A send timeout of `0` disables it. Outbound queues are unbounded, so the
//! timeout is what drops a peer that stays connected but stops reading.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080);

pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to
    pub addr: SocketAddr,
    /// Upper bound on writing one frame to a peer; the peer is dropped on expiry
    pub send_timeout: Option<Duration>,
    /// Drop a room entry once its last member disconnects
    pub prune_empty_rooms: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR,
            send_timeout: Some(DEFAULT_SEND_TIMEOUT),
            prune_empty_rooms: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable values fall back
    /// to their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let addr = lookup("RENDEZVOUS_ADDR")
            .and_then(|s| parse_or_warn("RENDEZVOUS_ADDR", &s))
            .unwrap_or(defaults.addr);

        let send_timeout = match lookup("RENDEZVOUS_SEND_TIMEOUT_MS")
            .and_then(|s| parse_or_warn::<u64>("RENDEZVOUS_SEND_TIMEOUT_MS", &s))
        {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => defaults.send_timeout,
        };

        let prune_empty_rooms = lookup("RENDEZVOUS_PRUNE_EMPTY_ROOMS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.prune_empty_rooms);

        Self {
            addr,
            send_timeout,
            prune_empty_rooms,
        }
    }
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    let parsed = value.trim().parse().ok();
    if parsed.is_none() {
        warn!("Ignoring invalid {}={:?}, using default", key, value);
    }
    parsed
}
