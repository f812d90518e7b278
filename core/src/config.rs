//! Transport and per-request timeout configuration.

use std::time::Duration;

/// Connect/read/write timeouts applied to a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Time allowed to establish the connection.
    pub connect: Duration,

    /// Time allowed to receive the response head and body.
    pub read: Duration,

    /// Time allowed to send the request head and body.
    pub write: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(10_000),
            read: Duration::from_millis(10_000),
            write: Duration::from_millis(10_000),
        }
    }
}

impl Timeouts {
    /// Build from millisecond values.
    pub fn from_millis(connect: u64, read: u64, write: u64) -> Self {
        Self {
            connect: Duration::from_millis(connect),
            read: Duration::from_millis(read),
            write: Duration::from_millis(write),
        }
    }

    /// Same value for all three phases.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            connect: timeout,
            read: timeout,
            write: timeout,
        }
    }
}

/// Configuration for the pooled ureq-backed transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum idle connections kept in the pool.
    pub max_idle_connections: usize,

    /// Maximum idle connections kept per host.
    pub max_idle_connections_per_host: usize,

    /// How long an idle connection stays in the pool.
    pub keep_alive: Duration,

    /// Defaults copied into every request built by a client.
    pub timeouts: Timeouts,

    /// User-Agent header value.
    pub user_agent: String,

    /// Largest response body read into memory, in bytes. Unbounded by
    /// default; a larger body fails the request.
    pub max_body_size: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_idle_connections: 5,
            max_idle_connections_per_host: 5,
            keep_alive: Duration::from_secs(5 * 60),
            timeouts: Timeouts::default(),
            user_agent: format!("fluent-request/{}", env!("CARGO_PKG_VERSION")),
            max_body_size: u64::MAX,
        }
    }
}

impl TransportConfig {
    /// Same as `Default`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pool size.
    pub fn max_idle_connections(mut self, max: usize) -> Self {
        self.max_idle_connections = max;
        self
    }

    /// Set the per-host pool size.
    pub fn max_idle_connections_per_host(mut self, max: usize) -> Self {
        self.max_idle_connections_per_host = max;
        self
    }

    /// Set the keep-alive duration for idle connections.
    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Set the default request timeouts.
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Cap the response body size.
    pub fn max_body_size(mut self, bytes: u64) -> Self {
        self.max_body_size = bytes;
        self
    }
}
