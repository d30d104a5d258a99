use std::time::Duration;

/// Seconds MySQL keeps an idle connection open by default (`wait_timeout`).
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(28_800);

/// Safety margin subtracted from the server idle timeout.
pub const DEFAULT_EXPIRY_MARGIN: Duration = Duration::from_secs(2);

/// Configuration for a [`Db`](crate::Db) handle.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Deadline applied to every network call. `None` means no deadline (default).
    pub query_timeout: Option<Duration>,
    /// Subtracted from the server's idle timeout when computing the expiry watermark.
    pub expiry_margin: Duration,
    /// Idle timeout used when `wait_timeout` cannot be read from the server.
    pub fallback_idle_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            query_timeout: None,
            expiry_margin: DEFAULT_EXPIRY_MARGIN,
            fallback_idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl DbConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-operation deadline.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.query_timeout = Some(duration);
        self
    }

    /// Remove the per-operation deadline.
    pub fn no_timeout(mut self) -> Self {
        self.query_timeout = None;
        self
    }

    /// Set the margin subtracted from the server idle timeout.
    pub fn expiry_margin(mut self, margin: Duration) -> Self {
        self.expiry_margin = margin;
        self
    }

    /// Set the idle timeout assumed when the server does not report one.
    pub fn fallback_idle_timeout(mut self, timeout: Duration) -> Self {
        self.fallback_idle_timeout = timeout;
        self
    }

    /// How long a connection may sit idle before it is considered expired.
    pub fn connection_ttl(&self, server_idle_timeout: Duration) -> Duration {
        server_idle_timeout.saturating_sub(self.expiry_margin)
    }
}
