use crate::client::DEFAULT_WS_URL;
use crate::waiter::{WaitStrategy, DEFAULT_PAIR_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;

/// Default location of the session store.
pub const DEFAULT_DATABASE_PATH: &str = "wtc-session.json";

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "error";

/// Runtime configuration for one `wtc` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path to the JSON session store.
    pub database_path: PathBuf,
    /// How long to wait for the QR code to be scanned.
    pub pair_timeout: Duration,
    /// How the pairing waiter observes the pairing signal.
    pub wait_strategy: WaitStrategy,
    /// Extra delay after a successful send before disconnecting.
    pub settle_delay: Duration,
    /// WebSocket endpoint.
    pub ws_url: String,
    /// Tracing filter directive.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.into(),
            pair_timeout: DEFAULT_PAIR_TIMEOUT,
            wait_strategy: WaitStrategy::Notify,
            settle_delay: Duration::ZERO,
            ws_url: DEFAULT_WS_URL.into(),
            log_filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

impl Config {
    /// Override the session store path.
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Override the pairing deadline.
    pub fn with_pair_timeout(mut self, timeout: Duration) -> Self {
        self.pair_timeout = timeout;
        self
    }

    /// Check the pairing flag on a fixed tick instead of waking on the signal.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.wait_strategy = WaitStrategy::Poll(interval);
        self
    }

    /// Override the post-send settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Override the WebSocket endpoint.
    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = url.into();
        self
    }

    /// Override the tracing filter.
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}
