use std::time::Duration;

use aerial_catalog::StorePaths;

use crate::colors::ColorMode;

/// Configuration for the aerial client and transfer engine.
#[derive(Debug, Clone)]
pub struct AerialConfig {
    /// Filesystem layout of the idleassetsd store.
    pub store: StorePaths,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Width of the worker pool. This bounds how many connections and file
    /// handles a batch holds open at once; it is the only admission control.
    pub max_concurrent_transfers: usize,
    /// Timeout for each transfer in seconds.
    pub transfer_timeout_secs: u64,
    /// Accept invalid TLS certificates when talking to the wallpaper CDN.
    ///
    /// Some CDN endpoints present certificate chains the local trust store
    /// cannot verify. Turning this on disables certificate validation for
    /// every request this client makes, so it stays off unless the operator
    /// opts in explicitly (`--insecure`).
    pub accept_invalid_certs: bool,
    /// Render the live status line during a batch.
    pub show_progress: bool,
    /// How often the progress reporter redraws.
    pub poll_interval: Duration,
    /// Color output mode.
    pub color_mode: ColorMode,
}

impl Default for AerialConfig {
    fn default() -> Self {
        Self {
            store: StorePaths::default(),
            user_agent: "aerial-rs/0.1".to_string(),
            max_concurrent_transfers: 8,
            transfer_timeout_secs: 300, // 5 minutes
            accept_invalid_certs: false,
            show_progress: true,
            poll_interval: Duration::from_millis(500),
            color_mode: ColorMode::Auto,
        }
    }
}

impl AerialConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a store rooted somewhere other than the system location.
    pub fn with_store(mut self, store: StorePaths) -> Self {
        self.store = store;
        self
    }

    /// Set the worker pool width (clamped to at least one worker).
    pub fn with_max_concurrent_transfers(mut self, max: usize) -> Self {
        self.max_concurrent_transfers = max.max(1);
        self
    }

    pub fn with_transfer_timeout(mut self, timeout_secs: u64) -> Self {
        self.transfer_timeout_secs = timeout_secs;
        self
    }

    /// Opt in to skipping TLS certificate validation. See the field docs for
    /// why this is never implied by anything else.
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_color_mode(mut self, mode: ColorMode) -> Self {
        self.color_mode = mode;
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_width_never_drops_to_zero() {
        let config = AerialConfig::new().with_max_concurrent_transfers(0);
        assert_eq!(config.max_concurrent_transfers, 1);
    }

    #[test]
    fn certificate_validation_is_on_by_default() {
        assert!(!AerialConfig::default().accept_invalid_certs);
    }
}
