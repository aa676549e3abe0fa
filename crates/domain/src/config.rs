use std::time::Duration;

/// Tunables for the marketplace services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketplaceConfig {
    /// Longest a request waits for a product or order row lock.
    pub lock_timeout: Duration,
}

impl MarketplaceConfig {
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(2000),
        }
    }
}
