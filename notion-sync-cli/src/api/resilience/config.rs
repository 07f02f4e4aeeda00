//! Resilience configuration with builder pattern
//!
//! Provides a unified configuration for row pacing and upload polling
//! with sane defaults.

use std::time::Duration;

/// Global timing configuration for a sync run
#[derive(Debug, Clone, PartialEq)]
pub struct ResilienceConfig {
    pub pacing: PacingConfig,
    pub upload_poll: UploadPollConfig,
}

/// Fixed delay inserted after each processed row to stay under Notion's
/// rate limit (about three requests per second)
#[derive(Debug, Clone, PartialEq)]
pub struct PacingConfig {
    pub row_delay: Duration,
    pub enabled: bool,
}

/// Bounded status poll for file uploads: fixed attempts, fixed delay, no backoff
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPollConfig {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            pacing: PacingConfig::default(),
            upload_poll: UploadPollConfig::default(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            row_delay: Duration::from_millis(350),
            enabled: true,
        }
    }
}

impl Default for UploadPollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            delay: Duration::from_millis(900),
        }
    }
}

impl PacingConfig {
    /// Delay to sleep after a row, if any
    pub fn delay(&self) -> Option<Duration> {
        (self.enabled && !self.row_delay.is_zero()).then_some(self.row_delay)
    }
}

impl ResilienceConfig {
    /// Create a new builder for ResilienceConfig
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }

    /// No waiting anywhere
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self {
            pacing: PacingConfig {
                row_delay: Duration::ZERO,
                enabled: false,
            },
            upload_poll: UploadPollConfig {
                max_attempts: UploadPollConfig::default().max_attempts,
                delay: Duration::ZERO,
            },
        }
    }
}

/// Builder for ResilienceConfig
#[derive(Debug, Clone)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ResilienceConfig::default(),
        }
    }

    pub fn row_delay(mut self, delay: Duration) -> Self {
        self.config.pacing.row_delay = delay;
        self
    }

    pub fn upload_poll_attempts(mut self, attempts: u32) -> Self {
        self.config.upload_poll.max_attempts = attempts.max(1);
        self
    }

    pub fn upload_poll_delay(mut self, delay: Duration) -> Self {
        self.config.upload_poll.delay = delay;
        self
    }

    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}

impl Default for ResilienceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResilienceConfig::default();
        assert_eq!(config.pacing.row_delay, Duration::from_millis(350));
        assert_eq!(config.upload_poll.max_attempts, 6);
        assert_eq!(config.upload_poll.delay, Duration::from_millis(900));
    }

    #[test]
    fn test_builder() {
        let config = ResilienceConfig::builder()
            .row_delay(Duration::from_millis(100))
            .upload_poll_attempts(0)
            .upload_poll_delay(Duration::from_millis(5))
            .build();

        assert_eq!(config.pacing.row_delay, Duration::from_millis(100));
        assert_eq!(config.upload_poll.max_attempts, 1);
        assert_eq!(config.upload_poll.delay, Duration::from_millis(5));
    }

    #[test]
    fn test_pacing_delay() {
        assert_eq!(
            PacingConfig::default().delay(),
            Some(Duration::from_millis(350))
        );
        assert_eq!(ResilienceConfig::disabled().pacing.delay(), None);
    }
}
