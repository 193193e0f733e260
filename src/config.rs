use std::time::Duration;

use crate::error::PaxosError;

/// Transport-level configuration shared by every actor of one consensus instance.
///
/// Controls fault injection (loss and delay), the proposer retry cadence and what happens
/// once a value is decided.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Probability (0.0 to 1.0) that any single delivery is silently dropped.
    pub loss_rate: f64,
    /// Lower bound of the simulated per-delivery delay.
    pub min_delay: Duration,
    /// Upper bound (inclusive) of the simulated per-delivery delay.
    pub max_delay: Duration,
    /// How long a proposer waits for promises before preparing again.
    pub retry_interval: Duration,
    /// Seed for the loss/delay generator; `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Shut the transport down (stopping every propose loop) once a value is decided.
    pub stop_on_resolution: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            min_delay: Duration::ZERO,
            max_delay: Duration::from_millis(10),
            retry_interval: Duration::from_millis(100),
            seed: None,
            stop_on_resolution: true,
        }
    }
}

impl TransportConfig {
    /// No loss and no delay: every message arrives as soon as its task is scheduled.
    pub fn reliable() -> Self {
        Self {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Default delays with the given loss rate.
    pub fn lossy(loss_rate: f64) -> Self {
        Self {
            loss_rate,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), PaxosError> {
        crate::utils::validate_loss_rate(self.loss_rate)?;
        if self.min_delay > self.max_delay {
            return Err(PaxosError::InvalidDelayRange {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        if self.retry_interval.is_zero() {
            return Err(PaxosError::InvalidRetryInterval);
        }
        Ok(())
    }
}

pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl TransportConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: TransportConfig::default(),
        }
    }

    /// Start builder from an existing TransportConfig (useful for partial updates)
    pub fn from_existing(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Set message loss probability (0.0 to 1.0)
    pub fn with_loss_rate(mut self, loss_rate: f64) -> Self {
        self.config.loss_rate = loss_rate;
        self
    }

    /// Set the simulated delivery delay range (inclusive)
    pub fn with_delay(mut self, min: Duration, max: Duration) -> Self {
        self.config.min_delay = min;
        self.config.max_delay = max;
        self
    }

    /// Deliver without any simulated delay
    pub fn without_delay(self) -> Self {
        self.with_delay(Duration::ZERO, Duration::ZERO)
    }

    /// Set the proposer retry interval
    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.config.retry_interval = retry_interval;
        self
    }

    /// Seed the loss/delay generator for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Keep proposers running after resolution
    pub fn with_stop_on_resolution(mut self, stop_on_resolution: bool) -> Self {
        self.config.stop_on_resolution = stop_on_resolution;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), PaxosError> {
        self.config.validate()
    }

    /// Build the final TransportConfig
    pub fn build(self) -> Result<TransportConfig, PaxosError> {
        self.validate()?;
        Ok(self.config)
    }

    /// Get the current configuration
    pub fn get_config(&self) -> TransportConfig {
        self.config.clone()
    }
}

impl Default for TransportConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
