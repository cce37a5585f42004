//! Simulation configuration and its validation errors.

use std::error::Error;
use std::fmt;

use archsim_core::ErrorClass;

/// Default tick budget for [`Simulation::run`](crate::Simulation::run)
/// callers that do not pick one.
pub const DEFAULT_RUN_TICKS: u64 = 1000;

/// Top-level simulation configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimConfig {
    /// Seed for generated buffer content.
    pub seed: u64,
    /// Tick budget used by [`Simulation::run_default`](crate::Simulation::run_default).
    pub default_run_ticks: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            default_run_ticks: DEFAULT_RUN_TICKS,
        }
    }
}

impl SimConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_run_ticks == 0 {
            return Err(ConfigError::ZeroRunLength);
        }
        Ok(())
    }
}

/// Errors from [`SimConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `default_run_ticks` is zero.
    ZeroRunLength,
}

impl ConfigError {
    /// The error's classification. Always [`ErrorClass::Configuration`].
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Configuration
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroRunLength => write!(f, "default_run_ticks must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.seed, 0);
        assert_eq!(cfg.default_run_ticks, 1000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_run_length_fails() {
        let cfg = SimConfig {
            default_run_ticks: 0,
            ..SimConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::ZeroRunLength) => {}
            other => panic!("expected ZeroRunLength, got {other:?}"),
        }
    }
}
