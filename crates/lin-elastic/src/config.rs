//! Kernel configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

/// Evaluation controls shared by every operation of a [`crate::TermEvaluator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Fill disjoint element ranges of the output on the rayon pool
    pub parallel: bool,
    /// Jacobian determinants at or below this value mark a degenerate element
    pub min_jacobian: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            min_jacobian: 0.0,
        }
    }
}

impl KernelConfig {
    /// Sequential evaluation with default thresholds.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Default::default()
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|err| KernelError::UnsupportedConfiguration(format!("config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            KernelError::UnsupportedConfiguration(format!("{}: {err}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Validated Jacobian threshold; every kernel reads it through here.
    pub fn jacobian_threshold(&self) -> Result<f64> {
        self.validate()?;
        Ok(self.min_jacobian)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_jacobian.is_nan() || self.min_jacobian < 0.0 {
            return Err(KernelError::UnsupportedConfiguration(format!(
                "min_jacobian must be a non-negative number, got {}",
                self.min_jacobian
            )));
        }
        Ok(())
    }
}
