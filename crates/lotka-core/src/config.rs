//! Configuration types for the simulation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ages, satiation gains and costs that drive the agent life cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Age at which prey become fertile (the growth latch sets)
    pub prey_maturity_age: u32,
    /// Age from which predators attempt to reproduce
    pub predator_maturity_age: u32,
    /// Satiation gained for each prey eaten
    pub satiation_per_prey: i32,
    /// Satiation lost on every predator step
    pub satiation_decay: i32,
    /// Satiation of a freshly created predator
    pub predator_initial_satiation: i32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            prey_maturity_age: 12,
            predator_maturity_age: 15,
            satiation_per_prey: 10,
            satiation_decay: 1,
            predator_initial_satiation: 0,
        }
    }
}

/// Model-level simulation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Width of the world grid
    pub grid_width: i32,
    /// Height of the world grid
    pub grid_height: i32,
    /// Number of prey placed at initialization
    pub initial_prey_count: usize,
    /// Number of predators placed at initialization
    pub initial_predator_count: usize,
    /// Reproduction threshold carried by every prey
    pub prey_reproduction_rate: u32,
    /// Minimum age at which a predator may reproduce
    pub predator_reproduction_rate: u32,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Emit a population snapshot log line every this many ticks (0 disables)
    pub log_interval: u64,
    /// Life cycle constants
    pub lifecycle: LifecycleConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid_width: 50,
            grid_height: 40,
            initial_prey_count: 100,
            initial_predator_count: 50,
            prey_reproduction_rate: 10,
            predator_reproduction_rate: 5,
            seed: 0,
            log_interval: 100,
            lifecycle: LifecycleConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Reject configurations the engine cannot run.
    ///
    /// Only structural constraints are enforced here. The slider ranges in
    /// [`SimulationConfig::parameters`] are advisory.
    pub fn validate(&self) -> Result<()> {
        if self.grid_width <= 0 || self.grid_height <= 0 {
            return Err(Error::InvalidConfig(format!(
                "grid dimensions must be positive, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }

        if self.prey_reproduction_rate == 0 {
            return Err(Error::InvalidConfig(
                "prey_reproduction_rate must be positive".to_string(),
            ));
        }

        if self.predator_reproduction_rate == 0 {
            return Err(Error::InvalidConfig(
                "predator_reproduction_rate must be positive".to_string(),
            ));
        }

        if self.lifecycle.prey_maturity_age == 0 || self.lifecycle.predator_maturity_age == 0 {
            return Err(Error::InvalidConfig(
                "maturity ages must be positive".to_string(),
            ));
        }

        if self.lifecycle.satiation_per_prey < 0 || self.lifecycle.satiation_decay < 0 {
            return Err(Error::InvalidConfig(
                "satiation gain and decay must not be negative".to_string(),
            ));
        }

        Ok(())
    }

    /// User-settable parameters with their slider ranges
    pub fn parameters() -> Vec<Parameter> {
        let defaults = Self::default();
        vec![
            Parameter {
                name: "initial_prey_count",
                label: "Number of Prey",
                min: 10,
                default: defaults.initial_prey_count as i64,
                max: 300,
            },
            Parameter {
                name: "initial_predator_count",
                label: "Number of Predators",
                min: 10,
                default: defaults.initial_predator_count as i64,
                max: 300,
            },
            Parameter {
                name: "prey_reproduction_rate",
                label: "Prey Reproduction Rate",
                min: 1,
                default: defaults.prey_reproduction_rate as i64,
                max: 50,
            },
            Parameter {
                name: "predator_reproduction_rate",
                label: "Predator Reproduction Rate",
                min: 1,
                default: defaults.predator_reproduction_rate as i64,
                max: 30,
            },
        ]
    }
}

/// A slider-style parameter exposed to a control panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: &'static str,
    pub label: &'static str,
    pub min: i64,
    pub default: i64,
    pub max: i64,
}

impl Parameter {
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}
