use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;

/// Which linear objective the planner minimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Total dose summed over every voxel of the matrix
    TotalDose,
    /// Sum of the beamlet weights
    BeamletStrength,
}

/// Where the separation oracle looks for thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSearch {
    Nominal,
    Wide,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub num_threshold_values: usize,
    pub max_iterations: usize,
    pub epsilon: f64,
    pub weight_upper_bound: f64,
    pub objective: Objective,
    pub threshold_search: ThresholdSearch,
    /// Seconds given to each LP solve
    pub time_limit: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threshold_values: 10,
            max_iterations: 10_000,
            epsilon: 1e-6,
            weight_upper_bound: 120.0,
            objective: Objective::TotalDose,
            threshold_search: ThresholdSearch::Nominal,
            time_limit: 300.0,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.num_threshold_values < 2 {
            return Err(Error::InvalidParameter(format!(
                "num_threshold_values must be at least 2, got {}",
                self.num_threshold_values
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidParameter(
                "max_iterations must be positive".to_string(),
            ));
        }
        if !(self.epsilon >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "epsilon must be non-negative, got {}",
                self.epsilon
            )));
        }
        if !(self.weight_upper_bound > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "weight_upper_bound must be positive, got {}",
                self.weight_upper_bound
            )));
        }
        if !(self.time_limit > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "time_limit must be positive, got {}",
                self.time_limit
            )));
        }
        Ok(())
    }
}

pub fn read_config_input(filepath: &str) -> Result<Config> {
    let contents = fs::read_to_string(filepath)?;
    let parsed: Config = serde_json::from_str(&contents)?;
    parsed.validate()?;
    Ok(parsed)
}
