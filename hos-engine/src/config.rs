//! Planner tuning that is not regulatory: stop durations, fuel cadence, clock offset.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DROPOFF_HOURS, FUEL_INTERVAL_MILES, FUEL_STOP_HOURS, MAX_SIMULATION_STEPS, PICKUP_HOURS,
};
use crate::params::ParameterError;

/// Operational configuration shared by every planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "PlannerConfig::default_fuel_interval_miles")]
    pub fuel_interval_miles: f64,
    #[serde(default = "PlannerConfig::default_fuel_stop_hours")]
    pub fuel_stop_hours: f64,
    #[serde(default = "PlannerConfig::default_pickup_hours")]
    pub pickup_hours: f64,
    #[serde(default = "PlannerConfig::default_dropoff_hours")]
    pub dropoff_hours: f64,
    #[serde(default = "PlannerConfig::default_max_iterations")]
    pub max_iterations: usize,
    /// Clock hour (0..24) at which the trip begins on day one.
    #[serde(default)]
    pub planned_start_hour: f64,
}

impl PlannerConfig {
    const fn default_fuel_interval_miles() -> f64 {
        FUEL_INTERVAL_MILES
    }

    const fn default_fuel_stop_hours() -> f64 {
        FUEL_STOP_HOURS
    }

    const fn default_pickup_hours() -> f64 {
        PICKUP_HOURS
    }

    const fn default_dropoff_hours() -> f64 {
        DROPOFF_HOURS
    }

    const fn default_max_iterations() -> usize {
        MAX_SIMULATION_STEPS
    }

    /// Validate ranges before a run.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::RangeViolation`] naming the first field out of range.
    pub fn validate(&self) -> Result<(), ParameterError> {
        check_range("fuel_interval_miles", self.fuel_interval_miles, 50.0, 5_000.0)?;
        check_range("fuel_stop_hours", self.fuel_stop_hours, 0.0, 4.0)?;
        check_range("pickup_hours", self.pickup_hours, 0.0, 12.0)?;
        check_range("dropoff_hours", self.dropoff_hours, 0.0, 12.0)?;
        check_range("planned_start_hour", self.planned_start_hour, 0.0, 23.999)?;
        if self.max_iterations == 0 {
            return Err(ParameterError::RangeViolation {
                field: "max_iterations",
                min: 1.0,
                max: crate::numbers::usize_to_f64(MAX_SIMULATION_STEPS * 10),
                value: 0.0,
            });
        }
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ParameterError> {
    if !value.is_finite() || !(min..=max).contains(&value) {
        return Err(ParameterError::RangeViolation {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            fuel_interval_miles: Self::default_fuel_interval_miles(),
            fuel_stop_hours: Self::default_fuel_stop_hours(),
            pickup_hours: Self::default_pickup_hours(),
            dropoff_hours: Self::default_dropoff_hours(),
            max_iterations: Self::default_max_iterations(),
            planned_start_hour: 0.0,
        }
    }
}
