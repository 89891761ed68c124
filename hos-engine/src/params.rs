//! Driver and carrier parameters plus the regulatory limits they resolve to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{
    BREAK_AFTER_DRIVING_HOURS, BREAK_DURATION_HOURS, CYCLE_60_7_HOURS, CYCLE_70_8_HOURS,
    DRIVE_LIMIT_ADVERSE_HOURS, DRIVE_LIMIT_HOURS, REST_DURATION_HOURS, RESTART_DURATION_HOURS,
    SHORT_HAUL_RADIUS_MILES, SIXTEEN_HOUR_EXTENSION_HOURS, WINDOW_LIMIT_ADVERSE_HOURS,
    WINDOW_LIMIT_HOURS,
};

/// Rolling duty-cycle rule the carrier operates under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CycleRule {
    /// 70 on-duty hours in any 8 consecutive days.
    #[default]
    #[serde(rename = "70_8")]
    SeventyEight,
    /// 60 on-duty hours in any 7 consecutive days.
    #[serde(rename = "60_7")]
    SixtySeven,
}

impl CycleRule {
    #[must_use]
    pub const fn limit_hours(self) -> f64 {
        match self {
            Self::SeventyEight => CYCLE_70_8_HOURS,
            Self::SixtySeven => CYCLE_60_7_HOURS,
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::SeventyEight => "70_8",
            Self::SixtySeven => "60_7",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SeventyEight => "70-hour / 8-day",
            Self::SixtySeven => "60-hour / 7-day",
        }
    }
}

impl fmt::Display for CycleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CycleRule {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "70_8" => Ok(Self::SeventyEight),
            "60_7" => Ok(Self::SixtySeven),
            other => Err(ParameterError::Unrecognized {
                field: "cycle_rule",
                value: other.to_string(),
            }),
        }
    }
}

/// Short-haul operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortHaulMode {
    #[default]
    None,
    #[serde(rename = "150_air_mile", alias = "cdl_150")]
    AirMile150,
    #[serde(rename = "non_cdl_150")]
    NonCdl150,
}

impl ShortHaulMode {
    #[must_use]
    pub const fn is_short_haul(self) -> bool {
        !matches!(self, Self::None)
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::AirMile150 => "150_air_mile",
            Self::NonCdl150 => "non_cdl_150",
        }
    }
}

impl fmt::Display for ShortHaulMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ShortHaulMode {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" => Ok(Self::None),
            "150_air_mile" | "cdl_150" => Ok(Self::AirMile150),
            "non_cdl_150" => Ok(Self::NonCdl150),
            other => Err(ParameterError::Unrecognized {
                field: "short_haul_mode",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("current_cycle_used_hours must be between 0 and {limit:.1} (got {value})")]
    CycleHoursOutOfRange { limit: f64, value: f64 },
    #[error("the 16-hour short-haul exception cannot be combined with non-CDL short-haul mode")]
    SixteenHourWithNonCdl,
    #[error(
        "short-haul mode selected but route exceeds {limit:.0} air-mile radius ({radius:.1} miles)"
    )]
    ShortHaulRadiusExceeded { radius: f64, limit: f64 },
    #[error("{field} coordinate out of range (lat {lat}, lng {lng})")]
    CoordinateOutOfRange {
        field: &'static str,
        lat: f64,
        lng: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("unrecognized {field} value `{value}`")]
    Unrecognized { field: &'static str, value: String },
}

const fn default_true() -> bool {
    true
}

/// Typed duty parameters for a single planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveParameters {
    #[serde(default)]
    pub current_cycle_used_hours: f64,
    #[serde(default)]
    pub cycle_rule: CycleRule,
    #[serde(default)]
    pub adverse_driving_conditions: bool,
    #[serde(default)]
    pub short_haul_mode: ShortHaulMode,
    #[serde(default)]
    pub use_16_hour_exception: bool,
    #[serde(default)]
    pub used_16_hour_in_last_7_days: bool,
    #[serde(default)]
    pub return_to_reporting_location: bool,
    #[serde(default = "default_true")]
    pub enable_34h_restart: bool,
}

impl Default for DriveParameters {
    fn default() -> Self {
        Self {
            current_cycle_used_hours: 0.0,
            cycle_rule: CycleRule::default(),
            adverse_driving_conditions: false,
            short_haul_mode: ShortHaulMode::default(),
            use_16_hour_exception: false,
            used_16_hour_in_last_7_days: false,
            return_to_reporting_location: false,
            enable_34h_restart: true,
        }
    }
}

impl DriveParameters {
    /// Reject parameter combinations the regulations do not allow.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError`] when cycle hours are non-finite or outside the
    /// cycle limit, or when non-CDL short-haul is combined with the 16-hour exception.
    pub fn validate(&self) -> Result<(), ParameterError> {
        let limit = self.cycle_rule.limit_hours();
        let used = self.current_cycle_used_hours;
        if !used.is_finite() || !(0.0..=limit).contains(&used) {
            return Err(ParameterError::CycleHoursOutOfRange { limit, value: used });
        }
        if self.short_haul_mode == ShortHaulMode::NonCdl150 && self.use_16_hour_exception {
            return Err(ParameterError::SixteenHourWithNonCdl);
        }
        Ok(())
    }

    #[must_use]
    pub const fn sixteen_hour_eligible(&self) -> bool {
        self.use_16_hour_exception
            && !self.used_16_hour_in_last_7_days
            && self.return_to_reporting_location
    }

    /// Resolve the numeric limits the clock enforces for this run.
    #[must_use]
    pub const fn limits(&self) -> HosLimits {
        let (drive_hours, window_hours) = if self.adverse_driving_conditions {
            (DRIVE_LIMIT_ADVERSE_HOURS, WINDOW_LIMIT_ADVERSE_HOURS)
        } else {
            (DRIVE_LIMIT_HOURS, WINDOW_LIMIT_HOURS)
        };
        HosLimits {
            drive_hours,
            window_hours,
            extended_window_hours: window_hours + SIXTEEN_HOUR_EXTENSION_HOURS,
            break_after_hours: if self.short_haul_mode.is_short_haul() {
                None
            } else {
                Some(BREAK_AFTER_DRIVING_HOURS)
            },
            break_hours: BREAK_DURATION_HOURS,
            rest_hours: REST_DURATION_HOURS,
            restart_hours: if self.enable_34h_restart {
                Some(RESTART_DURATION_HOURS)
            } else {
                None
            },
            cycle_hours: self.cycle_rule.limit_hours(),
            sixteen_hour_eligible: self.sixteen_hour_eligible(),
            short_haul_radius_miles: if self.short_haul_mode.is_short_haul() {
                Some(SHORT_HAUL_RADIUS_MILES)
            } else {
                None
            },
        }
    }
}

/// Resolved limits for one run; immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HosLimits {
    pub drive_hours: f64,
    pub window_hours: f64,
    pub extended_window_hours: f64,
    /// `None` when the 30-minute break rule does not apply.
    pub break_after_hours: Option<f64>,
    pub break_hours: f64,
    pub rest_hours: f64,
    /// `None` when 34-hour restarts are disabled.
    pub restart_hours: Option<f64>,
    pub cycle_hours: f64,
    pub sixteen_hour_eligible: bool,
    pub short_haul_radius_miles: Option<f64>,
}
