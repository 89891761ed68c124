//! Trip requests, the assembled plan, and the planning pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PlannerConfig;
use crate::eld::{DayLog, EldLogBuilder};
use crate::numbers::{MILE_EPSILON, serialize_hours, serialize_miles};
use crate::params::{CycleRule, DriveParameters, HosLimits, ParameterError, ShortHaulMode};
use crate::route::{Endpoints, GeoPoint, Route, RouteError, RouteLeg};
use crate::schedule::{DutyStatus, ScheduleError, ScheduleSimulator, Stop, StopType, Timeline};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(#[from] ParameterError),
    #[error("degenerate route: {0}")]
    Route(#[from] RouteError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Upstream(anyhow::Error),
}

const fn default_true() -> bool {
    true
}

/// A geocoded planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    pub current_location: GeoPoint,
    pub pickup_location: GeoPoint,
    pub dropoff_location: GeoPoint,
    #[serde(default)]
    pub current_cycle_used: f64,
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
    #[serde(default)]
    pub trip_start_date: Option<NaiveDate>,
    /// Precomputed legs; when absent the route provider is asked.
    #[serde(default)]
    pub legs: Option<Vec<RouteLeg>>,
}

impl TripRequest {
    #[must_use]
    pub fn new(current: GeoPoint, pickup: GeoPoint, dropoff: GeoPoint) -> Self {
        Self {
            current_location: current,
            pickup_location: pickup,
            dropoff_location: dropoff,
            current_cycle_used: 0.0,
            cycle_rule: CycleRule::default(),
            adverse_driving_conditions: false,
            short_haul_mode: ShortHaulMode::default(),
            use_16_hour_exception: false,
            used_16_hour_in_last_7_days: false,
            return_to_reporting_location: false,
            enable_34h_restart: true,
            trip_start_date: None,
            legs: None,
        }
    }

    #[must_use]
    pub const fn parameters(&self) -> DriveParameters {
        DriveParameters {
            current_cycle_used_hours: self.current_cycle_used,
            cycle_rule: self.cycle_rule,
            adverse_driving_conditions: self.adverse_driving_conditions,
            short_haul_mode: self.short_haul_mode,
            use_16_hour_exception: self.use_16_hour_exception,
            used_16_hour_in_last_7_days: self.used_16_hour_in_last_7_days,
            return_to_reporting_location: self.return_to_reporting_location,
            enable_34h_restart: self.enable_34h_restart,
        }
    }

    #[must_use]
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            current: self.current_location.clone(),
            pickup: self.pickup_location.clone(),
            dropoff: self.dropoff_location.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns [`ParameterError`] for bad coordinates or parameter combinations.
    pub fn validate(&self) -> Result<(), ParameterError> {
        self.current_location.validate("current_location")?;
        self.pickup_location.validate("pickup_location")?;
        self.dropoff_location.validate("dropoff_location")?;
        self.parameters().validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub current_location: GeoPoint,
    pub pickup_location: GeoPoint,
    pub dropoff_location: GeoPoint,
    #[serde(serialize_with = "serialize_miles")]
    pub total_distance_miles: f64,
    #[serde(serialize_with = "serialize_hours")]
    pub total_drive_hours: f64,
    #[serde(serialize_with = "serialize_hours")]
    pub total_trip_hours: f64,
    pub num_days: usize,
    #[serde(serialize_with = "serialize_hours")]
    pub current_cycle_used: f64,
    #[serde(serialize_with = "serialize_hours")]
    pub planned_start_hour: f64,
}

/// Echo of the limits the plan was built under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HosRulesApplied {
    pub cycle_rule: CycleRule,
    pub cycle_limit_hours: f64,
    pub drive_limit_hours: f64,
    pub window_limit_hours: f64,
    pub sixteen_hour_exception_eligible: bool,
    pub break_after_hours: Option<f64>,
    pub adverse_driving_conditions: bool,
    pub short_haul_mode: ShortHaulMode,
    pub return_to_reporting_location: bool,
    pub enable_34h_restart: bool,
    pub fuel_interval_miles: f64,
    pub restarts_taken: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub all_coordinates: Vec<[f64; 2]>,
    pub legs: Vec<RouteLeg>,
}

/// The complete planning result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    pub plan_id: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub trip: TripSummary,
    pub hos_rules_applied: HosRulesApplied,
    pub stops: Vec<Stop>,
    pub eld_logs: Vec<DayLog>,
    pub route: RouteSummary,
}

impl TripPlan {
    #[must_use]
    pub fn stops_of(&self, stop_type: StopType) -> usize {
        self.stops
            .iter()
            .filter(|stop| stop.stop_type == stop_type)
            .count()
    }
}

/// Combines simulator output with request metadata. Holds no HOS logic.
#[derive(Debug, Clone, Copy)]
pub struct TripPlanAssembler<'a> {
    request: &'a TripRequest,
    config: &'a PlannerConfig,
}

impl<'a> TripPlanAssembler<'a> {
    #[must_use]
    pub const fn new(request: &'a TripRequest, config: &'a PlannerConfig) -> Self {
        Self { request, config }
    }

    #[must_use]
    pub fn assemble(&self, route: Route, timeline: Timeline, limits: &HosLimits) -> TripPlan {
        let eld_logs = EldLogBuilder::new()
            .with_start_date(self.request.trip_start_date)
            .with_planned_start_hour(self.config.planned_start_hour)
            .build(&timeline);
        let trip = TripSummary {
            current_location: self.request.current_location.clone(),
            pickup_location: self.request.pickup_location.clone(),
            dropoff_location: self.request.dropoff_location.clone(),
            total_distance_miles: route.total_distance_miles(),
            total_drive_hours: timeline.total_hours_with_status(DutyStatus::Driving),
            total_trip_hours: timeline.total_hours(),
            num_days: eld_logs.len(),
            current_cycle_used: self.request.current_cycle_used,
            planned_start_hour: self.config.planned_start_hour,
        };
        let hos_rules_applied = HosRulesApplied {
            cycle_rule: self.request.cycle_rule,
            cycle_limit_hours: limits.cycle_hours,
            drive_limit_hours: limits.drive_hours,
            window_limit_hours: limits.window_hours,
            sixteen_hour_exception_eligible: limits.sixteen_hour_eligible,
            break_after_hours: limits.break_after_hours,
            adverse_driving_conditions: self.request.adverse_driving_conditions,
            short_haul_mode: self.request.short_haul_mode,
            return_to_reporting_location: self.request.return_to_reporting_location,
            enable_34h_restart: self.request.enable_34h_restart,
            fuel_interval_miles: self.config.fuel_interval_miles,
            restarts_taken: timeline.stops.iter().filter(|stop| stop.cycle_reset).count(),
        };
        let all_coordinates = route.all_coordinates();
        TripPlan {
            plan_id: None,
            created_at: None,
            trip,
            hos_rules_applied,
            stops: timeline.stops,
            eld_logs,
            route: RouteSummary {
                all_coordinates,
                legs: route.into_legs(),
            },
        }
    }
}

/// Run the full pipeline: validate, schedule, segment, assemble.
///
/// # Errors
///
/// Returns [`PlanError`] for invalid parameters or config, a malformed route,
/// a short-haul route outside the radius, or a schedule failure.
pub fn plan_trip(
    request: &TripRequest,
    legs: Vec<RouteLeg>,
    config: &PlannerConfig,
) -> Result<TripPlan, PlanError> {
    config.validate()?;
    request.validate()?;
    let params = request.parameters();
    let route = Route::new(legs, params.return_to_reporting_location)?;
    debug!(
        "route of {} legs: {:.1} miles, {:.2}h transit",
        route.legs().len(),
        route.total_distance_miles(),
        route.total_duration_hours()
    );

    let simulator = ScheduleSimulator::new(&params, config);
    let limits = *simulator.limits();
    if let Some(limit) = limits.short_haul_radius_miles {
        let radius = route.max_radius_from(request.current_location.as_pair());
        if radius > limit + MILE_EPSILON {
            return Err(ParameterError::ShortHaulRadiusExceeded { radius, limit }.into());
        }
    }

    let timeline = simulator.run(&route, &request.endpoints())?;
    let plan = TripPlanAssembler::new(request, config).assemble(route, timeline, &limits);
    info!(
        "planned {:.1} miles over {} day(s) with {} stops",
        plan.trip.total_distance_miles,
        plan.trip.num_days,
        plan.stops.len()
    );
    Ok(plan)
}
