//! Centralized regulatory limits and planning defaults for the HOS engine.
//!
//! Values here mirror 49 CFR Part 395 for property-carrying drivers. Keeping
//! them together means a rule change is a single reviewed edit rather than a
//! hunt through the simulator.

// Driving limits -----------------------------------------------------------
pub(crate) const DRIVE_LIMIT_HOURS: f64 = 11.0;
pub(crate) const DRIVE_LIMIT_ADVERSE_HOURS: f64 = 13.0;
pub(crate) const WINDOW_LIMIT_HOURS: f64 = 14.0;
pub(crate) const WINDOW_LIMIT_ADVERSE_HOURS: f64 = 16.0;
pub(crate) const SIXTEEN_HOUR_EXTENSION_HOURS: f64 = 2.0;
pub(crate) const BREAK_AFTER_DRIVING_HOURS: f64 = 8.0;
pub(crate) const BREAK_DURATION_HOURS: f64 = 0.5;

// Rest and cycle -----------------------------------------------------------
pub(crate) const REST_DURATION_HOURS: f64 = 10.0;
pub(crate) const RESTART_DURATION_HOURS: f64 = 34.0;
pub(crate) const CYCLE_70_8_HOURS: f64 = 70.0;
pub(crate) const CYCLE_60_7_HOURS: f64 = 60.0;

// Short-haul ---------------------------------------------------------------
pub(crate) const SHORT_HAUL_RADIUS_MILES: f64 = 150.0;
pub(crate) const EARTH_RADIUS_MILES: f64 = 3958.8;

// Planning defaults --------------------------------------------------------
pub(crate) const FUEL_INTERVAL_MILES: f64 = 1000.0;
pub(crate) const FUEL_STOP_HOURS: f64 = 0.0;
pub(crate) const PICKUP_HOURS: f64 = 1.0;
pub(crate) const DROPOFF_HOURS: f64 = 1.0;
pub(crate) const MAX_SIMULATION_STEPS: usize = 10_000;
pub(crate) const HOURS_PER_DAY: f64 = 24.0;

// Straight-line routing ----------------------------------------------------
pub(crate) const STRAIGHT_LINE_ROAD_FACTOR: f64 = 1.2;
pub(crate) const STRAIGHT_LINE_SPEED_MPH: f64 = 55.0;

// Plan history -------------------------------------------------------------
pub(crate) const RECENT_PLANS_DEFAULT: usize = 5;
pub(crate) const RECENT_PLANS_MAX: usize = 20;

// Stop labels --------------------------------------------------------------
pub(crate) const LABEL_START: &str = "Trip Start / Current Location";
pub(crate) const LABEL_PICKUP: &str = "Pickup Location";
pub(crate) const LABEL_DROPOFF: &str = "Dropoff Location";
pub(crate) const LABEL_FUEL: &str = "Fuel Stop";
pub(crate) const LABEL_REST: &str = "Required 10-Hour Rest";
pub(crate) const LABEL_RESTART: &str = "34-Hour Restart (Cycle Reset)";
pub(crate) const LABEL_BREAK: &str = "Mandatory 30-Min Break";

pub(crate) const NOTE_START: &str = "Begin trip";
pub(crate) const NOTE_PICKUP: &str = "1 hour pickup time";
pub(crate) const NOTE_DROPOFF: &str = "1 hour dropoff time";
pub(crate) const NOTE_FUEL: &str = "Refueling stop";
pub(crate) const NOTE_REST: &str = "10-hour rest period (resets driving limits)";
pub(crate) const NOTE_RESTART: &str = "34 consecutive hours off duty (resets cycle hours)";
pub(crate) const NOTE_BREAK: &str = "Required break after 8 hours driving";
pub(crate) const NOTE_DRIVING: &str = "Driving";
pub(crate) const NOTE_PADDING: &str = "Off duty";

pub(crate) const DATE_LABEL_FORMAT: &str = "%m/%d/%Y";
