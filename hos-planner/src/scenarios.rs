//! Acceptance scenarios run against the planning engine.

use anyhow::ensure;
use colored::Colorize;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use hos_engine::{
    CycleRule, GeoPoint, LegKind, MemoryPlanStore, PlanError, PlannerConfig, RouteLeg,
    ScheduleError, ShortHaulMode, StopType, StraightLineRouter, TripPlan, TripPlanner,
    TripRequest,
};

pub type Outcome = Result<TripPlan, PlanError>;

const DENVER: [f64; 2] = [39.74, -104.99];
const OMAHA: [f64; 2] = [41.26, -95.93];
const BRIGHTON: [f64; 2] = [40.20, -104.99];
const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
pub struct PlanScenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    request: fn() -> TripRequest,
    expectation: fn(&Outcome) -> anyhow::Result<()>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDigest {
    pub total_distance_miles: f64,
    pub total_trip_hours: f64,
    pub num_days: usize,
    pub stops: usize,
    pub restarts: usize,
}

impl PlanDigest {
    fn from_plan(plan: &TripPlan) -> Self {
        Self {
            total_distance_miles: plan.trip.total_distance_miles,
            total_trip_hours: plan.trip.total_trip_hours,
            num_days: plan.trip.num_days,
            stops: plan.stops.len(),
            restarts: plan.hos_rules_applied.restarts_taken,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_key: String,
    pub scenario_name: String,
    pub passed: bool,
    pub failures: Vec<String>,
    pub summary: Option<PlanDigest>,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[must_use]
pub fn catalog() -> Vec<PlanScenario> {
    vec![
        PlanScenario {
            key: "single-day",
            name: "Single-day haul",
            description: "550 mi in one shift with one 30-minute break",
            request: single_day_request,
            expectation: single_day_expectation,
        },
        PlanScenario {
            key: "multi-day",
            name: "Multi-day haul",
            description: "1200 mi with a 10-hour rest and one fuel stop",
            request: multi_day_request,
            expectation: multi_day_expectation,
        },
        PlanScenario {
            key: "cycle-restart",
            name: "Cycle restart",
            description: "68 of 70 cycle hours used forces a 34-hour restart",
            request: cycle_restart_request,
            expectation: cycle_restart_expectation,
        },
        PlanScenario {
            key: "restart-disabled",
            name: "Cycle exhausted",
            description: "Same trip with restarts disabled must fail",
            request: restart_disabled_request,
            expectation: restart_disabled_expectation,
        },
        PlanScenario {
            key: "adverse-conditions",
            name: "Adverse driving conditions",
            description: "12.5 h of driving fits one extended shift",
            request: adverse_request,
            expectation: adverse_expectation,
        },
        PlanScenario {
            key: "sixty-hour-rule",
            name: "60-hour/7-day rule",
            description: "58 of 60 cycle hours used forces a restart",
            request: sixty_hour_request,
            expectation: sixty_hour_expectation,
        },
        PlanScenario {
            key: "short-haul",
            name: "Short-haul exemption",
            description: "10 h of local driving inside 150 air miles needs no break",
            request: short_haul_request,
            expectation: short_haul_expectation,
        },
        PlanScenario {
            key: "return-trip",
            name: "Return to reporting location",
            description: "Out-and-back run ending at the origin",
            request: return_trip_request,
            expectation: return_trip_expectation,
        },
        PlanScenario {
            key: "straight-line",
            name: "Straight-line routing",
            description: "Dallas to Houston routed without precomputed legs",
            request: straight_line_request,
            expectation: straight_line_expectation,
        },
    ]
}

#[must_use]
pub fn find_scenario(key: &str) -> Option<PlanScenario> {
    catalog().into_iter().find(|scenario| scenario.key == key)
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog()
        .into_iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

#[must_use]
pub fn run_scenario(scenario: &PlanScenario, verbose: bool) -> ScenarioResult {
    if verbose {
        println!("🧪 Planning scenario: {}", scenario.name.bright_white());
    }
    let planner = TripPlanner::new(
        PlannerConfig::default(),
        StraightLineRouter::default(),
        MemoryPlanStore::new(),
    );
    let started = Instant::now();
    let outcome = planner.plan(&(scenario.request)());
    let duration = started.elapsed();
    debug!("scenario {} finished in {duration:?}", scenario.key);

    let failures = match (scenario.expectation)(&outcome) {
        Ok(()) => Vec::new(),
        Err(err) => vec![format!("{err:#}")],
    };
    ScenarioResult {
        scenario_key: scenario.key.to_string(),
        scenario_name: scenario.name.to_string(),
        passed: failures.is_empty(),
        failures,
        summary: outcome.as_ref().ok().map(PlanDigest::from_plan),
        duration,
    }
}

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < TOLERANCE
}

fn planned(outcome: &Outcome) -> anyhow::Result<&TripPlan> {
    outcome
        .as_ref()
        .map_err(|err| anyhow::anyhow!("planning failed: {err}"))
}

fn arrivals(plan: &TripPlan, stop_type: StopType) -> Vec<f64> {
    plan.stops
        .iter()
        .filter(|stop| stop.stop_type == stop_type)
        .map(|stop| stop.arrive_hour)
        .collect()
}

fn leg(kind: LegKind, from: [f64; 2], to: [f64; 2], miles: f64, hours: f64) -> RouteLeg {
    RouteLeg {
        kind,
        coordinates: vec![from, to],
        distance_miles: miles,
        duration_hours: hours,
        instructions: Vec::new(),
    }
}

/// Denver to Omaha with the pickup at the driver's current location.
fn denver_omaha(miles: f64, hours: f64) -> TripRequest {
    let mut request = TripRequest::new(
        GeoPoint::new("Denver, CO", DENVER[0], DENVER[1]),
        GeoPoint::new("Denver, CO", DENVER[0], DENVER[1]),
        GeoPoint::new("Omaha, NE", OMAHA[0], OMAHA[1]),
    );
    request.legs = Some(vec![
        leg(LegKind::ToPickup, DENVER, DENVER, 0.0, 0.0),
        leg(LegKind::ToDropoff, DENVER, OMAHA, miles, hours),
    ]);
    request
}

fn single_day_request() -> TripRequest {
    denver_omaha(550.0, 8.8)
}

fn single_day_expectation(outcome: &Outcome) -> anyhow::Result<()> {
    let plan = planned(outcome)?;
    let breaks = arrivals(plan, StopType::Break30);
    ensure!(breaks.len() == 1, "expected one break, got {}", breaks.len());
    ensure!(close(breaks[0], 9.0), "break taken at {}h, expected 9h", breaks[0]);
    ensure!(
        plan.stops_of(StopType::Rest) == 0,
        "single-day haul should not rest"
    );
    ensure!(plan.trip.num_days == 1, "expected one log day");
    ensure!(
        close(plan.trip.total_trip_hours, 11.3),
        "trip took {}h, expected 11.3h",
        plan.trip.total_trip_hours
    );
    Ok(())
}

fn multi_day_request() -> TripRequest {
    denver_omaha(1200.0, 20.0)
}

fn multi_day_expectation(outcome: &Outcome) -> anyhow::Result<()> {
    let plan = planned(outcome)?;
    ensure!(plan.stops_of(StopType::Rest) >= 1, "expected a 10-hour rest");
    let fuel: Vec<f64> = plan
        .stops
        .iter()
        .filter(|stop| stop.stop_type == StopType::Fuel)
        .map(|stop| stop.odometer)
        .collect();
    ensure!(fuel.len() == 1, "expected one fuel stop, got {}", fuel.len());
    ensure!(close(fuel[0], 1000.0), "fueled at {} mi", fuel[0]);
    ensure!(plan.trip.num_days == 2, "expected two log days");
    Ok(())
}

fn cycle_restart_request() -> TripRequest {
    let mut request = denver_omaha(300.0, 5.0);
    request.current_cycle_used = 68.0;
    request
}

fn cycle_restart_expectation(outcome: &Outcome) -> anyhow::Result<()> {
    let plan = planned(outcome)?;
    ensure!(
        plan.hos_rules_applied.restarts_taken == 1,
        "expected one restart, got {}",
        plan.hos_rules_applied.restarts_taken
    );
    let restart = plan
        .stops
        .iter()
        .find(|stop| stop.cycle_reset)
        .ok_or_else(|| anyhow::anyhow!("restart stop missing"))?;
    ensure!(close(restart.duration_hours, 34.0), "restart is not 34 hours");
    ensure!(
        close(restart.arrive_hour, 2.0),
        "restart began at {}h, expected 2h",
        restart.arrive_hour
    );
    Ok(())
}

fn restart_disabled_request() -> TripRequest {
    let mut request = cycle_restart_request();
    request.enable_34h_restart = false;
    request
}

fn restart_disabled_expectation(outcome: &Outcome) -> anyhow::Result<()> {
    match outcome {
        Err(PlanError::Schedule(ScheduleError::CycleExhausted { .. })) => Ok(()),
        Err(other) => anyhow::bail!("unexpected error: {other}"),
        Ok(_) => anyhow::bail!("plan succeeded without a restart"),
    }
}

fn adverse_request() -> TripRequest {
    let mut request = denver_omaha(687.5, 12.5);
    request.adverse_driving_conditions = true;
    request
}

fn adverse_expectation(outcome: &Outcome) -> anyhow::Result<()> {
    let plan = planned(outcome)?;
    ensure!(
        plan.stops_of(StopType::Rest) == 0,
        "adverse allowance should avoid a rest"
    );
    ensure!(
        close(plan.trip.total_drive_hours, 12.5),
        "drove {}h",
        plan.trip.total_drive_hours
    );
    Ok(())
}

fn sixty_hour_request() -> TripRequest {
    let mut request = denver_omaha(300.0, 5.0);
    request.cycle_rule = CycleRule::SixtySeven;
    request.current_cycle_used = 58.0;
    request
}

fn sixty_hour_expectation(outcome: &Outcome) -> anyhow::Result<()> {
    let plan = planned(outcome)?;
    ensure!(
        close(plan.hos_rules_applied.cycle_limit_hours, 60.0),
        "cycle limit should be 60h"
    );
    ensure!(
        plan.hos_rules_applied.restarts_taken == 1,
        "expected one restart"
    );
    Ok(())
}

fn short_haul_request() -> TripRequest {
    let mut request = TripRequest::new(
        GeoPoint::new("Denver, CO", DENVER[0], DENVER[1]),
        GeoPoint::new("Denver, CO", DENVER[0], DENVER[1]),
        GeoPoint::new("Brighton, CO", BRIGHTON[0], BRIGHTON[1]),
    );
    request.short_haul_mode = ShortHaulMode::AirMile150;
    request.legs = Some(vec![
        leg(LegKind::ToPickup, DENVER, DENVER, 0.0, 0.0),
        leg(LegKind::ToDropoff, DENVER, BRIGHTON, 500.0, 10.0),
    ]);
    request
}

fn short_haul_expectation(outcome: &Outcome) -> anyhow::Result<()> {
    let plan = planned(outcome)?;
    ensure!(
        plan.stops_of(StopType::Break30) == 0,
        "short-haul trip took a break"
    );
    ensure!(
        plan.hos_rules_applied.break_after_hours.is_none(),
        "break rule should be exempt"
    );
    Ok(())
}

fn return_trip_request() -> TripRequest {
    let mut request = denver_omaha(300.0, 5.0);
    request.return_to_reporting_location = true;
    if let Some(legs) = request.legs.as_mut() {
        legs.push(leg(LegKind::ReturnToOrigin, OMAHA, DENVER, 300.0, 5.0));
    }
    request
}

fn return_trip_expectation(outcome: &Outcome) -> anyhow::Result<()> {
    let plan = planned(outcome)?;
    ensure!(
        close(plan.trip.total_distance_miles, 600.0),
        "distance {} mi",
        plan.trip.total_distance_miles
    );
    ensure!(
        plan.stops.last().map(|stop| stop.stop_type) == Some(StopType::Dropoff),
        "last stop should be the dropoff"
    );
    ensure!(
        close(plan.trip.total_trip_hours, 12.0),
        "trip took {}h",
        plan.trip.total_trip_hours
    );
    Ok(())
}

fn straight_line_request() -> TripRequest {
    TripRequest::new(
        GeoPoint::new("Dallas, TX", 32.78, -96.80),
        GeoPoint::new("Dallas, TX", 32.78, -96.80),
        GeoPoint::new("Houston, TX", 29.76, -95.37),
    )
}

fn straight_line_expectation(outcome: &Outcome) -> anyhow::Result<()> {
    let plan = planned(outcome)?;
    let miles = plan.trip.total_distance_miles;
    ensure!(
        (200.0..400.0).contains(&miles),
        "routed {miles} mi between Dallas and Houston"
    );
    ensure!(
        plan.stops_of(StopType::Dropoff) == 1,
        "expected one dropoff"
    );
    ensure!(plan.trip.num_days == 1, "expected one log day");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_keys_are_unique() {
        let mut keys: Vec<&str> = catalog().iter().map(|scenario| scenario.key).collect();
        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }

    #[test]
    fn every_scenario_passes() {
        for scenario in catalog() {
            let result = run_scenario(&scenario, false);
            assert!(result.passed, "{}: {:?}", scenario.key, result.failures);
        }
    }

    #[test]
    fn failing_expectation_is_reported() {
        let scenario = PlanScenario {
            expectation: restart_disabled_expectation,
            ..find_scenario("single-day").unwrap()
        };
        let result = run_scenario(&scenario, false);
        assert!(!result.passed);
        assert!(result.failures[0].contains("without a restart"));
        assert!(result.summary.is_some());
    }

    #[test]
    fn error_outcomes_have_no_summary() {
        let result = run_scenario(&find_scenario("restart-disabled").unwrap(), false);
        assert!(result.passed);
        assert!(result.summary.is_none());
    }

    #[test]
    fn unknown_key_is_not_found() {
        assert!(find_scenario("moon-run").is_none());
        assert_eq!(list_scenarios().len(), catalog().len());
    }
}
