use std::hash::Hasher;

use hos_engine::{
    CycleRule, DriveParameters, DutyStatus, GeoPoint, LegKind, PlannerConfig, RouteLeg,
    StopType, TripPlan, TripRequest, plan_trip,
};
use twox_hash::XxHash64;

const ORIGIN: [f64; 2] = [33.45, -112.07];
const DEST: [f64; 2] = [35.08, -106.65];
const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
struct Case {
    miles: f64,
    speed: f64,
    cycle_used: f64,
    cycle_rule: CycleRule,
    adverse: bool,
    start_hour: f64,
}

fn grid() -> Vec<Case> {
    let mut cases = Vec::new();
    for miles in [150.0, 620.0, 1_400.0, 2_650.0] {
        for speed in [48.0, 61.5] {
            for cycle_used in [0.0, 35.0, 58.5] {
                for cycle_rule in [CycleRule::SeventyEight, CycleRule::SixtySeven] {
                    for adverse in [false, true] {
                        for start_hour in [0.0, 7.25] {
                            cases.push(Case {
                                miles,
                                speed,
                                cycle_used,
                                cycle_rule,
                                adverse,
                                start_hour,
                            });
                        }
                    }
                }
            }
        }
    }
    cases
}

fn run(case: Case) -> TripPlan {
    let mut request = TripRequest::new(
        GeoPoint::new("Phoenix, AZ", ORIGIN[0], ORIGIN[1]),
        GeoPoint::new("Phoenix, AZ", ORIGIN[0], ORIGIN[1]),
        GeoPoint::new("Albuquerque, NM", DEST[0], DEST[1]),
    );
    request.current_cycle_used = case.cycle_used;
    request.cycle_rule = case.cycle_rule;
    request.adverse_driving_conditions = case.adverse;
    let legs = vec![
        RouteLeg {
            kind: LegKind::ToPickup,
            coordinates: vec![ORIGIN],
            distance_miles: 0.0,
            duration_hours: 0.0,
            instructions: Vec::new(),
        },
        RouteLeg {
            kind: LegKind::ToDropoff,
            coordinates: vec![ORIGIN, [34.3, -109.4], DEST],
            distance_miles: case.miles,
            duration_hours: case.miles / case.speed,
            instructions: Vec::new(),
        },
    ];
    let config = PlannerConfig {
        planned_start_hour: case.start_hour,
        ..PlannerConfig::default()
    };
    plan_trip(&request, legs, &config).unwrap_or_else(|err| panic!("{case:?}: {err}"))
}

fn log_periods(plan: &TripPlan) -> impl Iterator<Item = (DutyStatus, f64)> + '_ {
    plan.eld_logs
        .iter()
        .flat_map(|day| day.periods.iter())
        .map(|period| (period.status, period.duration))
}

#[test]
fn every_log_day_sums_to_twenty_four_hours() {
    for case in grid() {
        let plan = run(case);
        for day in &plan.eld_logs {
            assert!(
                (day.total_hours() - 24.0).abs() < TOLERANCE,
                "{case:?} day {} sums to {}",
                day.day_index,
                day.total_hours()
            );
            assert!(
                (day.total_on_duty_hours + day.total_off_duty_hours - 24.0).abs() < TOLERANCE,
                "{case:?} day {} totals",
                day.day_index
            );
            for period in &day.periods {
                assert!(period.start_hour_of_day >= -TOLERANCE);
                assert!(period.end_hour_of_day <= 24.0 + TOLERANCE);
                assert!(period.duration > 0.0);
            }
        }
    }
}

#[test]
fn fuel_stops_are_never_more_than_a_thousand_miles_apart() {
    for case in grid() {
        let plan = run(case);
        let mut marks: Vec<f64> = vec![0.0];
        marks.extend(
            plan.stops
                .iter()
                .filter(|stop| stop.stop_type == StopType::Fuel)
                .map(|stop| stop.odometer),
        );
        marks.push(plan.trip.total_distance_miles);
        for pair in marks.windows(2) {
            assert!(
                pair[1] - pair[0] <= 1000.0 + TOLERANCE,
                "{case:?}: {} -> {}",
                pair[0],
                pair[1]
            );
        }
    }
}

/// Replays the log independently of the engine's clock.
#[test]
fn shift_break_and_cycle_limits_hold() {
    for case in grid() {
        let plan = run(case);
        let limits = DriveParameters {
            current_cycle_used_hours: case.cycle_used,
            cycle_rule: case.cycle_rule,
            adverse_driving_conditions: case.adverse,
            ..DriveParameters::default()
        }
        .limits();

        let mut leading_pad = case.start_hour;
        let mut shift_drive = 0.0;
        let mut window = 0.0;
        let mut since_break = 0.0;
        let mut cycle = case.cycle_used;
        let mut off_streak = 0.0;
        let mut idle_streak = 0.0;
        for (status, duration) in log_periods(&plan) {
            let mut duration = duration;
            if leading_pad > 0.0 {
                // Day-one padding before the trip starts is not part of the duty record.
                let skipped = duration.min(leading_pad);
                leading_pad -= skipped;
                duration -= skipped;
                if duration <= TOLERANCE {
                    continue;
                }
            }
            match status {
                DutyStatus::Driving => {
                    shift_drive += duration;
                    window += duration;
                    since_break += duration;
                    cycle += duration;
                    off_streak = 0.0;
                    idle_streak = 0.0;
                    assert!(shift_drive <= limits.drive_hours + TOLERANCE, "{case:?} shift");
                    assert!(window <= limits.window_hours + TOLERANCE, "{case:?} window");
                    assert!(since_break <= 8.0 + TOLERANCE, "{case:?} break");
                }
                DutyStatus::OnDutyNotDriving => {
                    window += duration;
                    cycle += duration;
                    off_streak = 0.0;
                    idle_streak += duration;
                }
                DutyStatus::OffDuty | DutyStatus::Sleeper => {
                    window += duration;
                    off_streak += duration;
                    idle_streak += duration;
                }
            }
            if idle_streak >= 0.5 - TOLERANCE {
                since_break = 0.0;
            }
            if off_streak >= 10.0 - TOLERANCE {
                shift_drive = 0.0;
                window = 0.0;
            }
            if off_streak >= 34.0 - TOLERANCE {
                cycle = 0.0;
            }
            assert!(cycle <= limits.cycle_hours + TOLERANCE, "{case:?} cycle {cycle}");
        }
    }
}

#[test]
fn restarts_only_happen_when_the_cycle_runs_dry() {
    for case in grid() {
        let plan = run(case);
        let remaining = case.cycle_rule.limit_hours() - case.cycle_used;
        let on_duty_before_dropoff = plan.trip.total_drive_hours + 2.0;
        if plan.hos_rules_applied.restarts_taken > 0 {
            assert!(
                on_duty_before_dropoff > remaining - TOLERANCE,
                "{case:?} restarted with {remaining}h left"
            );
        } else {
            assert!(on_duty_before_dropoff <= remaining + TOLERANCE, "{case:?}");
        }
    }
}

fn digest(plan: &TripPlan) -> (String, u64) {
    let json = serde_json::to_string(plan).expect("serialize plan");
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(json.as_bytes());
    (json, hasher.finish())
}

#[test]
fn identical_inputs_serialize_identically() {
    for case in grid().into_iter().step_by(7) {
        let (first_json, first) = digest(&run(case));
        let (second_json, second) = digest(&run(case));
        assert_eq!(first, second, "{case:?}");
        assert_eq!(first_json, second_json);
    }
}
