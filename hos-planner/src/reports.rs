use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use hos_engine::numbers::{day_clock, format_clock, usize_to_f64};
use hos_engine::{DutyStatus, Stop, TripPlan};

use crate::scenarios::ScenarioResult;

fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    usize_to_f64(passed) / usize_to_f64(total) * 100.0
}

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Scenario Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "===========================".cyan())?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    writeln!(out, "Total scenarios: {total}")?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", (total - passed).to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(passed, total))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(out, "{status} {}", result.scenario_name.bold())?;
        if let Some(summary) = &result.summary {
            writeln!(
                out,
                "   {:.1} mi, {:.2} h, {} day(s), {} stops, {} restart(s)",
                summary.total_distance_miles,
                summary.total_trip_hours,
                summary.num_days,
                summary.stops,
                summary.restarts
            )?;
        }
        writeln!(out, "   Time: {:?}", result.duration)?;
        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# HOS Planner Scenario Results\n")?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenarios**: {total}")?;
    writeln!(out, "- **Passed**: {passed}")?;
    writeln!(out, "- **Failed**: {}", total - passed)?;
    writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(passed, total))?;

    writeln!(out, "## Detailed Results\n")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(out, "### {status} {}\n", result.scenario_name)?;
        writeln!(out, "- **Key**: `{}`", result.scenario_key)?;
        if let Some(summary) = &result.summary {
            writeln!(
                out,
                "- **Plan**: {:.1} mi, {:.2} h over {} day(s)",
                summary.total_distance_miles, summary.total_trip_hours, summary.num_days
            )?;
        }
        if !result.failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn generate_csv_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(
        out,
        "scenario,passed,distance_miles,trip_hours,days,stops,restarts,duration_ms"
    )?;
    for result in results {
        let (miles, hours, days, stops, restarts) =
            result.summary.as_ref().map_or_else(Default::default, |s| {
                (
                    format!("{:.1}", s.total_distance_miles),
                    format!("{:.2}", s.total_trip_hours),
                    s.num_days.to_string(),
                    s.stops.to_string(),
                    s.restarts.to_string(),
                )
            });
        writeln!(
            out,
            "{},{},{miles},{hours},{days},{stops},{restarts},{}",
            result.scenario_key,
            result.passed,
            result.duration.as_millis()
        )?;
    }
    Ok(())
}

/// Day number and wall clock for a trip-relative hour.
fn wall_clock(plan: &TripPlan, trip_hour: f64) -> String {
    let (day, clock) = day_clock(trip_hour + plan.trip.planned_start_hour);
    format!("Day {day} {clock}")
}

fn status_label(status: DutyStatus) -> &'static str {
    match status {
        DutyStatus::OffDuty => "Off Duty",
        DutyStatus::Sleeper => "Sleeper Berth",
        DutyStatus::Driving => "Driving",
        DutyStatus::OnDutyNotDriving => "On Duty (Not Driving)",
    }
}

fn stop_line(plan: &TripPlan, stop: &Stop) -> String {
    format!(
        "{} | {:>7.1} mi | {:>5.2} h | {}",
        wall_clock(plan, stop.arrive_hour),
        stop.odometer,
        stop.duration_hours,
        stop.label
    )
}

pub fn write_plan_console(out: &mut dyn Write, plan: &TripPlan) -> Result<()> {
    let trip = &plan.trip;
    writeln!(out, "{}", "🚚 Trip Plan".bright_cyan().bold())?;
    writeln!(out, "{}", "===========".cyan())?;
    if let Some(plan_id) = plan.plan_id {
        writeln!(out, "Plan #{plan_id}")?;
    }
    writeln!(
        out,
        "{} → {} → {}",
        trip.current_location.label, trip.pickup_location.label, trip.dropoff_location.label
    )?;
    writeln!(
        out,
        "Distance: {:.1} mi | Driving: {:.2} h | Total: {:.2} h | Days: {}",
        trip.total_distance_miles, trip.total_drive_hours, trip.total_trip_hours, trip.num_days
    )?;
    let rules = &plan.hos_rules_applied;
    writeln!(
        out,
        "Rules: {} cycle ({} h), drive {} h, window {} h, restarts {}",
        rules.cycle_rule.label(),
        rules.cycle_limit_hours,
        rules.drive_limit_hours,
        rules.window_limit_hours,
        rules.restarts_taken
    )?;
    writeln!(out)?;

    writeln!(out, "{}", "📍 Stops".bright_yellow().bold())?;
    for stop in &plan.stops {
        let line = stop_line(plan, stop);
        if stop.cycle_reset {
            writeln!(out, "  {}", line.magenta())?;
        } else {
            writeln!(out, "  {line}")?;
        }
    }
    writeln!(out)?;

    writeln!(out, "{}", "📒 Daily Logs".bright_yellow().bold())?;
    for day in &plan.eld_logs {
        writeln!(
            out,
            "{} ({}): driving {:.2} h, on duty {:.2} h, off duty {:.2} h, odometer {:.1} → {:.1}",
            format!("Day {}", day.day_index).bold(),
            day.date_label,
            day.total_driving_hours,
            day.total_on_duty_hours,
            day.total_off_duty_hours,
            day.odometer_start,
            day.odometer_end
        )?;
        for period in &day.periods {
            writeln!(
                out,
                "    {}-{} {:<22} {}",
                format_clock(period.start_hour_of_day),
                format_clock(period.end_hour_of_day),
                status_label(period.status),
                period.note
            )?;
        }
        for remark in &day.remarks {
            writeln!(out, "    · {remark}")?;
        }
    }
    Ok(())
}

pub fn write_plan_json(out: &mut dyn Write, plan: &TripPlan) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(plan)?)?;
    Ok(())
}

pub fn write_plan_markdown(out: &mut dyn Write, plan: &TripPlan) -> Result<()> {
    let trip = &plan.trip;
    writeln!(out, "# Trip Plan\n")?;
    writeln!(
        out,
        "- **Route**: {} → {} → {}",
        trip.current_location.label, trip.pickup_location.label, trip.dropoff_location.label
    )?;
    writeln!(out, "- **Distance**: {:.1} mi", trip.total_distance_miles)?;
    writeln!(out, "- **Driving**: {:.2} h", trip.total_drive_hours)?;
    writeln!(out, "- **Total**: {:.2} h over {} day(s)\n", trip.total_trip_hours, trip.num_days)?;

    writeln!(out, "## Stops\n")?;
    writeln!(out, "| When | Stop | Odometer | Duration |")?;
    writeln!(out, "|------|------|----------|----------|")?;
    for stop in &plan.stops {
        writeln!(
            out,
            "| {} | {} | {:.1} mi | {:.2} h |",
            wall_clock(plan, stop.arrive_hour),
            stop.label,
            stop.odometer,
            stop.duration_hours
        )?;
    }
    writeln!(out)?;

    for day in &plan.eld_logs {
        writeln!(out, "## Day {} ({})\n", day.day_index, day.date_label)?;
        writeln!(out, "| From | To | Status | Note |")?;
        writeln!(out, "|------|----|--------|------|")?;
        for period in &day.periods {
            writeln!(
                out,
                "| {} | {} | {} | {} |",
                format_clock(period.start_hour_of_day),
                format_clock(period.end_hour_of_day),
                status_label(period.status),
                period.note
            )?;
        }
        writeln!(
            out,
            "\nDriving {:.2} h, on duty {:.2} h, off duty {:.2} h.\n",
            day.total_driving_hours, day.total_on_duty_hours, day.total_off_duty_hours
        )?;
    }
    Ok(())
}

/// One row per log period, suitable for spreadsheet import.
pub fn write_plan_csv(out: &mut dyn Write, plan: &TripPlan) -> Result<()> {
    writeln!(out, "day,date,status,start_hour_of_day,end_hour_of_day,duration,note")?;
    for day in &plan.eld_logs {
        for period in &day.periods {
            writeln!(
                out,
                "{},{},{},{:.4},{:.4},{:.4},\"{}\"",
                day.day_index,
                day.date_label,
                period.status.key(),
                period.start_hour_of_day,
                period.end_hour_of_day,
                period.duration,
                period.note.replace('"', "\"\"")
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::PlanDigest;
    use hos_engine::{GeoPoint, PlannerConfig, RouteProvider, StraightLineRouter, TripRequest};

    fn sample_plan() -> TripPlan {
        let request = TripRequest::new(
            GeoPoint::new("Reno, NV", 39.53, -119.81),
            GeoPoint::new("Reno, NV", 39.53, -119.81),
            GeoPoint::new("Salt Lake City, UT", 40.76, -111.89),
        );
        let legs = StraightLineRouter::default()
            .route(&request.endpoints(), false)
            .unwrap();
        hos_engine::plan_trip(&request, legs, &PlannerConfig::default()).unwrap()
    }

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_key: "single-day".to_string(),
            scenario_name: "Single-day haul".to_string(),
            passed,
            failures: if passed {
                Vec::new()
            } else {
                vec!["break taken at 8h".to_string()]
            },
            summary: Some(PlanDigest {
                total_distance_miles: 550.0,
                total_trip_hours: 11.3,
                num_days: 1,
                stops: 4,
                restarts: 0,
            }),
            duration: Duration::from_millis(3),
        }
    }

    fn render(f: impl FnOnce(&mut dyn Write) -> Result<()>) -> String {
        let mut buffer = Vec::new();
        f(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn console_report_lists_failures() {
        let results = [sample_result(true), sample_result(false)];
        let text = render(|out| generate_console_report(out, &results, Duration::from_secs(1)));
        assert!(text.contains("Scenario Results Summary"));
        assert!(text.contains("Success rate: 50.0%"));
        assert!(text.contains("break taken at 8h"));
    }

    #[test]
    fn csv_report_has_header_and_rows() {
        let text = render(|out| generate_csv_report(out, &[sample_result(true)]));
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("scenario,passed,distance_miles,trip_hours,days,stops,restarts,duration_ms")
        );
        assert_eq!(lines.next(), Some("single-day,true,550.0,11.30,1,4,0,3"));
    }

    #[test]
    fn markdown_report_handles_empty_results() {
        let text = render(|out| generate_markdown_report(out, &[]));
        assert!(text.contains("Success rate**: 0.0%"));
    }

    #[test]
    fn plan_console_shows_stops_and_days() {
        let plan = sample_plan();
        let text = render(|out| write_plan_console(out, &plan));
        assert!(text.contains("Trip Plan"));
        assert!(text.contains("Day 1 00:00"));
        assert!(text.contains("Dropoff Location"));
        assert!(text.contains("Daily Logs"));
    }

    #[test]
    fn plan_csv_rows_cover_every_period() {
        let plan = sample_plan();
        let text = render(|out| write_plan_csv(out, &plan));
        let periods: usize = plan.eld_logs.iter().map(|day| day.periods.len()).sum();
        assert_eq!(text.lines().count(), periods + 1);
        assert!(text.contains(",driving,"));
    }

    #[test]
    fn plan_markdown_has_a_section_per_day() {
        let plan = sample_plan();
        let text = render(|out| write_plan_markdown(out, &plan));
        assert_eq!(text.matches("## Day ").count(), plan.eld_logs.len());
    }

    #[test]
    fn wall_clock_applies_planned_start() {
        let mut plan = sample_plan();
        plan.trip.planned_start_hour = 20.0;
        assert_eq!(wall_clock(&plan, 5.5), "Day 2 01:30");
    }
}
