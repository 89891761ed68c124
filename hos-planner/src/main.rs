mod reports;
mod scenarios;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use colored::Colorize;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use hos_engine::{
    MemoryPlanStore, PlannerConfig, StraightLineRouter, TripPlan, TripPlanner, TripRequest,
};
use scenarios::{ScenarioResult, catalog, find_scenario, list_scenarios, run_scenario};

#[derive(Debug, Parser)]
#[command(name = "hos-planner", version)]
#[command(about = "Plan Hours-of-Service compliant truck trips and run acceptance scenarios")]
struct Args {
    /// Trip request JSON to plan instead of running scenarios
    #[arg(long)]
    request: Option<PathBuf>,

    /// Scenarios to run (comma-separated, "all" for the full catalog)
    #[arg(long, default_value = "all")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Planner configuration JSON applied to --request
    #[arg(long)]
    config: Option<PathBuf>,

    /// Calendar date of the first log day (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Clock hour the trip starts on day one
    #[arg(long)]
    start_hour: Option<f64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    if let Some(path) = args.request.as_deref() {
        let config = load_config(&args)?;
        let request = load_request(path, args.start_date)?;
        let plan = plan_request(&request, config)?;
        return write_plan(&args, &plan);
    }

    if args.report == "console" && args.output.is_none() {
        announce_banner();
    }
    let start_time = Instant::now();
    let results = run_scenarios(&expand_scenarios(&args.scenarios), args.verbose);
    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }
    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:20} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🚛 HOS Trip Planner".bright_cyan().bold());
    println!("{}", "===================".cyan());
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for scenario in catalog() {
            if !scenarios.iter().any(|s| s == scenario.key) {
                scenarios.push(scenario.key.to_string());
            }
        }
    }
    scenarios
}

fn run_scenarios(keys: &[String], verbose: bool) -> Vec<ScenarioResult> {
    let mut results = Vec::with_capacity(keys.len());
    for key in keys {
        match find_scenario(key) {
            Some(scenario) => results.push(run_scenario(&scenario, verbose)),
            None => eprintln!("⚠️  Unknown scenario: {}", key.yellow()),
        }
    }
    results
}

fn load_config(args: &Args) -> Result<PlannerConfig> {
    let mut config = match args.config.as_deref() {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid planner config in {}", path.display()))?
        }
        None => PlannerConfig::default(),
    };
    if let Some(hour) = args.start_hour {
        config.planned_start_hour = hour;
    }
    Ok(config)
}

fn load_request(path: &Path, start_date: Option<NaiveDate>) -> Result<TripRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut request: TripRequest = serde_json::from_str(&text)
        .with_context(|| format!("invalid trip request in {}", path.display()))?;
    if start_date.is_some() {
        request.trip_start_date = start_date;
    }
    Ok(request)
}

fn plan_request(request: &TripRequest, config: PlannerConfig) -> Result<TripPlan> {
    let planner = TripPlanner::new(config, StraightLineRouter::default(), MemoryPlanStore::new());
    let plan = planner
        .plan_and_store(request)
        .context("trip planning failed")?;
    info!(
        "plan {:?}: {} stops across {} day(s)",
        plan.plan_id,
        plan.stops.len(),
        plan.trip.num_days
    );
    Ok(plan)
}

fn write_plan(args: &Args, plan: &TripPlan) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report.as_str() {
        "json" => reports::write_plan_json(&mut output_target, plan)?,
        "markdown" => reports::write_plan_markdown(&mut output_target, plan)?,
        "csv" => reports::write_plan_csv(&mut output_target, plan)?,
        _ => reports::write_plan_console(&mut output_target, plan)?,
    }
    output_target.flush_inner()?;
    Ok(())
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, results)?,
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# HOS Planner Scenario Results\n\n_No scenarios executed._"
                )?;
            } else {
                reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        "csv" => reports::generate_csv_report(&mut output_target, results)?,
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target, "🏁 Total time: {:?}", start_time.elapsed())?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn base_args() -> Args {
        Args {
            request: None,
            scenarios: "single-day".to_string(),
            list_scenarios: false,
            report: "json".to_string(),
            output: None,
            config: None,
            start_date: None,
            start_hour: None,
            verbose: false,
        }
    }

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hos-planner-{label}-{}", std::process::id()))
    }

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_key: "single-day".to_string(),
            scenario_name: "Single-day haul".to_string(),
            passed,
            failures: Vec::new(),
            summary: None,
            duration: Duration::from_millis(2),
        }
    }

    const REQUEST_JSON: &str = r#"{
        "current_location": {"label": "Tulsa, OK", "lat": 36.15, "lng": -95.99},
        "pickup_location": {"label": "Tulsa, OK", "lat": 36.15, "lng": -95.99},
        "dropoff_location": {"label": "Wichita, KS", "lat": 37.69, "lng": -97.34}
    }"#;

    #[test]
    fn expands_all_scenarios_keyword() {
        let expanded = expand_scenarios("multi-day, all");
        assert_eq!(expanded[0], "multi-day");
        assert_eq!(expanded.len(), catalog().len());
        assert!(expanded.contains(&"straight-line".to_string()));
    }

    #[test]
    fn expand_scenarios_without_all_preserves_order() {
        let expanded = expand_scenarios("short-haul,single-day,");
        assert_eq!(expanded, vec!["short-haul".to_string(), "single-day".to_string()]);
    }

    #[test]
    fn unknown_scenarios_are_skipped() {
        let results = run_scenarios(&["moon-run".to_string(), "single-day".to_string()], false);
        assert_eq!(results.len(), 1);
        assert!(results[0].passed);
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let temp = temp_path("list.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("cycle-restart"));
    }

    #[test]
    fn maybe_list_scenarios_returns_false_when_disabled() {
        assert!(!maybe_list_scenarios(&base_args()).unwrap());
    }

    #[test]
    fn write_reports_emits_json_for_results() {
        let temp = temp_path("report.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(true)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("\"scenario_key\": \"single-day\""));
    }

    #[test]
    fn write_reports_markdown_empty_results() {
        let temp = temp_path("report.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("No scenarios executed"));
    }

    #[test]
    fn write_reports_console_includes_total_time() {
        let temp = temp_path("report.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(false)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("FAIL"));
        assert!(content.contains("Total time"));
    }

    #[test]
    fn request_file_plans_and_stores() {
        let path = temp_path("request.json");
        std::fs::write(&path, REQUEST_JSON).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 7, 4);
        let request = load_request(&path, date).unwrap();
        assert_eq!(request.trip_start_date, date);

        let args = Args {
            start_hour: Some(6.0),
            ..base_args()
        };
        let config = load_config(&args).unwrap();
        let plan = plan_request(&request, config).unwrap();
        assert_eq!(plan.plan_id, Some(1));
        assert!((plan.trip.planned_start_hour - 6.0).abs() < f64::EPSILON);
        assert_eq!(plan.eld_logs[0].date_label, "07/04/2024");
    }

    #[test]
    fn config_file_overrides_defaults() {
        let path = temp_path("config.json");
        std::fs::write(&path, r#"{"fuel_stop_hours": 0.25, "pickup_hours": 2.0}"#).unwrap();
        let args = Args {
            config: Some(path),
            ..base_args()
        };
        let config = load_config(&args).unwrap();
        assert!((config.fuel_stop_hours - 0.25).abs() < f64::EPSILON);
        assert!((config.pickup_hours - 2.0).abs() < f64::EPSILON);
        assert!((config.fuel_interval_miles - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_request_file_is_an_error() {
        let err = load_request(Path::new("/nonexistent/hos-request.json"), None).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read"));
    }

    #[test]
    fn write_plan_emits_csv() {
        let temp = temp_path("plan.csv");
        let request: TripRequest = serde_json::from_str(REQUEST_JSON).unwrap();
        let plan = plan_request(&request, PlannerConfig::default()).unwrap();
        let args = Args {
            report: "csv".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_plan(&args, &plan).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.starts_with("day,date,status"));
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
