//! HOS Trip Planning Engine
//!
//! Regulation-aware duty scheduling for property-carrying truck trips.
//! Given routed legs and the driver's cycle position, the engine simulates
//! driving, breaks, rests, restarts, fuel and dock time under U.S. federal
//! Hours-of-Service limits and renders the result as per-day ELD log sheets.
//! Routing and persistence are traits so platform code can plug in its own.

pub mod clock;
pub mod config;
pub mod constants;
pub mod eld;
pub mod numbers;
pub mod params;
pub mod plan;
pub mod policy;
pub mod route;
pub mod schedule;
pub mod store;

// Re-export commonly used types
pub use clock::{CycleState, HosClock};
pub use config::PlannerConfig;
pub use eld::{DayLog, EldLogBuilder, LogPeriod, split_at_midnight};
pub use params::{CycleRule, DriveParameters, HosLimits, ParameterError, ShortHaulMode};
pub use plan::{
    HosRulesApplied, PlanError, RouteSummary, TripPlan, TripPlanAssembler, TripRequest,
    TripSummary, plan_trip,
};
pub use policy::{RuleId, StepContext, StopAction, StopPolicy};
pub use route::{
    Endpoints, FixtureRoutes, GeoPoint, Instruction, LegKind, ProviderUnavailable, Route,
    RouteError, RouteLeg, RouteProvider, StraightLineRouter, haversine_miles,
};
pub use schedule::{
    DutyPeriod, DutyStatus, ScheduleError, ScheduleSimulator, Stop, StopType, Timeline, TripPhase,
};
pub use store::{MemoryPlanStore, PlanStore, StoreError, clamp_recent_limit};

/// Engine facade binding a routing provider and a plan store to the pipeline.
pub struct TripPlanner<R, S>
where
    R: RouteProvider,
    S: PlanStore,
{
    config: PlannerConfig,
    router: R,
    store: S,
}

impl<R, S> TripPlanner<R, S>
where
    R: RouteProvider,
    S: PlanStore,
{
    /// Create a planner with the provided config, router and store
    pub const fn new(config: PlannerConfig, router: R, store: S) -> Self {
        Self {
            config,
            router,
            store,
        }
    }

    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Legs supplied on the request win over the router.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Upstream`] when the router fails.
    pub fn resolve_legs(&self, request: &TripRequest) -> Result<Vec<RouteLeg>, PlanError> {
        if let Some(legs) = &request.legs {
            return Ok(legs.clone());
        }
        self.router
            .route(&request.endpoints(), request.return_to_reporting_location)
            .map_err(|err| PlanError::Upstream(anyhow::Error::new(err)))
    }

    /// Plan a trip without storing it.
    ///
    /// # Errors
    ///
    /// Returns an error if routing, validation or scheduling fails.
    pub fn plan(&self, request: &TripRequest) -> Result<TripPlan, PlanError> {
        let legs = self.resolve_legs(request)?;
        plan_trip(request, legs, &self.config)
    }

    /// Plan a trip and record it in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if planning fails or the store rejects the plan.
    pub fn plan_and_store(&self, request: &TripRequest) -> Result<TripPlan, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let plan = self.plan(request)?;
        self.store.save_plan(plan).map_err(Into::into)
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn latest(&self) -> Result<Option<TripPlan>, S::Error> {
        self.store.latest_plan()
    }

    /// Recent plans, newest first, with the limit clamped to the history bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn recent(&self, limit: Option<usize>) -> Result<Vec<TripPlan>, S::Error> {
        self.store.recent_plans(clamp_recent_limit(limit))
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn plan_by_id(&self, plan_id: u64) -> Result<Option<TripPlan>, S::Error> {
        self.store.load_plan(plan_id)
    }
}
