//! Ordered stop rules deciding the next action of the simulator.
//!
//! Each rule pairs a predicate with an action builder. [`StopPolicy::decide`]
//! walks the table top to bottom and the first predicate that holds wins, so
//! the order of [`STOP_RULES`] is the priority order.

use serde::Serialize;

use crate::clock::{CycleState, HosClock};
use crate::config::PlannerConfig;
use crate::numbers::{HOUR_EPSILON, MILE_EPSILON};
use crate::route::Waypoint;

/// Inputs a rule may inspect for one step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub clock: HosClock<'a>,
    pub state: &'a CycleState,
    pub config: &'a PlannerConfig,
    /// Arrived at a waypoint whose work has not been performed yet.
    pub pending_work: Option<Waypoint>,
    pub remaining_leg_hours: f64,
    pub leg_speed_mph: f64,
}

impl StepContext<'_> {
    #[must_use]
    pub const fn about_to_drive(&self) -> bool {
        self.pending_work.is_none() && self.remaining_leg_hours > HOUR_EPSILON
    }

    #[must_use]
    pub const fn work_hours(&self) -> f64 {
        match self.pending_work {
            Some(Waypoint::Pickup) => self.config.pickup_hours,
            Some(Waypoint::Dropoff) => self.config.dropoff_hours,
            None => 0.0,
        }
    }

    #[must_use]
    pub fn fuel_due(&self) -> bool {
        self.state.miles_since_fuel >= self.config.fuel_interval_miles - MILE_EPSILON
    }

    /// Driving hours until the fuel interval is reached at the current leg speed.
    #[must_use]
    pub fn hours_to_fuel(&self) -> f64 {
        if self.leg_speed_mph <= 0.0 {
            return f64::INFINITY;
        }
        ((self.config.fuel_interval_miles - self.state.miles_since_fuel) / self.leg_speed_mph)
            .max(0.0)
    }
}

/// What the simulator should do next.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StopAction {
    Work { waypoint: Waypoint, hours: f64 },
    Rest { hours: f64 },
    Restart { hours: f64 },
    CycleExhausted,
    Break { hours: f64 },
    Fuel { hours: f64 },
    Drive { hours: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    WaypointWork,
    MandatoryRest,
    CycleLimit,
    DrivingBreak,
    Fuel,
    Drive,
}

/// One predicate/action pair in the policy table.
#[derive(Clone, Copy)]
pub struct StopRule {
    pub id: RuleId,
    applies: fn(&StepContext<'_>) -> bool,
    action: fn(&StepContext<'_>) -> StopAction,
}

impl std::fmt::Debug for StopRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopRule").field("id", &self.id).finish()
    }
}

pub const STOP_RULES: &[StopRule] = &[
    StopRule {
        id: RuleId::WaypointWork,
        applies: waypoint_work_applies,
        action: waypoint_work,
    },
    StopRule {
        id: RuleId::MandatoryRest,
        applies: mandatory_rest_applies,
        action: mandatory_rest,
    },
    StopRule {
        id: RuleId::CycleLimit,
        applies: cycle_limit_applies,
        action: cycle_limit,
    },
    StopRule {
        id: RuleId::DrivingBreak,
        applies: driving_break_applies,
        action: driving_break,
    },
    StopRule {
        id: RuleId::Fuel,
        applies: fuel_applies,
        action: fuel,
    },
    StopRule {
        id: RuleId::Drive,
        applies: always,
        action: drive,
    },
];

fn waypoint_work_applies(ctx: &StepContext<'_>) -> bool {
    ctx.pending_work.is_some() && ctx.clock.cycle_has_capacity(ctx.state, ctx.work_hours())
}

fn waypoint_work(ctx: &StepContext<'_>) -> StopAction {
    StopAction::Work {
        waypoint: ctx.pending_work.unwrap_or(Waypoint::Dropoff),
        hours: ctx.work_hours(),
    }
}

fn mandatory_rest_applies(ctx: &StepContext<'_>) -> bool {
    ctx.about_to_drive() && ctx.clock.needs_rest(ctx.state)
}

fn mandatory_rest(ctx: &StepContext<'_>) -> StopAction {
    // A rest that would be followed by a restart becomes the restart.
    if ctx.clock.cycle_remaining(ctx.state) <= HOUR_EPSILON
        && let Some(hours) = restart_remaining(ctx)
    {
        return StopAction::Restart { hours };
    }
    StopAction::Rest {
        hours: ctx.clock.limits().rest_hours,
    }
}

/// Off-duty hours still needed to complete a restart, counting the current
/// off-duty streak.
fn restart_remaining(ctx: &StepContext<'_>) -> Option<f64> {
    ctx.clock
        .limits()
        .restart_hours
        .map(|hours| (hours - ctx.state.off_duty_streak_hours).max(0.0))
}

fn cycle_limit_applies(ctx: &StepContext<'_>) -> bool {
    if ctx.pending_work.is_some() {
        return !ctx.clock.cycle_has_capacity(ctx.state, ctx.work_hours());
    }
    ctx.about_to_drive()
        && (ctx.clock.cycle_remaining(ctx.state) <= HOUR_EPSILON
            || (ctx.fuel_due()
                && !ctx
                    .clock
                    .cycle_has_capacity(ctx.state, ctx.config.fuel_stop_hours)))
}

fn cycle_limit(ctx: &StepContext<'_>) -> StopAction {
    restart_remaining(ctx).map_or(StopAction::CycleExhausted, |hours| StopAction::Restart {
        hours,
    })
}

fn driving_break_applies(ctx: &StepContext<'_>) -> bool {
    ctx.about_to_drive() && ctx.clock.needs_break(ctx.state)
}

fn driving_break(ctx: &StepContext<'_>) -> StopAction {
    StopAction::Break {
        hours: ctx.clock.limits().break_hours,
    }
}

fn fuel_applies(ctx: &StepContext<'_>) -> bool {
    ctx.about_to_drive() && ctx.fuel_due()
}

fn fuel(ctx: &StepContext<'_>) -> StopAction {
    StopAction::Fuel {
        hours: ctx.config.fuel_stop_hours,
    }
}

const fn always(_ctx: &StepContext<'_>) -> bool {
    true
}

fn drive(ctx: &StepContext<'_>) -> StopAction {
    let hours = ctx
        .remaining_leg_hours
        .min(ctx.clock.drive_available(ctx.state))
        .min(ctx.hours_to_fuel())
        .max(0.0);
    StopAction::Drive { hours }
}

/// Priority-ordered rule table.
#[derive(Debug, Clone, Copy)]
pub struct StopPolicy {
    rules: &'static [StopRule],
}

impl Default for StopPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl StopPolicy {
    #[must_use]
    pub const fn standard() -> Self {
        Self { rules: STOP_RULES }
    }

    #[must_use]
    pub fn rules(&self) -> &'static [StopRule] {
        self.rules
    }

    /// Pick the first rule whose predicate holds.
    #[must_use]
    pub fn decide(&self, ctx: &StepContext<'_>) -> (RuleId, StopAction) {
        self.rules
            .iter()
            .find(|rule| (rule.applies)(ctx))
            .map_or((RuleId::Drive, drive(ctx)), |rule| {
                (rule.id, (rule.action)(ctx))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{DriveParameters, HosLimits};
    use crate::schedule::DutyStatus;

    fn context<'a>(
        limits: &'a HosLimits,
        state: &'a CycleState,
        config: &'a PlannerConfig,
        pending_work: Option<Waypoint>,
        remaining_leg_hours: f64,
    ) -> StepContext<'a> {
        StepContext {
            clock: HosClock::new(limits),
            state,
            config,
            pending_work,
            remaining_leg_hours,
            leg_speed_mph: 60.0,
        }
    }

    #[test]
    fn table_order_is_priority_order() {
        let ids: Vec<RuleId> = StopPolicy::standard().rules().iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec![
                RuleId::WaypointWork,
                RuleId::MandatoryRest,
                RuleId::CycleLimit,
                RuleId::DrivingBreak,
                RuleId::Fuel,
                RuleId::Drive,
            ]
        );
    }

    #[test]
    fn waypoint_work_beats_exhausted_window() {
        let limits = DriveParameters::default().limits();
        let clock = HosClock::new(&limits);
        let config = PlannerConfig::default();
        let state = clock.advance(
            &CycleState::seeded(0.0, &limits),
            DutyStatus::Driving,
            11.0,
            660.0,
        );
        let ctx = context(&limits, &state, &config, Some(Waypoint::Dropoff), 0.0);
        assert_eq!(
            StopPolicy::standard().decide(&ctx),
            (
                RuleId::WaypointWork,
                StopAction::Work {
                    waypoint: Waypoint::Dropoff,
                    hours: 1.0
                }
            )
        );
        let ctx = context(&limits, &state, &config, None, 2.0);
        assert_eq!(
            StopPolicy::standard().decide(&ctx),
            (RuleId::MandatoryRest, StopAction::Rest { hours: 10.0 })
        );
    }

    #[test]
    fn exhausted_cycle_restarts_or_fails() {
        let limits = DriveParameters::default().limits();
        let config = PlannerConfig::default();
        let state = CycleState::seeded(70.0, &limits);
        let ctx = context(&limits, &state, &config, None, 4.0);
        assert_eq!(
            StopPolicy::standard().decide(&ctx),
            (RuleId::CycleLimit, StopAction::Restart { hours: 34.0 })
        );

        let strict = DriveParameters {
            enable_34h_restart: false,
            ..DriveParameters::default()
        }
        .limits();
        let ctx = context(&strict, &state, &config, Some(Waypoint::Pickup), 0.0);
        assert_eq!(
            StopPolicy::standard().decide(&ctx),
            (RuleId::CycleLimit, StopAction::CycleExhausted)
        );
    }

    #[test]
    fn rest_due_with_dry_cycle_becomes_the_restart() {
        let limits = DriveParameters::default().limits();
        let clock = HosClock::new(&limits);
        let config = PlannerConfig::default();
        let state = clock.advance(
            &CycleState::seeded(59.0, &limits),
            DutyStatus::Driving,
            11.0,
            660.0,
        );
        let ctx = context(&limits, &state, &config, None, 4.0);
        assert_eq!(
            StopPolicy::standard().decide(&ctx),
            (RuleId::MandatoryRest, StopAction::Restart { hours: 34.0 })
        );
    }

    #[test]
    fn restart_counts_the_current_off_duty_streak() {
        let limits = DriveParameters::default().limits();
        let clock = HosClock::new(&limits);
        let config = PlannerConfig::default();
        let state = clock.advance(
            &CycleState::seeded(70.0, &limits),
            DutyStatus::OffDuty,
            0.5,
            0.0,
        );
        let ctx = context(&limits, &state, &config, None, 4.0);
        assert_eq!(
            StopPolicy::standard().decide(&ctx),
            (RuleId::CycleLimit, StopAction::Restart { hours: 33.5 })
        );
    }

    #[test]
    fn break_precedes_fuel_and_drive_is_capped() {
        let limits = DriveParameters::default().limits();
        let clock = HosClock::new(&limits);
        let config = PlannerConfig::default();
        let mut state = clock.advance(
            &CycleState::seeded(0.0, &limits),
            DutyStatus::Driving,
            8.0,
            1000.0,
        );
        let ctx = context(&limits, &state, &config, None, 5.0);
        assert_eq!(
            StopPolicy::standard().decide(&ctx).0,
            RuleId::DrivingBreak
        );

        state.drive_hours_since_break = 0.0;
        let ctx = context(&limits, &state, &config, None, 5.0);
        assert_eq!(
            StopPolicy::standard().decide(&ctx),
            (RuleId::Fuel, StopAction::Fuel { hours: 0.0 })
        );

        let refueled = HosClock::refuel(&state);
        let ctx = context(&limits, &refueled, &config, None, 5.0);
        // Shift limit leaves 3 hours of the 11.
        assert_eq!(
            StopPolicy::standard().decide(&ctx),
            (RuleId::Drive, StopAction::Drive { hours: 3.0 })
        );
    }

    #[test]
    fn drive_stops_at_fuel_interval() {
        let limits = DriveParameters::default().limits();
        let config = PlannerConfig::default();
        let mut state = CycleState::seeded(0.0, &limits);
        state.miles_since_fuel = 940.0;
        let ctx = context(&limits, &state, &config, None, 5.0);
        match StopPolicy::standard().decide(&ctx) {
            (RuleId::Drive, StopAction::Drive { hours }) => assert!((hours - 1.0).abs() < 1e-9),
            other => panic!("unexpected decision {other:?}"),
        }
    }
}
