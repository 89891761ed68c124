//! Step-by-step duty simulation over a validated route.

mod timeline;

pub use timeline::{DutyPeriod, DutyStatus, Stop, StopType, Timeline};

use log::{debug, error};
use serde::Serialize;
use thiserror::Error;

use crate::clock::{CycleState, HosClock};
use crate::config::PlannerConfig;
use crate::constants::{
    LABEL_BREAK, LABEL_DROPOFF, LABEL_FUEL, LABEL_PICKUP, LABEL_REST, LABEL_RESTART, LABEL_START,
    NOTE_BREAK, NOTE_DRIVING, NOTE_DROPOFF, NOTE_FUEL, NOTE_PICKUP, NOTE_REST, NOTE_RESTART,
    NOTE_START,
};
use crate::numbers::HOUR_EPSILON;
use crate::params::{DriveParameters, HosLimits};
use crate::policy::{StepContext, StopAction, StopPolicy};
use crate::route::{Endpoints, Route, RouteLeg, Waypoint};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule did not converge on leg {leg_index} after {steps} steps")]
    SimulationDivergence {
        leg_index: usize,
        steps: usize,
        snapshot: Box<CycleState>,
    },
    #[error(
        "no cycle hours remain on leg {leg_index} ({cycle_hours_used:.2} used); enable the 34-hour restart or reduce current cycle hours"
    )]
    CycleExhausted {
        leg_index: usize,
        cycle_hours_used: f64,
    },
}

/// Where the truck is in the trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TripPhase {
    AtOrigin,
    EnRouteToPickup,
    AtPickup,
    EnRouteToDropoff,
    AtDropoff,
    EnRouteToOrigin,
    Done,
}

impl TripPhase {
    #[must_use]
    pub const fn depart(self) -> Self {
        match self {
            Self::AtOrigin => Self::EnRouteToPickup,
            Self::AtPickup => Self::EnRouteToDropoff,
            Self::AtDropoff => Self::EnRouteToOrigin,
            other => other,
        }
    }

    #[must_use]
    pub const fn arrive(self) -> Self {
        match self {
            Self::EnRouteToPickup => Self::AtPickup,
            Self::EnRouteToDropoff => Self::AtDropoff,
            Self::EnRouteToOrigin => Self::AtOrigin,
            other => other,
        }
    }

    #[must_use]
    pub const fn is_en_route(self) -> bool {
        matches!(
            self,
            Self::EnRouteToPickup | Self::EnRouteToDropoff | Self::EnRouteToOrigin
        )
    }
}

/// Drives a route through the stop policy and records the resulting timeline.
#[derive(Debug, Clone)]
pub struct ScheduleSimulator<'a> {
    params: &'a DriveParameters,
    config: &'a PlannerConfig,
    limits: HosLimits,
    policy: StopPolicy,
}

impl<'a> ScheduleSimulator<'a> {
    #[must_use]
    pub fn new(params: &'a DriveParameters, config: &'a PlannerConfig) -> Self {
        Self {
            params,
            config,
            limits: params.limits(),
            policy: StopPolicy::standard(),
        }
    }

    #[must_use]
    pub const fn limits(&self) -> &HosLimits {
        &self.limits
    }

    /// Simulate the full trip and return the frozen timeline.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::CycleExhausted`] when the cycle runs out with
    /// restarts disabled, or [`ScheduleError::SimulationDivergence`] when the
    /// step cap is hit.
    pub fn run(&self, route: &Route, endpoints: &Endpoints) -> Result<Timeline, ScheduleError> {
        let mut run = SimulationRun {
            clock: HosClock::new(&self.limits),
            state: CycleState::seeded(self.params.current_cycle_used_hours, &self.limits),
            timeline: Timeline::default(),
            phase: TripPhase::AtOrigin,
            steps: 0,
        };
        run.timeline.push_stop(Stop {
            stop_type: StopType::Start,
            label: LABEL_START.to_string(),
            arrive_hour: 0.0,
            depart_hour: 0.0,
            duration_hours: 0.0,
            odometer: 0.0,
            lat: Some(endpoints.current.lat),
            lng: Some(endpoints.current.lng),
            notes: NOTE_START.to_string(),
            cycle_reset: false,
        });

        for (leg_index, leg) in route.legs().iter().enumerate() {
            run.phase = run.phase.depart();
            self.run_leg(&mut run, leg_index, leg, endpoints)?;
        }
        run.phase = TripPhase::Done;
        debug!(
            "schedule {:?} after {} steps: {:.2}h, {:.1} miles",
            run.phase,
            run.steps,
            run.state.absolute_hour,
            run.state.odometer_miles
        );
        Ok(run.timeline)
    }

    fn run_leg(
        &self,
        run: &mut SimulationRun<'_>,
        leg_index: usize,
        leg: &RouteLeg,
        endpoints: &Endpoints,
    ) -> Result<(), ScheduleError> {
        let speed = leg.speed_mph();
        let mut driven_hours = 0.0;
        let mut driven_miles = 0.0;
        let mut arrived = false;
        let mut pending_work: Option<Waypoint> = None;

        loop {
            let remaining_leg_hours = (leg.duration_hours - driven_hours).max(0.0);
            if !arrived && remaining_leg_hours <= HOUR_EPSILON {
                arrived = true;
                run.phase = run.phase.arrive();
                pending_work = leg.kind.waypoint();
            }
            if arrived && pending_work.is_none() {
                return Ok(());
            }

            run.steps += 1;
            if run.steps > self.config.max_iterations {
                error!(
                    "schedule diverged on leg {leg_index} after {} steps: {:?}",
                    run.steps, run.state
                );
                return Err(ScheduleError::SimulationDivergence {
                    leg_index,
                    steps: run.steps,
                    snapshot: Box::new(run.state),
                });
            }

            let ctx = StepContext {
                clock: run.clock,
                state: &run.state,
                config: self.config,
                pending_work,
                remaining_leg_hours,
                leg_speed_mph: speed,
            };
            let (rule, action) = self.policy.decide(&ctx);
            debug!(
                "step {} leg {leg_index} {:?} at {:.3}h: {rule:?} -> {action:?}",
                run.steps, run.phase, run.state.absolute_hour
            );

            let here = stop_point(leg, driven_miles);
            match action {
                StopAction::Work { waypoint, hours } => {
                    let (stop_type, label, notes, point) = match waypoint {
                        Waypoint::Pickup => {
                            (StopType::Pickup, LABEL_PICKUP, NOTE_PICKUP, &endpoints.pickup)
                        }
                        Waypoint::Dropoff => (
                            StopType::Dropoff,
                            LABEL_DROPOFF,
                            NOTE_DROPOFF,
                            &endpoints.dropoff,
                        ),
                    };
                    run.stationary(
                        DutyStatus::OnDutyNotDriving,
                        hours,
                        StopDraft {
                            stop_type,
                            label,
                            notes,
                            point: Some(point.as_pair()),
                        },
                    );
                    pending_work = None;
                }
                StopAction::Rest { hours } => {
                    run.stationary(
                        DutyStatus::OffDuty,
                        hours,
                        StopDraft {
                            stop_type: StopType::Rest,
                            label: LABEL_REST,
                            notes: NOTE_REST,
                            point: here,
                        },
                    );
                }
                StopAction::Restart { hours } => {
                    run.stationary(
                        DutyStatus::OffDuty,
                        hours,
                        StopDraft {
                            stop_type: StopType::Rest,
                            label: LABEL_RESTART,
                            notes: NOTE_RESTART,
                            point: here,
                        },
                    );
                    if let Some(stop) = run.timeline.stops.last_mut() {
                        stop.cycle_reset = true;
                    }
                }
                StopAction::CycleExhausted => {
                    return Err(ScheduleError::CycleExhausted {
                        leg_index,
                        cycle_hours_used: run.state.cycle_hours_used,
                    });
                }
                StopAction::Break { hours } => {
                    run.stationary(
                        DutyStatus::OffDuty,
                        hours,
                        StopDraft {
                            stop_type: StopType::Break30,
                            label: LABEL_BREAK,
                            notes: NOTE_BREAK,
                            point: here,
                        },
                    );
                }
                StopAction::Fuel { hours } => {
                    run.stationary(
                        DutyStatus::OnDutyNotDriving,
                        hours,
                        StopDraft {
                            stop_type: StopType::Fuel,
                            label: LABEL_FUEL,
                            notes: NOTE_FUEL,
                            point: here,
                        },
                    );
                    run.state = HosClock::refuel(&run.state);
                }
                StopAction::Drive { hours } => {
                    let (hours, miles) = if hours >= remaining_leg_hours - HOUR_EPSILON {
                        (remaining_leg_hours, leg.distance_miles - driven_miles)
                    } else {
                        (hours, hours * speed)
                    };
                    run.drive(hours, miles);
                    driven_hours += hours;
                    driven_miles += miles;
                }
            }
        }
    }
}

fn stop_point(leg: &RouteLeg, driven_miles: f64) -> Option<[f64; 2]> {
    let fraction = if leg.distance_miles > 0.0 {
        driven_miles / leg.distance_miles
    } else {
        1.0
    };
    leg.point_at(fraction)
}

struct StopDraft {
    stop_type: StopType,
    label: &'static str,
    notes: &'static str,
    point: Option<[f64; 2]>,
}

struct SimulationRun<'a> {
    clock: HosClock<'a>,
    state: CycleState,
    timeline: Timeline,
    phase: TripPhase,
    steps: usize,
}

impl SimulationRun<'_> {
    fn stationary(&mut self, status: DutyStatus, hours: f64, draft: StopDraft) {
        let arrive = self.state.absolute_hour;
        let odometer = self.state.odometer_miles;
        if hours > HOUR_EPSILON {
            self.timeline.push_period(DutyPeriod {
                status,
                start_hour: arrive,
                end_hour: arrive + hours,
                odometer_start: odometer,
                odometer_end: odometer,
                note: draft.label.to_string(),
            });
            self.state = self.clock.advance(&self.state, status, hours, 0.0);
        }
        let hours = hours.max(0.0);
        self.timeline.push_stop(Stop {
            stop_type: draft.stop_type,
            label: draft.label.to_string(),
            arrive_hour: arrive,
            depart_hour: arrive + hours,
            duration_hours: hours,
            odometer,
            lat: draft.point.map(|[lat, _]| lat),
            lng: draft.point.map(|[_, lng]| lng),
            notes: draft.notes.to_string(),
            cycle_reset: false,
        });
    }

    fn drive(&mut self, hours: f64, miles: f64) {
        let start = self.state.absolute_hour;
        let odometer = self.state.odometer_miles;
        self.timeline.push_period(DutyPeriod {
            status: DutyStatus::Driving,
            start_hour: start,
            end_hour: start + hours,
            odometer_start: odometer,
            odometer_end: odometer + miles,
            note: NOTE_DRIVING.to_string(),
        });
        self.state = self
            .clock
            .advance(&self.state, DutyStatus::Driving, hours, miles);
    }
}
