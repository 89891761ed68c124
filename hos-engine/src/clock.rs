//! Regulatory counters and the legality queries the stop policy asks of them.

use serde::Serialize;

use crate::numbers::HOUR_EPSILON;
use crate::params::HosLimits;
use crate::schedule::DutyStatus;

/// Counters threaded through one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleState {
    pub drive_hours_since_break: f64,
    pub shift_drive_hours: f64,
    pub on_duty_window_elapsed: f64,
    pub cycle_hours_used: f64,
    pub odometer_miles: f64,
    pub absolute_hour: f64,
    pub miles_since_fuel: f64,
    pub off_duty_streak_hours: f64,
    pub non_driving_streak_hours: f64,
    /// The current window has been stretched by the 16-hour exception.
    pub window_extended: bool,
    /// The 16-hour exception can still be claimed.
    pub sixteen_hour_available: bool,
}

impl CycleState {
    /// Fresh counters at hour zero with hours already used in the cycle.
    #[must_use]
    pub const fn seeded(cycle_hours_used: f64, limits: &HosLimits) -> Self {
        Self {
            drive_hours_since_break: 0.0,
            shift_drive_hours: 0.0,
            on_duty_window_elapsed: 0.0,
            cycle_hours_used,
            odometer_miles: 0.0,
            absolute_hour: 0.0,
            miles_since_fuel: 0.0,
            off_duty_streak_hours: 0.0,
            non_driving_streak_hours: 0.0,
            window_extended: false,
            sixteen_hour_available: limits.sixteen_hour_eligible,
        }
    }
}

/// Pure evaluator of HOS limits over a [`CycleState`].
#[derive(Debug, Clone, Copy)]
pub struct HosClock<'a> {
    limits: &'a HosLimits,
}

impl<'a> HosClock<'a> {
    #[must_use]
    pub const fn new(limits: &'a HosLimits) -> Self {
        Self { limits }
    }

    #[must_use]
    pub const fn limits(&self) -> &'a HosLimits {
        self.limits
    }

    /// Window length in force, counting an unclaimed 16-hour allowance.
    #[must_use]
    pub const fn active_window_limit(&self, state: &CycleState) -> f64 {
        if state.window_extended || state.sixteen_hour_available {
            self.limits.extended_window_hours
        } else {
            self.limits.window_hours
        }
    }

    #[must_use]
    pub fn within_shift_limits(&self, state: &CycleState, hours: f64) -> bool {
        state.shift_drive_hours + hours <= self.limits.drive_hours + HOUR_EPSILON
            && state.on_duty_window_elapsed + hours
                <= self.active_window_limit(state) + HOUR_EPSILON
    }

    fn break_allows(&self, state: &CycleState, hours: f64) -> bool {
        self.limits
            .break_after_hours
            .is_none_or(|after| state.drive_hours_since_break + hours <= after + HOUR_EPSILON)
    }

    #[must_use]
    pub fn can_drive_continuously(&self, state: &CycleState, hours: f64) -> bool {
        self.break_allows(state, hours) && self.within_shift_limits(state, hours)
    }

    #[must_use]
    pub fn cycle_has_capacity(&self, state: &CycleState, hours: f64) -> bool {
        state.cycle_hours_used + hours <= self.limits.cycle_hours + HOUR_EPSILON
    }

    #[must_use]
    pub fn cycle_remaining(&self, state: &CycleState) -> f64 {
        (self.limits.cycle_hours - state.cycle_hours_used).max(0.0)
    }

    #[must_use]
    pub fn needs_break(&self, state: &CycleState) -> bool {
        self.limits
            .break_after_hours
            .is_some_and(|after| state.drive_hours_since_break >= after - HOUR_EPSILON)
    }

    #[must_use]
    pub fn needs_rest(&self, state: &CycleState) -> bool {
        state.on_duty_window_elapsed >= self.active_window_limit(state) - HOUR_EPSILON
            || state.shift_drive_hours >= self.limits.drive_hours - HOUR_EPSILON
    }

    /// Longest drive currently legal before any limit is reached.
    #[must_use]
    pub fn drive_available(&self, state: &CycleState) -> f64 {
        let shift = self.limits.drive_hours - state.shift_drive_hours;
        let window = self.active_window_limit(state) - state.on_duty_window_elapsed;
        let until_break = self
            .limits
            .break_after_hours
            .map_or(f64::INFINITY, |after| after - state.drive_hours_since_break);
        shift
            .min(window)
            .min(until_break)
            .min(self.cycle_remaining(state))
            .max(0.0)
    }

    /// Apply one duty period and return the updated counters.
    #[must_use]
    pub fn advance(
        &self,
        state: &CycleState,
        status: DutyStatus,
        hours: f64,
        miles: f64,
    ) -> CycleState {
        let mut next = *state;
        next.absolute_hour += hours;
        next.on_duty_window_elapsed += hours;
        match status {
            DutyStatus::Driving => {
                next.drive_hours_since_break += hours;
                next.shift_drive_hours += hours;
                next.cycle_hours_used += hours;
                next.odometer_miles += miles;
                next.miles_since_fuel += miles;
                next.off_duty_streak_hours = 0.0;
                next.non_driving_streak_hours = 0.0;
            }
            DutyStatus::OnDutyNotDriving => {
                next.cycle_hours_used += hours;
                next.off_duty_streak_hours = 0.0;
                next.non_driving_streak_hours += hours;
            }
            DutyStatus::OffDuty | DutyStatus::Sleeper => {
                next.off_duty_streak_hours += hours;
                next.non_driving_streak_hours += hours;
            }
        }

        if next.non_driving_streak_hours >= self.limits.break_hours - HOUR_EPSILON {
            next.drive_hours_since_break = 0.0;
        }
        if next.off_duty_streak_hours >= self.limits.rest_hours - HOUR_EPSILON {
            next.shift_drive_hours = 0.0;
            next.on_duty_window_elapsed = 0.0;
            next.window_extended = false;
        }
        if let Some(restart) = self.limits.restart_hours
            && next.off_duty_streak_hours >= restart - HOUR_EPSILON
        {
            next.cycle_hours_used = 0.0;
            next.sixteen_hour_available = self.limits.sixteen_hour_eligible;
        }
        if !next.window_extended
            && next.sixteen_hour_available
            && next.on_duty_window_elapsed > self.limits.window_hours + HOUR_EPSILON
        {
            next.window_extended = true;
            next.sixteen_hour_available = false;
        }
        next
    }

    #[must_use]
    pub const fn refuel(state: &CycleState) -> CycleState {
        let mut next = *state;
        next.miles_since_fuel = 0.0;
        next
    }
}
