use serde::{Deserialize, Serialize};

use crate::numbers::{HOUR_EPSILON, serialize_hours, serialize_miles, serialize_period_hours};

/// ELD duty status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyStatus {
    OffDuty,
    Sleeper,
    Driving,
    OnDutyNotDriving,
}

impl DutyStatus {
    #[must_use]
    pub const fn is_on_duty(self) -> bool {
        matches!(self, Self::Driving | Self::OnDutyNotDriving)
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::OffDuty => "off_duty",
            Self::Sleeper => "sleeper",
            Self::Driving => "driving",
            Self::OnDutyNotDriving => "on_duty_not_driving",
        }
    }
}

/// A span of one duty status on the absolute trip clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutyPeriod {
    pub status: DutyStatus,
    #[serde(serialize_with = "serialize_period_hours")]
    pub start_hour: f64,
    #[serde(serialize_with = "serialize_period_hours")]
    pub end_hour: f64,
    #[serde(serialize_with = "serialize_miles")]
    pub odometer_start: f64,
    #[serde(serialize_with = "serialize_miles")]
    pub odometer_end: f64,
    #[serde(default)]
    pub note: String,
}

impl DutyPeriod {
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end_hour - self.start_hour
    }

    /// Odometer reading at `hour`, linear across driving periods.
    #[must_use]
    pub fn odometer_at(&self, hour: f64) -> f64 {
        let span = self.duration();
        if span <= 0.0 {
            return self.odometer_start;
        }
        let t = ((hour - self.start_hour) / span).clamp(0.0, 1.0);
        self.odometer_start + t * (self.odometer_end - self.odometer_start)
    }
}

/// Kinds of stop annotated on the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopType {
    Start,
    Pickup,
    Dropoff,
    Fuel,
    Rest,
    #[serde(rename = "break_30")]
    Break30,
}

impl StopType {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pickup => "pickup",
            Self::Dropoff => "dropoff",
            Self::Fuel => "fuel",
            Self::Rest => "rest",
            Self::Break30 => "break_30",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub stop_type: StopType,
    pub label: String,
    #[serde(serialize_with = "serialize_hours")]
    pub arrive_hour: f64,
    #[serde(serialize_with = "serialize_hours")]
    pub depart_hour: f64,
    #[serde(serialize_with = "serialize_hours")]
    pub duration_hours: f64,
    #[serde(serialize_with = "serialize_miles")]
    pub odometer: f64,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub cycle_reset: bool,
}

/// Append-only record of a simulation run; frozen once returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub periods: Vec<DutyPeriod>,
    pub stops: Vec<Stop>,
}

impl Timeline {
    /// Append a period, merging into the previous one when the status matches.
    ///
    /// Zero-length periods are dropped.
    pub fn push_period(&mut self, period: DutyPeriod) {
        if period.duration() <= HOUR_EPSILON {
            return;
        }
        if let Some(last) = self.periods.last_mut()
            && last.status == period.status
            && (last.end_hour - period.start_hour).abs() <= HOUR_EPSILON
        {
            last.end_hour = period.end_hour;
            last.odometer_end = period.odometer_end;
            if last.note != period.note && !period.note.is_empty() {
                if last.note.is_empty() {
                    last.note = period.note;
                } else if !last.note.split("; ").any(|note| note == period.note) {
                    last.note.push_str("; ");
                    last.note.push_str(&period.note);
                }
            }
            return;
        }
        self.periods.push(period);
    }

    pub fn push_stop(&mut self, stop: Stop) {
        self.stops.push(stop);
    }

    #[must_use]
    pub fn total_hours(&self) -> f64 {
        self.periods.last().map_or(0.0, |period| period.end_hour)
    }

    #[must_use]
    pub fn total_hours_with_status(&self, status: DutyStatus) -> f64 {
        self.periods
            .iter()
            .filter(|period| period.status == status)
            .map(DutyPeriod::duration)
            .sum()
    }

    /// Periods start at hour zero and leave no gaps or overlaps.
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        let mut cursor = 0.0;
        for period in &self.periods {
            if (period.start_hour - cursor).abs() > 1e-6 || period.end_hour <= period.start_hour {
                return false;
            }
            cursor = period.end_hour;
        }
        true
    }

    pub fn stops_of(&self, stop_type: StopType) -> impl Iterator<Item = &Stop> {
        self.stops.iter().filter(move |stop| stop.stop_type == stop_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(status: DutyStatus, start: f64, end: f64, note: &str) -> DutyPeriod {
        DutyPeriod {
            status,
            start_hour: start,
            end_hour: end,
            odometer_start: start * 10.0,
            odometer_end: end * 10.0,
            note: note.to_string(),
        }
    }

    #[test]
    fn same_status_periods_merge() {
        let mut timeline = Timeline::default();
        timeline.push_period(period(DutyStatus::Driving, 0.0, 2.0, "Driving"));
        timeline.push_period(period(DutyStatus::Driving, 2.0, 3.5, "Driving"));
        timeline.push_period(period(DutyStatus::OffDuty, 3.5, 3.5, "ignored"));
        timeline.push_period(period(DutyStatus::OffDuty, 3.5, 4.0, "Break"));
        assert_eq!(timeline.periods.len(), 2);
        assert!((timeline.periods[0].end_hour - 3.5).abs() < f64::EPSILON);
        assert_eq!(timeline.periods[0].note, "Driving");
        assert!((timeline.periods[0].odometer_end - 35.0).abs() < f64::EPSILON);
        assert!(timeline.is_contiguous());
        assert!((timeline.total_hours() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn odometer_interpolates_within_period() {
        let p = period(DutyStatus::Driving, 2.0, 4.0, "");
        assert!((p.odometer_at(3.0) - 30.0).abs() < 1e-9);
        assert!((p.odometer_at(10.0) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn gaps_break_contiguity() {
        let mut timeline = Timeline::default();
        timeline.push_period(period(DutyStatus::Driving, 0.0, 2.0, ""));
        timeline.push_period(period(DutyStatus::OffDuty, 2.5, 3.0, ""));
        assert!(!timeline.is_contiguous());
    }

    #[test]
    fn stop_type_uses_break_30_wire_name() {
        assert_eq!(serde_json::to_string(&StopType::Break30).unwrap(), "\"break_30\"");
        assert_eq!(
            serde_json::to_string(&DutyStatus::OnDutyNotDriving).unwrap(),
            "\"on_duty_not_driving\""
        );
    }
}
