//! Slice a frozen timeline into 24-hour ELD log sheets.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::{DATE_LABEL_FORMAT, HOURS_PER_DAY, NOTE_PADDING};
use crate::numbers::{
    HOUR_EPSILON, ceil_f64_to_usize, floor_f64_to_usize, format_clock, serialize_hours,
    serialize_miles, serialize_period_hours, usize_to_f64, usize_to_u64,
};
use crate::schedule::{DutyPeriod, DutyStatus, Timeline};

/// Remarks per day rarely exceed a handful.
pub type Remarks = SmallVec<[String; 4]>;

/// One duty line clipped to a single log day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPeriod {
    pub status: DutyStatus,
    /// Hours since midnight of the first log day.
    #[serde(serialize_with = "serialize_period_hours")]
    pub start_hour: f64,
    #[serde(serialize_with = "serialize_period_hours")]
    pub end_hour: f64,
    #[serde(serialize_with = "serialize_period_hours")]
    pub start_hour_of_day: f64,
    #[serde(serialize_with = "serialize_period_hours")]
    pub end_hour_of_day: f64,
    #[serde(serialize_with = "serialize_period_hours")]
    pub duration: f64,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayLog {
    #[serde(rename = "day")]
    pub day_index: usize,
    pub date_label: String,
    pub periods: Vec<LogPeriod>,
    #[serde(rename = "total_driving", serialize_with = "serialize_hours")]
    pub total_driving_hours: f64,
    #[serde(rename = "total_on_duty", serialize_with = "serialize_hours")]
    pub total_on_duty_hours: f64,
    #[serde(rename = "total_off_duty", serialize_with = "serialize_hours")]
    pub total_off_duty_hours: f64,
    #[serde(serialize_with = "serialize_miles")]
    pub odometer_start: f64,
    #[serde(serialize_with = "serialize_miles")]
    pub odometer_end: f64,
    pub remarks: Remarks,
}

impl DayLog {
    /// Sum of every period on the sheet; 24 for a well-formed day.
    #[must_use]
    pub fn total_hours(&self) -> f64 {
        self.periods.iter().map(|period| period.duration).sum()
    }
}

/// Builds per-day logs from a timeline on a clock-hour grid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EldLogBuilder {
    start_date: Option<NaiveDate>,
    planned_start_hour: f64,
}

impl EldLogBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            start_date: None,
            planned_start_hour: 0.0,
        }
    }

    #[must_use]
    pub const fn with_start_date(mut self, date: Option<NaiveDate>) -> Self {
        self.start_date = date;
        self
    }

    #[must_use]
    pub fn with_planned_start_hour(mut self, hour: f64) -> Self {
        self.planned_start_hour = if hour.is_finite() {
            hour.clamp(0.0, HOURS_PER_DAY - HOUR_EPSILON)
        } else {
            0.0
        };
        self
    }

    #[must_use]
    pub fn date_label(&self, day_index: usize) -> String {
        let offset = Days::new(usize_to_u64(day_index.saturating_sub(1)));
        self.start_date
            .and_then(|date| date.checked_add_days(offset))
            .map_or_else(
                || format!("Day {day_index}"),
                |date| date.format(DATE_LABEL_FORMAT).to_string(),
            )
    }

    /// Segment the timeline into padded 24-hour sheets.
    #[must_use]
    pub fn build(&self, timeline: &Timeline) -> Vec<DayLog> {
        let offset = self.planned_start_hour;
        let end = timeline.total_hours() + offset;
        let day_count = ceil_f64_to_usize((end - HOUR_EPSILON) / HOURS_PER_DAY).max(1);
        let grid_end = usize_to_f64(day_count) * HOURS_PER_DAY;
        let final_odometer = timeline
            .periods
            .last()
            .map_or(0.0, |period| period.odometer_end);

        let mut clocked: Vec<DutyPeriod> = Vec::with_capacity(timeline.periods.len() + 2);
        clocked.push(padding(0.0, offset, 0.0));
        clocked.extend(timeline.periods.iter().map(|period| DutyPeriod {
            start_hour: period.start_hour + offset,
            end_hour: period.end_hour + offset,
            ..period.clone()
        }));
        clocked.push(padding(end, grid_end, final_odometer));

        let mut pieces: Vec<Vec<DutyPeriod>> = vec![Vec::new(); day_count];
        for period in &clocked {
            for piece in split_at_midnight(period) {
                let day = floor_f64_to_usize(piece.start_hour / HOURS_PER_DAY).min(day_count - 1);
                push_merged(&mut pieces[day], piece);
            }
        }

        let mut remarks: Vec<Remarks> = vec![Remarks::new(); day_count];
        for stop in &timeline.stops {
            let hour = stop.arrive_hour + offset;
            let day = floor_f64_to_usize(hour / HOURS_PER_DAY).min(day_count - 1);
            let hour_of_day = hour - usize_to_f64(day) * HOURS_PER_DAY;
            remarks[day].push(format!("{} {}", format_clock(hour_of_day), stop.label));
        }

        pieces
            .into_iter()
            .zip(remarks)
            .enumerate()
            .map(|(index, (day_pieces, remarks))| self.day_log(index, &day_pieces, remarks))
            .collect()
    }

    fn day_log(&self, index: usize, pieces: &[DutyPeriod], remarks: Remarks) -> DayLog {
        let day_start = usize_to_f64(index) * HOURS_PER_DAY;
        let periods: Vec<LogPeriod> = pieces
            .iter()
            .map(|piece| LogPeriod {
                status: piece.status,
                start_hour: piece.start_hour,
                end_hour: piece.end_hour,
                start_hour_of_day: piece.start_hour - day_start,
                end_hour_of_day: piece.end_hour - day_start,
                duration: piece.duration(),
                note: piece.note.clone(),
            })
            .collect();
        let total_with = |wanted: &[DutyStatus]| -> f64 {
            periods
                .iter()
                .filter(|period| wanted.contains(&period.status))
                .map(|period| period.duration)
                .sum()
        };
        DayLog {
            day_index: index + 1,
            date_label: self.date_label(index + 1),
            total_driving_hours: total_with(&[DutyStatus::Driving]),
            total_on_duty_hours: total_with(&[DutyStatus::Driving, DutyStatus::OnDutyNotDriving]),
            total_off_duty_hours: total_with(&[DutyStatus::OffDuty, DutyStatus::Sleeper]),
            odometer_start: pieces.first().map_or(0.0, |piece| piece.odometer_start),
            odometer_end: pieces.last().map_or(0.0, |piece| piece.odometer_end),
            periods,
            remarks,
        }
    }
}

fn padding(start: f64, end: f64, odometer: f64) -> DutyPeriod {
    DutyPeriod {
        status: DutyStatus::OffDuty,
        start_hour: start,
        end_hour: end,
        odometer_start: odometer,
        odometer_end: odometer,
        note: NOTE_PADDING.to_string(),
    }
}

fn push_merged(day: &mut Vec<DutyPeriod>, piece: DutyPeriod) {
    if let Some(last) = day.last_mut()
        && last.status == piece.status
        && (last.end_hour - piece.start_hour).abs() <= HOUR_EPSILON
    {
        last.end_hour = piece.end_hour;
        last.odometer_end = piece.odometer_end;
        return;
    }
    day.push(piece);
}

/// Split a clock-hour period into pieces that never cross midnight.
///
/// Pieces shorter than the hour tolerance are dropped.
#[must_use]
pub fn split_at_midnight(period: &DutyPeriod) -> Vec<DutyPeriod> {
    let mut pieces = Vec::new();
    let mut cursor = period.start_hour;
    while cursor < period.end_hour - HOUR_EPSILON {
        let midnight =
            usize_to_f64(floor_f64_to_usize(cursor / HOURS_PER_DAY) + 1) * HOURS_PER_DAY;
        let end = period.end_hour.min(midnight);
        if end - cursor > HOUR_EPSILON {
            pieces.push(DutyPeriod {
                start_hour: cursor,
                end_hour: end,
                odometer_start: period.odometer_at(cursor),
                odometer_end: period.odometer_at(end),
                ..period.clone()
            });
        }
        cursor = end;
    }
    pieces
}
