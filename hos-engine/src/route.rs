//! Route geometry, leg validation, and the routing provider seam.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use thiserror::Error;

use crate::constants::{EARTH_RADIUS_MILES, STRAIGHT_LINE_ROAD_FACTOR, STRAIGHT_LINE_SPEED_MPH};
use crate::numbers::MILE_EPSILON;
use crate::params::ParameterError;

/// A geocoded location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(default)]
    pub label: String,
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(label: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            label: label.into(),
            lat,
            lng,
        }
    }

    #[must_use]
    pub const fn as_pair(&self) -> [f64; 2] {
        [self.lat, self.lng]
    }

    /// # Errors
    ///
    /// Returns [`ParameterError::CoordinateOutOfRange`] for non-finite or out-of-range values.
    pub fn validate(&self, field: &'static str) -> Result<(), ParameterError> {
        if coordinate_in_range(self.lat, self.lng) {
            Ok(())
        } else {
            Err(ParameterError::CoordinateOutOfRange {
                field,
                lat: self.lat,
                lng: self.lng,
            })
        }
    }
}

fn coordinate_in_range(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

/// The three endpoints a trip is routed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoints {
    pub current: GeoPoint,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
}

/// Which stretch of the trip a leg covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegKind {
    ToPickup,
    ToDropoff,
    ReturnToOrigin,
}

/// Work performed on arrival at the end of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Waypoint {
    Pickup,
    Dropoff,
}

impl LegKind {
    #[must_use]
    pub const fn waypoint(self) -> Option<Waypoint> {
        match self {
            Self::ToPickup => Some(Waypoint::Pickup),
            Self::ToDropoff => Some(Waypoint::Dropoff),
            Self::ReturnToOrigin => None,
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::ToPickup => "to_pickup",
            Self::ToDropoff => "to_dropoff",
            Self::ReturnToOrigin => "return_to_origin",
        }
    }

    /// Leg order for a trip, with the return leg only when requested.
    #[must_use]
    pub fn sequence(return_to_origin: bool) -> &'static [Self] {
        const OUTBOUND: [LegKind; 2] = [LegKind::ToPickup, LegKind::ToDropoff];
        const ROUND_TRIP: [LegKind; 3] = [
            LegKind::ToPickup,
            LegKind::ToDropoff,
            LegKind::ReturnToOrigin,
        ];
        if return_to_origin {
            &ROUND_TRIP
        } else {
            &OUTBOUND
        }
    }
}

impl fmt::Display for LegKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Turn-by-turn step carried through from the routing provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub text: String,
    #[serde(default)]
    pub distance_miles: f64,
    #[serde(default)]
    pub duration_hours: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    #[error(
        "leg {leg_index} is degenerate: {distance_miles} miles over {duration_hours} hours"
    )]
    DegenerateLeg {
        leg_index: usize,
        distance_miles: f64,
        duration_hours: f64,
    },
    #[error("leg {leg_index} has invalid {field} ({value})")]
    InvalidMeasure {
        leg_index: usize,
        field: &'static str,
        value: f64,
    },
    #[error("leg {leg_index} has out-of-range coordinate (lat {lat}, lng {lng})")]
    InvalidCoordinate { leg_index: usize, lat: f64, lng: f64 },
    #[error("leg {leg_index} should be {expected} but was {actual}")]
    UnexpectedLeg {
        leg_index: usize,
        expected: LegKind,
        actual: LegKind,
    },
    #[error("route has {actual} legs, expected {expected}")]
    LegCount { expected: usize, actual: usize },
    #[error("route is missing the {kind} leg")]
    MissingLeg { kind: LegKind },
}

/// One routed leg between two endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub kind: LegKind,
    #[serde(default)]
    pub coordinates: Vec<[f64; 2]>,
    pub distance_miles: f64,
    pub duration_hours: f64,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl RouteLeg {
    /// # Errors
    ///
    /// Returns [`RouteError`] for non-finite or negative measures, a zero
    /// duration paired with non-zero distance (or the reverse), or bad coordinates.
    pub fn validate(&self, leg_index: usize) -> Result<(), RouteError> {
        for (field, value) in [
            ("distance_miles", self.distance_miles),
            ("duration_hours", self.duration_hours),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(RouteError::InvalidMeasure {
                    leg_index,
                    field,
                    value,
                });
            }
        }
        let has_distance = self.distance_miles > MILE_EPSILON;
        let has_duration = self.duration_hours > 0.0;
        if has_distance != has_duration {
            return Err(RouteError::DegenerateLeg {
                leg_index,
                distance_miles: self.distance_miles,
                duration_hours: self.duration_hours,
            });
        }
        if let Some([lat, lng]) = self
            .coordinates
            .iter()
            .copied()
            .find(|[lat, lng]| !coordinate_in_range(*lat, *lng))
        {
            return Err(RouteError::InvalidCoordinate {
                leg_index,
                lat,
                lng,
            });
        }
        Ok(())
    }

    /// Average speed implied by the provider's distance and duration.
    #[must_use]
    pub fn speed_mph(&self) -> f64 {
        if self.duration_hours > 0.0 {
            self.distance_miles / self.duration_hours
        } else {
            0.0
        }
    }

    /// Position a fraction of the way along the polyline, by great-circle length.
    #[must_use]
    pub fn point_at(&self, fraction: f64) -> Option<[f64; 2]> {
        let first = *self.coordinates.first()?;
        if self.coordinates.len() == 1 {
            return Some(first);
        }
        let segments: Vec<f64> = self
            .coordinates
            .windows(2)
            .map(|pair| haversine_miles(pair[0], pair[1]))
            .collect();
        let total: f64 = segments.iter().sum();
        if total <= 0.0 {
            return Some(first);
        }
        let mut remaining = fraction.clamp(0.0, 1.0) * total;
        for (pair, length) in self.coordinates.windows(2).zip(&segments) {
            if remaining <= *length {
                let t = if *length > 0.0 { remaining / length } else { 0.0 };
                return Some([
                    pair[0][0] + t * (pair[1][0] - pair[0][0]),
                    pair[0][1] + t * (pair[1][1] - pair[0][1]),
                ]);
            }
            remaining -= length;
        }
        self.coordinates.last().copied()
    }
}

/// Validated, ordered legs for one trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    legs: Vec<RouteLeg>,
}

impl Route {
    /// # Errors
    ///
    /// Returns [`RouteError`] when legs are missing, extra, out of order, or degenerate.
    pub fn new(legs: Vec<RouteLeg>, return_to_origin: bool) -> Result<Self, RouteError> {
        let expected = LegKind::sequence(return_to_origin);
        if legs.len() < expected.len() {
            let kind = expected[legs.len()];
            if legs.iter().all(|leg| leg.kind != kind) {
                return Err(RouteError::MissingLeg { kind });
            }
        }
        if legs.len() != expected.len() {
            return Err(RouteError::LegCount {
                expected: expected.len(),
                actual: legs.len(),
            });
        }
        for (leg_index, (leg, kind)) in legs.iter().zip(expected).enumerate() {
            if leg.kind != *kind {
                return Err(RouteError::UnexpectedLeg {
                    leg_index,
                    expected: *kind,
                    actual: leg.kind,
                });
            }
            leg.validate(leg_index)?;
        }
        Ok(Self { legs })
    }

    #[must_use]
    pub fn legs(&self) -> &[RouteLeg] {
        &self.legs
    }

    #[must_use]
    pub fn into_legs(self) -> Vec<RouteLeg> {
        self.legs
    }

    #[must_use]
    pub fn total_distance_miles(&self) -> f64 {
        self.legs.iter().map(|leg| leg.distance_miles).sum()
    }

    #[must_use]
    pub fn total_duration_hours(&self) -> f64 {
        self.legs.iter().map(|leg| leg.duration_hours).sum()
    }

    #[must_use]
    pub fn all_coordinates(&self) -> Vec<[f64; 2]> {
        self.legs
            .iter()
            .flat_map(|leg| leg.coordinates.iter().copied())
            .collect()
    }

    /// Greatest air-mile distance of any route coordinate from `origin`.
    #[must_use]
    pub fn max_radius_from(&self, origin: [f64; 2]) -> f64 {
        self.legs
            .iter()
            .flat_map(|leg| leg.coordinates.iter())
            .map(|point| haversine_miles(origin, *point))
            .fold(0.0, f64::max)
    }
}

/// Great-circle distance between two `[lat, lng]` points in statute miles.
#[must_use]
pub fn haversine_miles(from: [f64; 2], to: [f64; 2]) -> f64 {
    let dlat = (to[0] - from[0]).to_radians();
    let dlng = (to[1] - from[1]).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + from[0].to_radians().cos() * to[0].to_radians().cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();
    EARTH_RADIUS_MILES * c
}

/// Supplies routed legs for a trip.
pub trait RouteProvider {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Route the trip through its endpoints.
    ///
    /// # Errors
    ///
    /// Returns the provider's error when routing fails.
    fn route(
        &self,
        endpoints: &Endpoints,
        return_to_origin: bool,
    ) -> Result<Vec<RouteLeg>, Self::Error>;
}

/// Deterministic router that connects endpoints with great-circle segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StraightLineRouter {
    pub road_factor: f64,
    pub speed_mph: f64,
}

impl Default for StraightLineRouter {
    fn default() -> Self {
        Self {
            road_factor: STRAIGHT_LINE_ROAD_FACTOR,
            speed_mph: STRAIGHT_LINE_SPEED_MPH,
        }
    }
}

impl StraightLineRouter {
    fn leg(&self, kind: LegKind, from: &GeoPoint, to: &GeoPoint) -> RouteLeg {
        let distance_miles = haversine_miles(from.as_pair(), to.as_pair()) * self.road_factor;
        let duration_hours = if self.speed_mph > 0.0 {
            distance_miles / self.speed_mph
        } else {
            0.0
        };
        RouteLeg {
            kind,
            coordinates: vec![from.as_pair(), to.as_pair()],
            distance_miles,
            duration_hours,
            instructions: vec![Instruction {
                text: format!("Head to {}", display_label(to)),
                distance_miles,
                duration_hours,
            }],
        }
    }
}

fn display_label(point: &GeoPoint) -> String {
    if point.label.is_empty() {
        format!("{:.4}, {:.4}", point.lat, point.lng)
    } else {
        point.label.clone()
    }
}

impl RouteProvider for StraightLineRouter {
    type Error = Infallible;

    fn route(
        &self,
        endpoints: &Endpoints,
        return_to_origin: bool,
    ) -> Result<Vec<RouteLeg>, Self::Error> {
        let mut legs = vec![
            self.leg(LegKind::ToPickup, &endpoints.current, &endpoints.pickup),
            self.leg(LegKind::ToDropoff, &endpoints.pickup, &endpoints.dropoff),
        ];
        if return_to_origin {
            legs.push(self.leg(
                LegKind::ReturnToOrigin,
                &endpoints.dropoff,
                &endpoints.current,
            ));
        }
        Ok(legs)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("route provider unavailable: {0}")]
pub struct ProviderUnavailable(pub String);

/// Provider backed by precomputed legs, or by a canned failure.
#[derive(Debug, Clone, Default)]
pub struct FixtureRoutes {
    legs: Vec<RouteLeg>,
    failure: Option<String>,
}

impl FixtureRoutes {
    #[must_use]
    pub const fn new(legs: Vec<RouteLeg>) -> Self {
        Self {
            legs,
            failure: None,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            legs: Vec::new(),
            failure: Some(message.into()),
        }
    }
}

impl RouteProvider for FixtureRoutes {
    type Error = ProviderUnavailable;

    fn route(
        &self,
        _endpoints: &Endpoints,
        return_to_origin: bool,
    ) -> Result<Vec<RouteLeg>, Self::Error> {
        if let Some(message) = &self.failure {
            return Err(ProviderUnavailable(message.clone()));
        }
        Ok(self
            .legs
            .iter()
            .filter(|leg| return_to_origin || leg.kind != LegKind::ReturnToOrigin)
            .cloned()
            .collect())
    }
}
