//! Plan persistence seam and the in-memory history store.

use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use crate::constants::{RECENT_PLANS_DEFAULT, RECENT_PLANS_MAX};
use crate::plan::TripPlan;

/// Trait for abstracting plan persistence.
pub trait PlanStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist a plan, assigning its id and creation time.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan cannot be stored.
    fn save_plan(&self, plan: TripPlan) -> Result<TripPlan, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn load_plan(&self, plan_id: u64) -> Result<Option<TripPlan>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn latest_plan(&self) -> Result<Option<TripPlan>, Self::Error>;

    /// Most recent plans first, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn recent_plans(&self, limit: usize) -> Result<Vec<TripPlan>, Self::Error>;
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("plan store lock poisoned")]
    Poisoned,
}

/// Clamp a caller-supplied history size to `1..=20`, defaulting to 5.
#[must_use]
pub fn clamp_recent_limit(requested: Option<usize>) -> usize {
    requested.map_or(RECENT_PLANS_DEFAULT, |limit| {
        limit.clamp(1, RECENT_PLANS_MAX)
    })
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    plans: Vec<TripPlan>,
}

/// Process-local plan history.
#[derive(Debug)]
pub struct MemoryPlanStore {
    inner: Mutex<Inner>,
    clock: fn() -> DateTime<Utc>,
}

impl Default for MemoryPlanStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPlanStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Use a fixed clock so stored timestamps are reproducible.
    #[must_use]
    pub fn with_clock(clock: fn() -> DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                plans: Vec::new(),
            }),
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.plans.len())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.plans.is_empty())
    }
}

impl PlanStore for MemoryPlanStore {
    type Error = StoreError;

    fn save_plan(&self, mut plan: TripPlan) -> Result<TripPlan, Self::Error> {
        let mut inner = self.lock()?;
        plan.plan_id = Some(inner.next_id);
        plan.created_at = Some((self.clock)());
        inner.next_id += 1;
        inner.plans.push(plan.clone());
        Ok(plan)
    }

    fn load_plan(&self, plan_id: u64) -> Result<Option<TripPlan>, Self::Error> {
        Ok(self
            .lock()?
            .plans
            .iter()
            .find(|plan| plan.plan_id == Some(plan_id))
            .cloned())
    }

    fn latest_plan(&self) -> Result<Option<TripPlan>, Self::Error> {
        Ok(self.lock()?.plans.last().cloned())
    }

    fn recent_plans(&self, limit: usize) -> Result<Vec<TripPlan>, Self::Error> {
        Ok(self
            .lock()?
            .plans
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use crate::plan::{TripRequest, plan_trip};
    use crate::route::{Endpoints, GeoPoint, RouteProvider, StraightLineRouter};
    use chrono::TimeZone;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn sample_plan() -> TripPlan {
        let request = TripRequest::new(
            GeoPoint::new("A", 35.0, -90.0),
            GeoPoint::new("A", 35.0, -90.0),
            GeoPoint::new("B", 35.5, -89.0),
        );
        let endpoints: Endpoints = request.endpoints();
        let legs = StraightLineRouter::default()
            .route(&endpoints, false)
            .unwrap();
        plan_trip(&request, legs, &PlannerConfig::default()).unwrap()
    }

    #[test]
    fn save_assigns_sequential_ids_and_timestamp() {
        let store = MemoryPlanStore::with_clock(fixed_clock);
        let first = store.save_plan(sample_plan()).unwrap();
        let second = store.save_plan(sample_plan()).unwrap();
        assert_eq!(first.plan_id, Some(1));
        assert_eq!(second.plan_id, Some(2));
        assert_eq!(first.created_at, Some(fixed_clock()));
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.load_plan(1).unwrap(), Some(first));
        assert!(store.load_plan(99).unwrap().is_none());
        assert_eq!(store.latest_plan().unwrap().and_then(|p| p.plan_id), Some(2));
    }

    #[test]
    fn recent_is_newest_first_and_bounded() {
        let store = MemoryPlanStore::with_clock(fixed_clock);
        assert!(store.is_empty().unwrap());
        for _ in 0..4 {
            store.save_plan(sample_plan()).unwrap();
        }
        let ids: Vec<Option<u64>> = store
            .recent_plans(3)
            .unwrap()
            .into_iter()
            .map(|plan| plan.plan_id)
            .collect();
        assert_eq!(ids, vec![Some(4), Some(3), Some(2)]);
    }

    #[test]
    fn recent_limit_is_clamped() {
        assert_eq!(clamp_recent_limit(None), 5);
        assert_eq!(clamp_recent_limit(Some(0)), 1);
        assert_eq!(clamp_recent_limit(Some(7)), 7);
        assert_eq!(clamp_recent_limit(Some(500)), 20);
    }
}
