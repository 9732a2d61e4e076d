//! Trip estimation for a load. Routing is mocked with a fixed trip.

use serde::{Deserialize, Serialize};

use crate::load::LoadSpec;

/// Distance, waiting time, and tolls for a route.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripEstimate {
    pub km: f64,
    pub wait_h: f64,
    pub night: bool,
    pub tolls: f64,
}

impl Default for TripEstimate {
    /// Karachi to Lahore as the demo always quotes it.
    fn default() -> Self {
        Self {
            km: 1200.0,
            wait_h: 2.0,
            night: false,
            tolls: 3500.0,
        }
    }
}

/// Routing collaborator consulted when a quote is requested.
pub trait RouteEstimator: Send + Sync {
    fn estimate(&self, load: &LoadSpec) -> TripEstimate;
}

/// Returns the same trip for every load.
#[derive(Clone, Debug, Default)]
pub struct FixedRoute {
    trip: TripEstimate,
}

impl FixedRoute {
    pub fn new(trip: TripEstimate) -> Self {
        Self { trip }
    }
}

impl RouteEstimator for FixedRoute {
    fn estimate(&self, load: &LoadSpec) -> TripEstimate {
        tracing::debug!(
            "fixed route {} -> {}: {} km",
            load.pickup_addr,
            load.drop_addr,
            self.trip.km
        );
        self.trip.clone()
    }
}
