//! Driver side: online toggle, incoming offers, the accepted job, earnings
//! and the performance score.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::{
    catalog::TruckCategory,
    error::{BookingError, Result},
    load::{LatLng, Load, LoadSpec, LoadStatus},
};

/// Demo load with a fixed id, listed by the marketplace.
pub(crate) fn demo_load(
    id: &str,
    (pickup, pickup_at): (&str, LatLng),
    (drop, drop_at): (&str, LatLng),
    category: TruckCategory,
    goods: &str,
    weight_tons: f64,
    payout: i64,
) -> Load {
    let spec = LoadSpec {
        pickup_addr: pickup.into(),
        drop_addr: drop.into(),
        pickup_latlng: pickup_at,
        drop_latlng: drop_at,
        goods_type: goods.into(),
        weight_tons,
        category_required: category,
    };
    Load {
        id: id.into(),
        ..Load::pending("marketplace", spec, payout)
    }
}

const fn at(lat: f64, lng: f64) -> LatLng {
    LatLng { lat, lng }
}

/// Offers released to a driver who goes online.
pub fn sample_offers() -> Vec<Load> {
    vec![
        demo_load(
            "LD10934",
            ("Sialkot", at(32.4945, 74.5229)),
            ("Rawalpindi", at(33.5651, 73.0169)),
            TruckCategory::GeneralCargo,
            "Surgical Instruments",
            12.0,
            27_200,
        ),
        demo_load(
            "LD55812",
            ("Gawadar Port", at(25.1216, 62.3254)),
            ("Quetta", at(30.1798, 66.9750)),
            TruckCategory::Flatbed,
            "Construction Steel",
            35.0,
            93_500,
        ),
        demo_load(
            "LD78144",
            ("Faisalabad Textile City", at(31.4504, 73.1350)),
            ("Karachi Port", at(24.8400, 66.9800)),
            TruckCategory::ArticulatedTrailer,
            "Textile Rolls",
            40.0,
            127_500,
        ),
    ]
}

/// Job history a demo driver starts with.
pub fn sample_history() -> Vec<Load> {
    let done = |mut load: Load, completed_at: DateTime<Utc>| {
        load.status = LoadStatus::Delivered;
        load.completed_at = Some(completed_at);
        load
    };
    let when = |d, h, m| {
        Utc.with_ymd_and_hms(2023, 10, d, h, m, 0)
            .single()
            .unwrap_or_default()
    };
    vec![
        done(
            demo_load(
                "LD93742",
                ("Faisalabad", at(31.4504, 73.1350)),
                ("Multan", at(30.1575, 71.5249)),
                TruckCategory::GeneralCargo,
                "Fertilizer Bags",
                20.0,
                42_000,
            ),
            when(24, 14, 0),
        ),
        done(
            demo_load(
                "LD38475",
                ("Gwadar", at(25.1216, 62.3254)),
                ("Quetta", at(30.1798, 66.9750)),
                TruckCategory::Flatbed,
                "Building Materials",
                30.0,
                105_000,
            ),
            when(22, 18, 30),
        ),
    ]
}

/// Weight of the on-time rate in the driver score.
pub const ON_TIME_WEIGHT: f64 = 0.6;
/// Weight of the acceptance rate in the driver score.
pub const ACCEPTANCE_WEIGHT: f64 = 0.4;
/// A job delivered within this many hours of acceptance counts as on time.
pub const ON_TIME_WINDOW_HOURS: i64 = 48;

/// Raw counts the score is computed from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PerformanceCounters {
    pub jobs_offered: u32,
    pub jobs_accepted: u32,
    pub deliveries_completed: u32,
    pub on_time_deliveries: u32,
}

/// Score and rates in whole percent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PerformanceMetrics {
    pub score: u32,
    pub acceptance_rate: u32,
    pub on_time_rate: u32,
}

impl PerformanceCounters {
    /// An empty denominator gives a 0% rate.
    pub fn metrics(&self) -> PerformanceMetrics {
        let rate = |part: u32, whole: u32| {
            if whole == 0 {
                0.0
            } else {
                f64::from(part) / f64::from(whole) * 100.0
            }
        };
        let acceptance = rate(self.jobs_accepted, self.jobs_offered);
        let on_time = rate(self.on_time_deliveries, self.deliveries_completed);
        let score = on_time * ON_TIME_WEIGHT + acceptance * ACCEPTANCE_WEIGHT;
        PerformanceMetrics {
            score: whole_percent(score),
            acceptance_rate: whole_percent(acceptance),
            on_time_rate: whole_percent(on_time),
        }
    }
}

fn whole_percent(x: f64) -> u32 {
    (x + 0.5).floor().clamp(0.0, 100.0) as u32
}

/// Track record a demo driver starts with.
pub fn sample_performance() -> PerformanceCounters {
    PerformanceCounters {
        jobs_offered: 25,
        jobs_accepted: 22,
        deliveries_completed: 22,
        on_time_deliveries: 20,
    }
}

/// What a driver sees and does.
#[derive(Clone, Debug, Default)]
pub struct DriverDesk {
    online: bool,
    offers: Vec<Load>,
    accepted: Option<Load>,
    accepted_at: Option<DateTime<Utc>>,
    completed: Vec<Load>,
    counters: PerformanceCounters,
}

impl DriverDesk {
    pub fn new(history: Vec<Load>, counters: PerformanceCounters) -> Self {
        Self {
            completed: history,
            counters,
            ..Self::default()
        }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Newest first.
    #[cfg(test)]
    pub fn offers(&self) -> &[Load] {
        &self.offers
    }

    #[cfg(test)]
    pub fn accepted(&self) -> Option<&Load> {
        self.accepted.as_ref()
    }

    pub fn performance(&self) -> PerformanceMetrics {
        self.counters.metrics()
    }

    /// Sum of payouts over completed jobs.
    pub fn total_earnings(&self) -> i64 {
        self.completed.iter().map(|l| l.payout).sum()
    }

    /// Switching either way clears the visible offers.
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
        self.offers.clear();
    }

    /// Returns false when offline or the offer is already listed.
    pub fn offer_arrived(&mut self, load: Load) -> bool {
        if !self.online || self.offers.iter().any(|l| l.id == load.id) {
            return false;
        }
        self.offers.insert(0, load);
        self.counters.jobs_offered += 1;
        true
    }

    /// Take an offer. Only one job can be in hand at a time.
    pub fn accept(&mut self, load_id: &str, now: DateTime<Utc>) -> Result<&Load> {
        if let Some(current) = &self.accepted {
            return Err(BookingError::InvalidTransition {
                state: format!("carrying {}", current.id),
                action: "accept another job",
            });
        }
        let idx = self
            .offers
            .iter()
            .position(|l| l.id == load_id)
            .ok_or_else(|| BookingError::InvalidTransition {
                state: "no such offer".into(),
                action: "accept a job",
            })?;
        let mut load = self.offers.remove(idx);
        load.transition(LoadStatus::InTransit, now)?;
        tracing::info!("driver accepted {}", load.id);
        self.counters.jobs_accepted += 1;
        self.accepted_at = Some(now);
        Ok(self.accepted.insert(load))
    }

    /// Deliver the job in hand and record it.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<&Load> {
        let mut load = self.accepted.take().ok_or(BookingError::InvalidTransition {
            state: "idle".into(),
            action: "complete a job",
        })?;
        load.transition(LoadStatus::Delivered, now)?;
        tracing::info!("driver completed {} for {} PKR", load.id, load.payout);

        self.counters.deliveries_completed += 1;
        let on_time = self
            .accepted_at
            .take()
            .is_some_and(|at| now - at <= Duration::hours(ON_TIME_WINDOW_HOURS));
        if on_time {
            self.counters.on_time_deliveries += 1;
        }
        self.completed.insert(0, load);
        Ok(&self.completed[0])
    }
}
