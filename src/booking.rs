//! Shipper booking lifecycle: details -> quote -> confirm -> transit -> delivered.
//!
//! `BookingFlow` is a plain state machine. It never sleeps or spawns; the
//! worker drives it with timer events (driver assignment, progress ticks) and
//! owns the side effects. Every failing operation leaves the flow where it
//! was, except an expired quote which sends it back to detail entry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    catalog::{CategoryCatalog, TruckCategory},
    error::{BookingError, Result},
    fare::{TripParameters, calculate_fare},
    load::{Load, LoadDraft, LoadStatus},
    quote::Quote,
    routing::RouteEstimator,
};

/// Where the shipper is in the wizard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStage {
    CollectingDetails,
    Quoted,
    Confirming,
    InTransit,
    Delivered,
}

impl BookingStage {
    /// Index into the three wizard steps shown to the shipper.
    pub fn step_index(&self) -> usize {
        match self {
            BookingStage::CollectingDetails => 0,
            BookingStage::Quoted | BookingStage::Confirming => 1,
            BookingStage::InTransit | BookingStage::Delivered => 2,
        }
    }
}

impl fmt::Display for BookingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BookingStage::CollectingDetails => "collecting details",
            BookingStage::Quoted => "quoted",
            BookingStage::Confirming => "confirming",
            BookingStage::InTransit => "in transit",
            BookingStage::Delivered => "delivered",
        })
    }
}

/// Transitions that carry a side effect for the caller to perform.
#[derive(Clone, Debug, PartialEq)]
pub enum BookingEvent {
    /// A driver took the load; it is now in transit.
    DriverAssigned(Load),
    /// Progress reached 100%. Emitted once per booking.
    Delivered(Load),
}

/// State of one shipper's booking wizard.
#[derive(Clone, Debug)]
pub struct BookingFlow {
    stage: BookingStage,
    draft: LoadDraft,
    quote: Option<Quote>,
    booking: Option<Load>,
    progress: f64,
    /// Bumped whenever pending timers must be considered stale.
    generation: u64,
}

impl Default for BookingFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingFlow {
    pub fn new() -> Self {
        Self {
            stage: BookingStage::CollectingDetails,
            draft: LoadDraft::default_route(),
            quote: None,
            booking: None,
            progress: 0.0,
            generation: 0,
        }
    }

    pub fn stage(&self) -> BookingStage {
        self.stage
    }

    pub fn draft(&self) -> &LoadDraft {
        &self.draft
    }

    pub fn quote(&self) -> Option<&Quote> {
        self.quote.as_ref()
    }

    pub fn booking(&self) -> Option<&Load> {
        self.booking.as_ref()
    }

    /// Delivery progress in percent, 0 outside of transit.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Price the draft and move to `Quoted`.
    ///
    /// The draft is kept even when pricing fails so the form shows what the
    /// shipper typed.
    pub fn submit(
        &mut self,
        draft: LoadDraft,
        catalog: &CategoryCatalog,
        route: &dyn RouteEstimator,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<&Quote> {
        self.expect_stage(BookingStage::CollectingDetails, "request a quote")?;
        self.draft = draft;

        // Every required field present, category in the catalog.
        let spec = self.draft.complete()?;
        let category = catalog.find(spec.category_required)?;
        let trip = route.estimate(&spec);

        // Reefer categories always run refrigerated.

        let params = TripParameters {
            category,
            km: trip.km,
            wait_h: trip.wait_h,
            night: trip.night,
            reefer: spec.category_required == TruckCategory::Reefer,
            tolls: trip.tolls,
        };
        params.validate()?;
        let fare = calculate_fare(&params);

        // Only a successful quote moves the stage.

        let quote = Quote::issue(spec, fare, now, ttl);
        tracing::info!(
            "quote {} issued: total {} PKR, expires {}",
            quote.reference(),
            fare.total_fare,
            quote.expires_at
        );
        self.stage = BookingStage::Quoted;
        Ok(self.quote.insert(quote))
    }

    /// Discard the quote and return to detail entry.
    pub fn go_back(&mut self) -> Result<()> {
        self.expect_stage(BookingStage::Quoted, "go back")?;
        self.quote = None;
        self.stage = BookingStage::CollectingDetails;
        self.generation += 1;
        Ok(())
    }

    /// Accept the quote on behalf of `shipper_id` and start dispatch.
    ///
    /// An expired quote is discarded and the flow returns to detail entry.
    pub fn confirm(&mut self, shipper_id: &str, now: DateTime<Utc>) -> Result<&Load> {
        self.expect_stage(BookingStage::Quoted, "confirm")?;
        let Some(quote) = self.quote.as_ref() else {
            return Err(self.invalid("confirm"));
        };

        if let Err(e) = quote.ensure_valid(now) {
            tracing::warn!("quote {} expired, re-quote required", quote.reference());
            self.quote = None;
            self.stage = BookingStage::CollectingDetails;
            self.generation += 1;
            return Err(e);
        }

        let load = Load::pending(
            shipper_id,
            quote.load_details.clone(),
            quote.price_breakdown.driver_payout,
        );
        tracing::info!("booking {} confirmed by {shipper_id}", load.id);
        self.stage = BookingStage::Confirming;
        self.generation += 1;
        Ok(self.booking.insert(load))
    }

    /// Abort while waiting for a driver. Returns the cancelled load.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<Load> {
        self.expect_stage(BookingStage::Confirming, "cancel")?;
        let Some(mut load) = self.booking.take() else {
            return Err(self.invalid("cancel"));
        };
        load.transition(LoadStatus::Cancelled, now)?;
        tracing::info!("booking {} cancelled before dispatch", load.id);
        self.quote = None;
        self.stage = BookingStage::CollectingDetails;
        self.generation += 1;
        Ok(load)
    }

    /// A driver was assigned: the load goes in transit.
    pub fn assigned(&mut self, now: DateTime<Utc>) -> Result<BookingEvent> {
        self.expect_stage(BookingStage::Confirming, "assign a driver")?;
        let Some(load) = self.booking.as_mut() else {
            return Err(self.invalid("assign a driver"));
        };
        load.transition(LoadStatus::InTransit, now)?;
        let event = BookingEvent::DriverAssigned(load.clone());
        self.progress = 0.0;
        self.stage = BookingStage::InTransit;
        Ok(event)
    }

    /// Feed a progress sample. Progress never goes down; the first sample at
    /// 100% delivers the load and yields `Delivered`, later ones yield nothing.
    pub fn record_progress(&mut self, percent: f64, now: DateTime<Utc>) -> Option<BookingEvent> {
        if self.stage != BookingStage::InTransit || percent.is_nan() {
            return None;
        }
        self.progress = self.progress.max(percent.clamp(0.0, 100.0));
        if self.progress < 100.0 {
            return None;
        }

        let load = self.booking.as_mut()?;
        if let Err(e) = load.transition(LoadStatus::Delivered, now) {
            tracing::error!("delivery of {} rejected: {e}", load.id);
            return None;
        }
        tracing::info!("booking {} delivered", load.id);
        self.stage = BookingStage::Delivered;
        Some(BookingEvent::Delivered(load.clone()))
    }

    /// Start over with a fresh draft. Allowed from any stage.
    /// Returns the booking that was on screen, if any.
    pub fn book_another(&mut self) -> Option<Load> {
        self.stage = BookingStage::CollectingDetails;
        self.draft = LoadDraft::reset();
        self.quote = None;
        self.progress = 0.0;
        self.generation += 1;
        self.booking.take()
    }

    fn expect_stage(&self, stage: BookingStage, action: &'static str) -> Result<()> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> BookingError {
        BookingError::InvalidTransition {
            state: self.stage.to_string(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{quote::DEFAULT_QUOTE_TTL_SECS, routing::FixedRoute};
    use proptest::prelude::*;

    fn ttl() -> Duration {
        Duration::seconds(DEFAULT_QUOTE_TTL_SECS)
    }

    fn quoted(now: DateTime<Utc>) -> BookingFlow {
        let mut flow = BookingFlow::new();
        flow.submit(
            LoadDraft::default_route(),
            &CategoryCatalog::standard(),
            &FixedRoute::default(),
            now,
            ttl(),
        )
        .unwrap();
        flow
    }

    fn in_transit(now: DateTime<Utc>) -> BookingFlow {
        let mut flow = quoted(now);
        flow.confirm("user_shipper_1", now).unwrap();
        flow.assigned(now).unwrap();
        flow
    }

    #[test]
    fn test_submit_prices_with_fixed_trip() {
        let now = Utc::now();
        let flow = quoted(now);
        assert_eq!(flow.stage(), BookingStage::Quoted);
        let quote = flow.quote().unwrap();
        assert_eq!(quote.price_breakdown.total_fare, 148_925);
        assert_eq!(quote.price_breakdown.driver_payout, 129_500);
        assert_eq!(quote.expires_at, now + Duration::minutes(15));
    }

    #[test]
    fn test_reefer_load_gets_reefer_surcharge() {
        let mut flow = BookingFlow::new();
        let draft = LoadDraft {
            category_required: Some(TruckCategory::Reefer),
            ..LoadDraft::default_route()
        };
        let quote = flow
            .submit(
                draft,
                &CategoryCatalog::standard(),
                &FixedRoute::default(),
                Utc::now(),
                ttl(),
            )
            .unwrap();
        // (12000 + 180000) * 0.4
        assert_eq!(quote.price_breakdown.reefer_surcharge, 76_800);
    }

    #[test]
    fn test_incomplete_details_stay_in_collecting() {
        let mut flow = BookingFlow::new();
        let draft = LoadDraft {
            goods_type: None,
            ..LoadDraft::default_route()
        };
        let err = flow
            .submit(
                draft.clone(),
                &CategoryCatalog::standard(),
                &FixedRoute::default(),
                Utc::now(),
                ttl(),
            )
            .unwrap_err();
        assert_eq!(err, BookingError::IncompleteLoadDetails(vec!["goods type"]));
        assert_eq!(flow.stage(), BookingStage::CollectingDetails);
        assert!(flow.quote().is_none());
        assert_eq!(flow.draft(), &draft);
    }

    #[test]
    fn test_unresolvable_category_rejected_before_pricing() {
        let standard = CategoryCatalog::standard();
        let catalog =
            CategoryCatalog::new(vec![standard.find(TruckCategory::Flatbed).unwrap().clone()])
                .unwrap();
        let mut flow = BookingFlow::new();
        let err = flow
            .submit(
                LoadDraft::default_route(),
                &catalog,
                &FixedRoute::default(),
                Utc::now(),
                ttl(),
            )
            .unwrap_err();
        assert_eq!(err, BookingError::InvalidCategory("general_cargo".into()));
        assert_eq!(flow.stage(), BookingStage::CollectingDetails);
    }

    #[test]
    fn test_negative_trip_rejected() {
        let route = FixedRoute::new(crate::routing::TripEstimate {
            km: -10.0,
            ..Default::default()
        });
        let mut flow = BookingFlow::new();
        let err = flow
            .submit(
                LoadDraft::default_route(),
                &CategoryCatalog::standard(),
                &route,
                Utc::now(),
                ttl(),
            )
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidTrip(_)));
        assert_eq!(flow.stage(), BookingStage::CollectingDetails);
    }

    #[test]
    fn test_go_back_discards_quote_keeps_draft() {
        let mut flow = quoted(Utc::now());
        let generation = flow.generation();
        flow.go_back().unwrap();
        assert_eq!(flow.stage(), BookingStage::CollectingDetails);
        assert!(flow.quote().is_none());
        assert_eq!(flow.draft(), &LoadDraft::default_route());
        assert!(flow.generation() > generation);
    }

    #[test]
    fn test_confirm_strictly_before_expiry() {
        let now = Utc::now();
        let mut flow = quoted(now);
        let expires_at = flow.quote().unwrap().expires_at;
        let load = flow
            .confirm("user_shipper_1", expires_at - Duration::milliseconds(1))
            .unwrap();
        assert_eq!(load.status, LoadStatus::Pending);
        assert_eq!(load.payout, 129_500);
        assert_eq!(flow.stage(), BookingStage::Confirming);
    }

    #[test]
    fn test_confirm_at_expiry_forces_requote() {
        let now = Utc::now();
        let mut flow = quoted(now);
        let expires_at = flow.quote().unwrap().expires_at;
        let err = flow.confirm("user_shipper_1", expires_at).unwrap_err();
        assert_eq!(err, BookingError::QuoteExpired { expired_at: expires_at });
        assert_eq!(flow.stage(), BookingStage::CollectingDetails);
        assert!(flow.quote().is_none());
        assert!(flow.booking().is_none());
    }

    #[test]
    fn test_cancel_while_confirming() {
        let now = Utc::now();
        let mut flow = quoted(now);
        flow.confirm("user_shipper_1", now).unwrap();
        let cancelled = flow.cancel(now).unwrap();
        assert_eq!(cancelled.status, LoadStatus::Cancelled);
        assert_eq!(flow.stage(), BookingStage::CollectingDetails);
        assert!(flow.booking().is_none());
        assert!(matches!(
            flow.assigned(now),
            Err(BookingError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_assigned_moves_to_transit() {
        let now = Utc::now();
        let mut flow = quoted(now);
        flow.confirm("user_shipper_1", now).unwrap();
        let event = flow.assigned(now).unwrap();
        let BookingEvent::DriverAssigned(load) = event else {
            panic!("expected DriverAssigned");
        };
        assert_eq!(load.status, LoadStatus::InTransit);
        assert_eq!(flow.stage(), BookingStage::InTransit);
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let now = Utc::now();
        let mut flow = in_transit(now);
        assert!(flow.record_progress(40.0, now).is_none());
        assert!(flow.record_progress(10.0, now).is_none());
        assert_eq!(flow.progress(), 40.0);
        assert!(flow.record_progress(f64::NAN, now).is_none());
        assert_eq!(flow.progress(), 40.0);
    }

    fn tick() -> impl Strategy<Value = f64> {
        prop_oneof![
            -50.0f64..150.0,
            Just(100.0),
            Just(f64::NAN),
            Just(f64::INFINITY),
        ]
    }

    proptest! {
        #[test]
        fn test_progress_monotonic_and_delivered_once(
            ticks in prop::collection::vec(tick(), 0..60)
        ) {
            let now = Utc::now();
            let mut flow = in_transit(now);
            let mut delivered = 0;
            let mut last = flow.progress();

            for pct in &ticks {
                if let Some(BookingEvent::Delivered(load)) = flow.record_progress(*pct, now) {
                    prop_assert_eq!(load.status, LoadStatus::Delivered);
                    prop_assert_eq!(load.completed_at, Some(now));
                    delivered += 1;
                }
                prop_assert!(flow.progress() >= last);
                prop_assert!((0.0..=100.0).contains(&flow.progress()));
                last = flow.progress();
            }

            let reaches_end = ticks.iter().any(|p| *p >= 100.0);
            prop_assert_eq!(delivered, usize::from(reaches_end));
            if reaches_end {
                prop_assert_eq!(flow.stage(), BookingStage::Delivered);
                prop_assert_eq!(flow.progress(), 100.0);
            } else {
                prop_assert_eq!(flow.stage(), BookingStage::InTransit);
            }
        }
    }

    #[test]
    fn test_book_another_resets_everything() {
        let now = Utc::now();
        let mut flow = in_transit(now);
        flow.record_progress(100.0, now);
        let previous = flow.book_another().unwrap();
        assert_eq!(previous.status, LoadStatus::Delivered);
        assert_eq!(flow.stage(), BookingStage::CollectingDetails);
        assert_eq!(flow.draft(), &LoadDraft::reset());
        assert!(flow.quote().is_none());
        assert_eq!(flow.progress(), 0.0);
    }

    #[test]
    fn test_invalid_actions_change_nothing() {
        let now = Utc::now();
        let mut flow = BookingFlow::new();
        assert!(flow.go_back().is_err());
        assert!(flow.confirm("user_shipper_1", now).is_err());
        assert!(flow.cancel(now).is_err());
        assert!(flow.record_progress(100.0, now).is_none());
        assert_eq!(flow.stage(), BookingStage::CollectingDetails);

        let mut flow = quoted(now);
        let err = flow
            .submit(
                LoadDraft::default_route(),
                &CategoryCatalog::standard(),
                &FixedRoute::default(),
                now,
                ttl(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            BookingError::InvalidTransition {
                state: "quoted".into(),
                action: "request a quote"
            }
        );
        assert!(flow.quote().is_some());
    }

    #[test]
    fn test_step_index_follows_wizard() {
        assert_eq!(BookingStage::CollectingDetails.step_index(), 0);
        assert_eq!(BookingStage::Confirming.step_index(), 1);
        assert_eq!(BookingStage::Delivered.step_index(), 2);
    }
}
