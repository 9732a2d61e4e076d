//! Background worker owning the booking session and its timers.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::{
    booking::{BookingEvent, BookingFlow, BookingStage},
    catalog::{CategoryCatalog, TruckCategory},
    clock::Clock,
    config::Config,
    driver::{
        DriverDesk, PerformanceCounters, PerformanceMetrics, sample_history, sample_offers,
        sample_performance,
    },
    error::BookingError,
    load::{Load, LoadDraft},
    notify::{Notification, NotificationSink},
    quote::Quote,
    routing::{FixedRoute, RouteEstimator},
    suggest::CategorySuggester,
    tracking::{DispatchTimer, JobFeed, ProgressTicker, Tagged, TimerEvent, TimerHandle},
};

/// Commands sent from the UI to the worker.
#[derive(Debug)]
pub enum WorkerCmd {
    /// Ask for a truck category for a goods description.
    SuggestCategory { goods: String },
    /// Price the draft.
    RequestQuote(LoadDraft),
    /// Leave the fare screen.
    GoBack,
    /// Accept the current quote and look for a driver.
    Confirm,
    /// Abort while a driver is being found.
    CancelBooking,
    /// Start over.
    BookAnother,
    /// Who bookings are made for; `None` after logout.
    SetShipper(Option<String>),
    /// Driver availability toggle.
    DriverOnline(bool),
    /// Driver takes an offer by load id.
    AcceptOffer(String),
    /// Driver delivered the accepted job.
    CompleteJob,
}

/// Events emitted by the worker for UI updates.
#[derive(Clone, Debug)]
pub enum WorkerEvent {
    Suggested(TruckCategory),
    Quoted(Quote),
    StageChanged(BookingStage),
    /// Driver found; load is in transit.
    Assigned(Load),
    Progress(f64),
    Delivered(Load),
    OfferArrived(Load),
    OffersCleared,
    OfferAccepted(Load),
    JobCompleted { load: Load, total_earnings: i64 },
    /// Driver score after an offer, acceptance or delivery.
    Performance(PerformanceMetrics),
    /// Informational log message.
    Log(String),
    /// User-visible error message.
    Error(String),
}

/// Collaborators and timings the worker runs with.
pub struct WorkerDeps {
    pub catalog: CategoryCatalog,
    pub route: Box<dyn RouteEstimator>,
    pub suggester: Arc<dyn CategorySuggester>,
    pub notifier: Arc<dyn NotificationSink>,
    pub clock: Arc<dyn Clock>,
    pub quote_ttl: chrono::Duration,
    pub dispatch: DispatchTimer,
    pub ticker: ProgressTicker,
    pub feed: JobFeed,
    /// Loads offered to a driver going online.
    pub offers: Vec<Load>,
    pub history: Vec<Load>,
    pub performance: PerformanceCounters,
}

impl WorkerDeps {
    pub fn from_config(
        cfg: &Config,
        suggester: Arc<dyn CategorySuggester>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog: CategoryCatalog::standard(),
            route: Box::new(FixedRoute::new(cfg.trip.clone())),
            suggester,
            notifier,
            clock,
            quote_ttl: cfg.pricing.quote_ttl(),
            dispatch: cfg.simulation.dispatch(),
            ticker: cfg.simulation.ticker(),
            feed: cfg.simulation.job_feed(),
            offers: sample_offers(),
            history: sample_history(),
            performance: sample_performance(),
        }
    }
}

struct Session {
    deps: WorkerDeps,
    flow: BookingFlow,
    desk: DriverDesk,
    shipper_id: Option<String>,
    dispatch: Option<TimerHandle>,
    tracking: Option<TimerHandle>,
    feed: Option<TimerHandle>,
    feed_generation: u64,
    timer_tx: mpsc::Sender<Tagged>,
    tx: mpsc::Sender<WorkerEvent>,
}

/// Main worker loop: commands and timer events are handled one at a time.
pub async fn run(
    mut rx: mpsc::Receiver<WorkerCmd>,
    tx: mpsc::Sender<WorkerEvent>,
    deps: WorkerDeps,
) {
    // Timers report back on their own channel, tagged with a generation.
    let (timer_tx, mut timer_rx) = mpsc::channel(256);
    let mut session = Session {
        desk: DriverDesk::new(deps.history.clone(), deps.performance),
        deps,
        flow: BookingFlow::new(),
        shipper_id: None,
        dispatch: None,
        tracking: None,
        feed: None,
        feed_generation: 0,
        timer_tx,
        tx,
    };
    tracing::info!("worker started");

    // Commands and timer events interleave but never run concurrently.
    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(cmd) => session.handle_cmd(cmd).await,
                None => break,
            },
            Some(tagged) = timer_rx.recv() => session.handle_timer(tagged).await,
        }
    }

    // UI gone: nothing may fire after this.
    session.stop_booking_timers();
    if let Some(feed) = session.feed.take() {
        feed.cancel();
    }
    tracing::info!("worker stopped");
}

impl Session {
    async fn emit(&self, event: WorkerEvent) {
        let _ = self.tx.send(event).await;
    }

    async fn fail(&self, context: &str, e: BookingError) {
        tracing::warn!("{context}: {e}");
        self.emit(WorkerEvent::Error(format!("{context}: {e}"))).await;
    }

    fn stop_booking_timers(&mut self) {
        for handle in [self.dispatch.take(), self.tracking.take()].into_iter().flatten() {
            handle.cancel();
        }
    }

    async fn performance_changed(&self) {
        self.emit(WorkerEvent::Performance(self.desk.performance())).await;
    }

    async fn stage_changed(&self) {
        self.emit(WorkerEvent::StageChanged(self.flow.stage())).await;
    }

    async fn handle_cmd(&mut self, cmd: WorkerCmd) {
        match cmd {
            WorkerCmd::SuggestCategory { goods } => {
                // Network call; keep timers flowing while it runs.
                let suggester = self.deps.suggester.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let category = suggester.suggest(&goods).await;
                    let _ = tx.send(WorkerEvent::Suggested(category)).await;
                });
            }

            WorkerCmd::RequestQuote(draft) => {
                // Price the draft with the configured trip estimate.
                let now = self.deps.clock.now();
                let res = self.flow.submit(
                    draft,
                    &self.deps.catalog,
                    self.deps.route.as_ref(),
                    now,
                    self.deps.quote_ttl,
                );
                match res {
                    Ok(quote) => {
                        // Quote first, then the stage, so the fare screen has data.
                        let quote = quote.clone();
                        self.emit(WorkerEvent::Quoted(quote)).await;
                        self.stage_changed().await;
                    }
                    Err(e) => self.fail("quote failed", e).await,
                }
            }

            WorkerCmd::GoBack => match self.flow.go_back() {
                Ok(()) => {
                    self.stop_booking_timers();
                    self.stage_changed().await;
                }
                Err(e) => self.fail("go back", e).await,
            },

            WorkerCmd::Confirm => {
                // Bookings need a logged-in shipper.
                let Some(shipper_id) = self.shipper_id.clone() else {
                    self.fail("confirm", BookingError::NotLoggedIn).await;
                    return;
                };
                let now = self.deps.clock.now();
                match self.flow.confirm(&shipper_id, now) {
                    Ok(load) => {
                        let msg = format!("booking {} placed, finding a driver", load.id);
                        // Driver assignment arrives later as a timer event.
                        self.dispatch = Some(
                            self.deps
                                .dispatch
                                .start(self.flow.generation(), self.timer_tx.clone()),
                        );
                        self.emit(WorkerEvent::Log(msg)).await;
                    }
                    Err(e) => {
                        // Expiry moves the flow back; everything else leaves it.
                        self.fail("confirm failed", e).await;
                    }
                }
                self.stage_changed().await;
            }

            WorkerCmd::CancelBooking => match self.flow.cancel(self.deps.clock.now()) {
                Ok(load) => {
                    self.stop_booking_timers();
                    self.emit(WorkerEvent::Log(format!("booking {} cancelled", load.id)))
                        .await;
                    self.stage_changed().await;
                }
                Err(e) => self.fail("cancel", e).await,
            },

            WorkerCmd::BookAnother => {
                self.stop_booking_timers();
                self.flow.book_another();
                self.stage_changed().await;
            }

            WorkerCmd::SetShipper(id) => {
                tracing::info!("shipper set to {id:?}");
                // Logout drops whatever was in flight.
                if id.is_none() {
                    self.stop_booking_timers();
                    self.flow.book_another();
                }
                self.shipper_id = id;
            }

            WorkerCmd::DriverOnline(online) if online == self.desk.is_online() => {}

            WorkerCmd::DriverOnline(online) => {
                self.desk.set_online(online);
                // New generation: offers from an earlier shift are stale.
                self.feed_generation += 1;
                if let Some(feed) = self.feed.take() {
                    feed.cancel();
                }
                self.feed = online.then(|| {
                    self.deps.feed.start(
                        self.deps.offers.clone(),
                        self.feed_generation,
                        self.timer_tx.clone(),
                    )
                });
                tracing::info!("driver {}", if online { "online" } else { "offline" });
                self.emit(WorkerEvent::OffersCleared).await;
            }

            WorkerCmd::AcceptOffer(id) => match self.desk.accept(&id, self.deps.clock.now()) {
                Ok(load) => {
                    let load = load.clone();
                    self.emit(WorkerEvent::OfferAccepted(load)).await;
                    self.performance_changed().await;
                }
                Err(e) => self.fail("accept", e).await,
            },

            WorkerCmd::CompleteJob => match self.desk.complete(self.deps.clock.now()) {
                Ok(load) => {
                    let load = load.clone();
                    let total_earnings = self.desk.total_earnings();
                    self.emit(WorkerEvent::JobCompleted {
                        load,
                        total_earnings,
                    })
                    .await;
                    self.performance_changed().await;
                }
                Err(e) => self.fail("complete", e).await,
            },
        }
    }

    async fn handle_timer(&mut self, Tagged { generation, event }: Tagged) {
        if let TimerEvent::OfferArrived(load) = event {
            if generation != self.feed_generation {
                tracing::debug!("stale offer {} dropped", load.id);
                return;
            }
            if self.desk.offer_arrived(load.clone()) {
                self.deps.notifier.notify(Notification::new(
                    "New Job Offer!",
                    format!(
                        "Load from {} to {} is now available.",
                        load.spec.pickup_addr, load.spec.drop_addr
                    ),
                ));
                self.emit(WorkerEvent::OfferArrived(load)).await;
                self.performance_changed().await;
            }
            return;
        }

        if generation != self.flow.generation() {
            tracing::debug!("stale timer event {event:?} dropped (generation {generation})");
            return;
        }
        let now = self.deps.clock.now();
        match event {
            TimerEvent::DriverAssigned => {
                self.dispatch = None;
                match self.flow.assigned(now) {
                    Ok(BookingEvent::DriverAssigned(load)) => {
                        self.deps.notifier.notify(Notification::new(
                            "Job Accepted!",
                            format!(
                                "A driver is en route to pick up your shipment from {}.",
                                load.spec.pickup_addr
                            ),
                        ));
                        self.tracking = Some(
                            self.deps
                                .ticker
                                .start(self.flow.generation(), self.timer_tx.clone()),
                        );
                        self.emit(WorkerEvent::Assigned(load)).await;
                        self.stage_changed().await;
                    }
                    Ok(other) => tracing::error!("unexpected booking event {other:?}"),
                    Err(e) => self.fail("dispatch", e).await,
                }
            }
            TimerEvent::Progress(pct) => {
                let delivered = self.flow.record_progress(pct, now);
                self.emit(WorkerEvent::Progress(self.flow.progress())).await;
                if let Some(BookingEvent::Delivered(load)) = delivered {
                    self.delivered(load).await;
                }
            }
            TimerEvent::TrackingFinished => {
                self.tracking = None;
                if let Some(BookingEvent::Delivered(load)) = self.flow.record_progress(100.0, now) {
                    self.delivered(load).await;
                }
            }
            TimerEvent::OfferArrived(_) => {}
        }
    }

    async fn delivered(&self, load: Load) {
        self.deps.notifier.notify(Notification::new(
            "Shipment Delivered!",
            format!(
                "Your shipment from {} to {} has been successfully delivered.",
                load.spec.pickup_addr, load.spec.drop_addr
            ),
        ));
        self.emit(WorkerEvent::Delivered(load)).await;
        self.stage_changed().await;
    }
}
