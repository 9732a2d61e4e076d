//! TUI event loop and app state.

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::mpsc;

use crate::{
    admin,
    booking::BookingStage,
    catalog::CategoryCatalog,
    clock::SystemClock,
    config::Config,
    driver::{PerformanceMetrics, sample_history, sample_performance},
    events::{Screen, UiState},
    input::InputBoxState,
    load::{Load, LoadDraft},
    notify::{ChannelSink, Notification, PermissionGate},
    quote::Quote,
    shortcuts::Shortcuts,
    suggest,
    ui::Tui,
    users::{InMemoryUserStore, Session, SessionFile},
    worker::{self, WorkerCmd, WorkerDeps, WorkerEvent},
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// Shipper-side mirror of the worker's booking.
#[derive(Clone, Debug)]
pub struct BookingView {
    pub draft: LoadDraft,
    pub stage: BookingStage,
    pub quote: Option<Quote>,
    pub booking: Option<Load>,
    pub progress: f64,
    pub suggesting: bool,
}

impl BookingView {
    fn new() -> Self {
        Self {
            draft: LoadDraft::default_route(),
            stage: BookingStage::CollectingDetails,
            quote: None,
            booking: None,
            progress: 0.0,
            suggesting: false,
        }
    }
}

/// Driver-side mirror of the worker's desk.
#[derive(Clone, Debug, Default)]
pub struct DriverView {
    pub online: bool,
    pub offers: Vec<Load>,
    pub accepted: Option<Load>,
    pub completed: Vec<Load>,
    pub total_earnings: i64,
    pub performance: PerformanceMetrics,
}

/// Admin console state. Users are read from the session's store.
#[derive(Clone, Debug, Default)]
pub struct AdminView {
    pub loads: Vec<Load>,
    pub user_query: String,
    pub load_query: String,
}

/// State shared by input handling and rendering.
pub struct App {
    pub cfg_path: PathBuf,
    pub cfg: Config,
    pub ui: UiState,
    pub catalog: CategoryCatalog,
    pub session: Session<InMemoryUserStore>,
    pub session_file: SessionFile,
    /// Logged in with an unknown number; waiting for s/d/a.
    pub awaiting_role: bool,
    pub notifier: PermissionGate<ChannelSink>,
    pub notes_rx: mpsc::UnboundedReceiver<Notification>,
    pub worker_tx: mpsc::Sender<WorkerCmd>,
    pub worker_rx: mpsc::Receiver<WorkerEvent>,
    pub booking: BookingView,
    pub driver: DriverView,
    pub admin: AdminView,
    /// Some while the popup is open.
    pub input_box: Option<InputBoxState>,
    pub shortcuts: Shortcuts,
}

/// Run the TUI until the user quits.
pub async fn run_app(terminal: &mut Tui) -> Result<()> {
    // Settings and key bindings; both fall back to defaults.
    let cfg_path = PathBuf::from("config.toml");
    let cfg = Config::load_or_default(&cfg_path)?;
    let shortcuts = Shortcuts::load_or_default("shortcut.toml")?;

    let (note_tx, notes_rx) = mpsc::unbounded_channel();
    let notifier = PermissionGate::new(ChannelSink::new(note_tx), cfg.notifications.permission);

    // Worker owns the booking flow, timers and driver desk.
    let (tx_cmd, rx_cmd) = mpsc::channel::<WorkerCmd>(64);
    let (tx_ev, rx_ev) = mpsc::channel::<WorkerEvent>(256);
    let deps = WorkerDeps::from_config(
        &cfg,
        suggest::from_config(&cfg.suggestion),
        Arc::new(notifier.clone()),
        Arc::new(SystemClock),
    );
    tokio::spawn(worker::run(rx_cmd, tx_ev, deps));

    // A stored session skips the login screen.
    let mut session = Session::new(InMemoryUserStore::seeded());
    let session_file = SessionFile::new("session.json");
    match session_file.load().await {
        Ok(Some(user)) => {
            session.restore(user);
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("session restore failed: {e}"),
    }
    let role = session.current().and_then(|u| u.role);

    let history = sample_history();
    let mut app = App {
        cfg_path,
        cfg,
        ui: UiState::new(Screen::for_role(role)),
        catalog: CategoryCatalog::standard(),
        session,
        session_file,
        awaiting_role: false,
        notifier,
        notes_rx,
        worker_tx: tx_cmd,
        worker_rx: rx_ev,
        booking: BookingView::new(),
        driver: DriverView {
            total_earnings: history.iter().map(|l| l.payout).sum(),
            completed: history,
            performance: sample_performance().metrics(),
            ..DriverView::default()
        },
        admin: AdminView {
            loads: admin::sample_loads(),
            ..AdminView::default()
        },
        input_box: None,
        shortcuts,
    };
    if role.is_some() {
        sync_shipper(&mut app).await?;
        app.ui.status = "Session restored".into();
    }

    loop {
        terminal.draw(|f| draw(f, &app))?;

        // Drain worker output before blocking on input.
        while let Ok(ev) = app.worker_rx.try_recv() {
            handle_worker_event(&mut app, ev);
        }
        while let Ok(note) = app.notes_rx.try_recv() {
            app.ui.status = note.title.clone();
            app.ui.push_log(format!("[{}] {}", note.title, note.body));
        }

        // Short poll keeps timers and quote countdowns moving on screen.
        if event::poll(Duration::from_millis(50))?
            && let Event::Key(k) = event::read()?
        {
            if is_ctrl_c(&k) {
                break;
            }
            if handle_key(&mut app, k).await? {
                break;
            }
        }
    }
    Ok(())
}

/// Apply a worker event to the view state.
fn handle_worker_event(app: &mut App, ev: WorkerEvent) {
    match ev {
        WorkerEvent::Suggested(category) => {
            // A suggestion that lands after the user moved on is dropped.
            if app.booking.stage != BookingStage::CollectingDetails || !app.booking.suggesting {
                tracing::debug!("ignoring late suggestion {category:?}");
                return;
            }
            app.booking.suggesting = false;
            app.booking.draft.category_required = Some(category);
            app.ui.status = format!("Suggested: {}", app.catalog.name_of(category));
        }
        WorkerEvent::Quoted(quote) => {
            app.ui.error = None;
            app.ui.status = format!("Quote {} ready", quote.reference());
            app.booking.quote = Some(quote);
        }
        WorkerEvent::StageChanged(stage) => {
            app.booking.stage = stage;
            if stage == BookingStage::CollectingDetails {
                app.booking.quote = None;
                app.booking.booking = None;
                app.booking.progress = 0.0;
            }
        }
        WorkerEvent::Assigned(load) => {
            app.booking.progress = 0.0;
            app.ui.push_log(format!("driver assigned to {}", load.id));
            admin::upsert_load(&mut app.admin.loads, load.clone());
            app.booking.booking = Some(load);
        }
        WorkerEvent::Progress(pct) => app.booking.progress = pct,
        WorkerEvent::Delivered(load) => {
            app.booking.progress = 100.0;
            app.ui.status = format!("{} delivered", load.id);
            admin::upsert_load(&mut app.admin.loads, load.clone());
            app.booking.booking = Some(load);
        }
        WorkerEvent::OfferArrived(load) => {
            app.driver.offers.insert(0, load);
            app.ui.selected = 0;
        }
        WorkerEvent::OffersCleared => {
            app.driver.offers.clear();
            app.ui.selected = 0;
        }
        WorkerEvent::OfferAccepted(load) => {
            app.driver.offers.retain(|l| l.id != load.id);
            app.ui.selected = app.ui.selected.min(app.driver.offers.len().saturating_sub(1));
            app.ui.status = format!("Accepted {}", load.id);
            app.driver.accepted = Some(load);
        }
        WorkerEvent::JobCompleted {
            load,
            total_earnings,
        } => {
            app.driver.accepted = None;
            app.ui.status = format!("Completed {}", load.id);
            app.driver.completed.insert(0, load);
            app.driver.total_earnings = total_earnings;
        }
        WorkerEvent::Performance(metrics) => app.driver.performance = metrics,
        WorkerEvent::Log(s) => app.ui.push_log(s),
        WorkerEvent::Error(s) => {
            app.booking.suggesting = false;
            app.ui.error = Some(s);
        }
    }
}

/// Tell the worker who is booking, if anyone.
pub async fn sync_shipper(app: &mut App) -> Result<()> {
    let shipper = app.session.shipper_id().ok().map(str::to_string);
    app.worker_tx.send(WorkerCmd::SetShipper(shipper)).await?;
    Ok(())
}
