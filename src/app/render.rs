//! Drawing.

use chrono::Utc;
use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Gauge, Paragraph, Row, Table, TableState, Wrap},
};

use crate::{
    admin::{platform_stats, search_loads, search_users},
    booking::BookingStage,
    events::Screen,
    input, layout,
    load::Load,
    notify::NotificationPermission,
    shortcuts::Shortcuts,
    users::UserStatus,
    wizard::{WizardState, WizardStep},
};

use super::App;

/// Draw the whole frame.
pub fn draw(f: &mut Frame, app: &App) {
    if app.ui.screen == Screen::Login {
        draw_login_screen(f, app);
    } else {
        let main_layout = layout::create_main_layout(f.area());
        let body_layout = layout::create_body_layout(main_layout.body);

        match app.ui.screen {
            Screen::Shipper => draw_booking(f, app, body_layout.main_panel),
            Screen::Driver => draw_driver(f, app, body_layout.main_panel),
            Screen::Admin => draw_admin(f, app, body_layout.main_panel),
            Screen::Login => {}
        }

        let info = Paragraph::new(build_info_text(app))
            .block(Block::default().borders(Borders::ALL).title("INFO"))
            .wrap(Wrap { trim: true });
        f.render_widget(info, body_layout.info_panel);

        let help = Paragraph::new(get_help_text(app, &app.shortcuts))
            .block(Block::default().borders(Borders::ALL).title("HELP"))
            .wrap(Wrap { trim: true });
        f.render_widget(help, main_layout.help_bar);

        f.render_widget(build_status_bar(app), main_layout.status_bar);
    }

    if let Some(input_state) = &app.input_box {
        input::render_input_box(f, input_state);
    }
}

/// `PKR 148,925`.
pub fn format_pkr(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("PKR {sign}{grouped}")
}

fn route(load: &Load) -> String {
    format!("{} -> {}", load.spec.pickup_addr, load.spec.drop_addr)
}

fn draw_login_screen(f: &mut Frame, app: &App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(20),
            Constraint::Min(10),
            Constraint::Percentage(20),
        ])
        .split(f.area());

    let sc = &app.shortcuts.login;
    let body = if app.awaiting_role {
        format!(
            "Welcome! This number is new to TruckLink.\n\nHow will you use the app?\n\n  \
             {}  I ship goods (Shipper)\n  {}  I drive a truck (Driver)\n  {}  Admin",
            format_keys(&sc.shipper),
            format_keys(&sc.driver),
            format_keys(&sc.admin),
        )
    } else {
        format!(
            "=== TruckLink PK ===\n\nBook trucks across Pakistan.\n\n\
             Press {} to log in with your mobile number.\n{} quits.",
            format_keys(&sc.phone),
            format_keys(&app.shortcuts.global.quit),
        )
    };
    let content = Paragraph::new(body)
        .block(Block::default().borders(Borders::ALL).title("Login"))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    f.render_widget(content, outer[1]);

    if let Some(err) = &app.ui.error {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(f.area());
        let error = Paragraph::new(format!("ERROR: {err}"))
            .block(Block::default().borders(Borders::ALL).title("Error"))
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true });
        f.render_widget(error, rows[1]);
    }
}

fn draw_booking(f: &mut Frame, app: &App, area: Rect) {
    let wl = layout::create_wizard_layout(area);
    let wizard = WizardState::for_stage(app.booking.stage);

    let mut spans = vec![];
    for (i, step) in WizardStep::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  >  "));
        }
        let label = format!("{}. {}", i + 1, step.title());
        let style = if *step == wizard.current_step() && !wizard.is_done(*step) {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else if wizard.is_done(*step) {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(label, style));
    }
    let tracker = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Step {}/{}", wizard.get_step_number(), wizard.total_steps)),
    );
    f.render_widget(tracker, wl.tracker);

    let title = wizard.current_step().title();
    match app.booking.stage {
        BookingStage::CollectingDetails => draw_load_details(f, app, wl.content, title),
        BookingStage::Quoted => draw_fare(f, app, wl.content, title),
        BookingStage::Confirming => {
            let id = app
                .booking
                .booking
                .as_ref()
                .map(|l| l.id.as_str())
                .unwrap_or("-");
            let text = format!("{}\n\nBooking: {id}", wizard.get_prompt());
            f.render_widget(
                Paragraph::new(text)
                    .block(Block::default().borders(Borders::ALL).title(title))
                    .wrap(Wrap { trim: true }),
                wl.content,
            );
        }
        BookingStage::InTransit | BookingStage::Delivered => {
            draw_tracking(f, app, wl.content, &wizard, title)
        }
    }
}

fn draw_load_details(f: &mut Frame, app: &App, area: Rect, title: &str) {
    let d = &app.booking.draft;
    let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
    let category = match d.category_required {
        Some(c) => app.catalog.name_of(c).to_string(),
        None => "-".into(),
    };
    let fields = [
        ("Pickup", text(&d.pickup_addr)),
        ("Drop", text(&d.drop_addr)),
        ("Goods", text(&d.goods_type)),
        (
            "Weight",
            d.weight_tons
                .map(|w| format!("{w} tons"))
                .unwrap_or_else(|| "-".into()),
        ),
        ("Truck", category),
    ];

    let mut lines = vec![Line::from(WizardState::new().get_prompt()), Line::from("")];
    for (i, (name, value)) in fields.iter().enumerate() {
        let marker = if i == app.ui.editing_field_idx { ">" } else { " " };
        let style = if i == app.ui.editing_field_idx {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::styled(format!("{marker} {name:<7} {value}"), style));
    }

    if let (Some(c), Some(w)) = (d.category_required, d.weight_tons)
        && let Ok(details) = app.catalog.find(c)
        && !details.fits_payload(w)
    {
        lines.push(Line::from(""));
        lines.push(Line::styled(
            format!(
                "Note: {} usually carries {}-{} tons.",
                details.name, details.min_payload_tons, details.max_payload_tons
            ),
            Style::default().fg(Color::Yellow),
        ));
    }
    if app.booking.suggesting {
        lines.push(Line::from(""));
        lines.push(Line::styled(
            "Finding the best truck for your goods...",
            Style::default().fg(Color::Cyan),
        ));
    }

    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn draw_fare(f: &mut Frame, app: &App, area: Rect, title: &str) {
    let Some(quote) = &app.booking.quote else {
        return;
    };
    let fare = &quote.price_breakdown;

    let mut rows: Vec<Row> = fare
        .line_items()
        .into_iter()
        .map(|(label, amount)| Row::new(vec![label.to_string(), format_pkr(amount)]))
        .collect();
    rows.push(Row::new(vec![String::new(), String::new()]));
    rows.push(Row::new(vec!["Total".to_string(), format_pkr(fare.total_fare)]).bold());
    rows.push(Row::new(vec![
        "Driver receives".to_string(),
        format_pkr(fare.driver_payout),
    ]));

    let left = quote.remaining(Utc::now()).num_seconds();
    let block_title = format!(
        "{title} | {} | expires in {:02}:{:02}",
        quote.reference(),
        left / 60,
        left % 60
    );
    let table = Table::new(rows, [Constraint::Min(20), Constraint::Length(16)])
        .block(Block::default().borders(Borders::ALL).title(block_title))
        .header(
            Row::new(vec![
                format!("{} ({})", quote_route(quote), quote.load_details.goods_type),
                String::new(),
            ])
            .bold(),
        );
    f.render_widget(table, area);
}

fn quote_route(quote: &crate::quote::Quote) -> String {
    format!(
        "{} -> {}",
        quote.load_details.pickup_addr, quote.load_details.drop_addr
    )
}

fn draw_tracking(f: &mut Frame, app: &App, area: Rect, wizard: &WizardState, title: &str) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let delivered = app.booking.stage == BookingStage::Delivered;
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(Style::default().fg(if delivered {
            Color::Green
        } else {
            Color::Cyan
        }))
        .ratio((app.booking.progress / 100.0).clamp(0.0, 1.0))
        .label(format!("{:.0}%", app.booking.progress));
    f.render_widget(gauge, rows[0]);

    let mut text = vec![wizard.get_prompt().to_string(), String::new()];
    if let Some(load) = &app.booking.booking {
        text.push(format!("Booking {}: {}", load.id, route(load)));
        text.push(format!("Status: {}", load.status));
        if let Some(at) = load.completed_at {
            text.push(format!("Delivered at {}", at.format("%Y-%m-%d %H:%M")));
        }
    }
    f.render_widget(
        Paragraph::new(text.join("\n"))
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: true }),
        rows[1],
    );
}

fn draw_driver(f: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(3)])
        .split(area);

    let d = &app.driver;
    let p = d.performance;
    let mut summary = vec![
        format!(
            "Status: {}   Earnings: {} ({} jobs)",
            if d.online { "ONLINE" } else { "offline" },
            format_pkr(d.total_earnings),
            d.completed.len()
        ),
        format!(
            "Performance: {}%   On time: {}%   Acceptance: {}%",
            p.score, p.on_time_rate, p.acceptance_rate
        ),
        String::new(),
    ];
    match &d.accepted {
        Some(job) => {
            summary.push(format!("Current job {}: {}", job.id, route(job)));
            summary.push(format!(
                "{} - {} tons, payout {}",
                job.spec.goods_type,
                job.spec.weight_tons,
                format_pkr(job.payout)
            ));
        }
        None => summary.push("No active job".into()),
    }
    f.render_widget(
        Paragraph::new(summary.join("\n"))
            .block(Block::default().borders(Borders::ALL).title("DRIVER"))
            .wrap(Wrap { trim: true }),
        rows[0],
    );

    let offers = d.offers.iter().map(|l| {
        Row::new(vec![
            l.id.clone(),
            route(l),
            app.catalog.name_of(l.spec.category_required).to_string(),
            format!("{} t", l.spec.weight_tons),
            format_pkr(l.payout),
        ])
    });
    let table = Table::new(
        offers,
        [
            Constraint::Length(8),
            Constraint::Min(20),
            Constraint::Length(20),
            Constraint::Length(6),
            Constraint::Length(12),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title("OFFERS"))
    .header(Row::new(vec!["id", "route", "truck", "weight", "payout"]).bold())
    .row_highlight_style(
        Style::default()
            .bg(Color::Rgb(255, 140, 0))
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    );
    let mut state = TableState::default();
    if !d.offers.is_empty() {
        state.select(Some(app.ui.selected));
    }
    f.render_stateful_widget(table, rows[1], &mut state);
}

fn draw_admin(f: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Min(5),
            Constraint::Length(app.catalog.iter().count() as u16 + 3),
        ])
        .split(area);

    let users = app.session.users();
    let loads = &app.admin.loads;
    let stats = platform_stats(&users, loads);
    let overview = format!(
        "Users: {}   Active loads: {}   Completed trips: {}   Revenue: {}",
        stats.total_users,
        stats.active_loads,
        stats.completed_trips,
        format_pkr(stats.total_revenue)
    );
    f.render_widget(
        Paragraph::new(overview).block(Block::default().borders(Borders::ALL).title("PLATFORM")),
        rows[0],
    );

    let shown = search_users(&users, &app.admin.user_query);
    let user_rows = shown.iter().map(|u| {
        let style = match u.status {
            UserStatus::Active => Style::default(),
            UserStatus::Suspended => Style::default().fg(Color::Red),
        };
        Row::new(vec![
            u.phone.clone(),
            u.role.map(|r| r.to_string()).unwrap_or_else(|| "-".into()),
            u.status.to_string(),
            u.registered_at.format("%Y-%m-%d").to_string(),
        ])
        .style(style)
    });
    let users_table = Table::new(
        user_rows,
        [
            Constraint::Length(15),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Min(10),
        ],
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(search_title("USERS", &app.admin.user_query)),
    )
    .header(Row::new(vec!["phone", "role", "status", "joined"]).bold())
    .row_highlight_style(
        Style::default()
            .bg(Color::Rgb(255, 140, 0))
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    );
    let mut state = TableState::default();
    if !shown.is_empty() {
        state.select(Some(app.ui.selected));
    }
    f.render_stateful_widget(users_table, rows[1], &mut state);

    let load_rows = search_loads(loads, &app.admin.load_query)
        .into_iter()
        .map(|l| {
            Row::new(vec![
                l.id.clone(),
                route(l),
                l.shipper_id.clone(),
                l.status.to_string(),
                format_pkr(l.payout),
            ])
        });
    let loads_table = Table::new(
        load_rows,
        [
            Constraint::Length(8),
            Constraint::Min(20),
            Constraint::Length(16),
            Constraint::Length(10),
            Constraint::Length(12),
        ],
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(search_title("LOADS", &app.admin.load_query)),
    )
    .header(Row::new(vec!["id", "route", "shipper", "status", "payout"]).bold());
    f.render_widget(loads_table, rows[2]);

    draw_catalog(f, app, rows[3]);
}

fn search_title(name: &str, query: &str) -> String {
    if query.is_empty() {
        name.to_string()
    } else {
        format!("{name} matching \"{query}\"")
    }
}

fn draw_catalog(f: &mut Frame, app: &App, area: Rect) {
    let rows = app.catalog.iter().map(|c| {
        let m = &c.pricing_multipliers;
        Row::new(vec![
            c.name.clone(),
            format!("{}-{} t", c.min_payload_tons, c.max_payload_tons),
            format_pkr(m.base as i64),
            format!("{}/km", m.per_km),
            format!("{}/h", m.wait_rate),
            m.reefer_multiplier
                .map(|r| format!("x{r}"))
                .unwrap_or_else(|| "-".into()),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Min(20),
            Constraint::Length(9),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(6),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title("TRUCK CATEGORIES"))
    .header(
        Row::new(vec!["category", "payload", "base", "distance", "waiting", "reefer"]).bold(),
    );
    f.render_widget(table, area);
}

fn build_info_text(app: &App) -> String {
    let user = match app.session.current() {
        Some(u) => format!(
            "{} ({})",
            u.phone,
            u.role.map(|r| r.to_string()).unwrap_or_else(|| "-".into())
        ),
        None => "-".into(),
    };
    let notifications = match app.notifier.permission() {
        NotificationPermission::Granted => "on".to_string(),
        NotificationPermission::Denied => "off".to_string(),
        NotificationPermission::Default => format!(
            "not enabled (press {} for delivery alerts)",
            format_keys(&app.shortcuts.global.notifications)
        ),
    };
    let log = app
        .ui
        .log
        .iter()
        .rev()
        .take(12)
        .rev()
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    format!("User: {user}\nNotifications: {notifications}\n\nLog:\n{log}")
}

fn build_status_bar(app: &App) -> Paragraph<'static> {
    let screen_name = match app.ui.screen {
        Screen::Login => "Login",
        Screen::Shipper => "Shipper",
        Screen::Driver => "Driver",
        Screen::Admin => "Admin",
    };
    let text = match &app.ui.error {
        Some(err) => format!("[{screen_name}] ERROR: {err}"),
        None => format!("[{screen_name}] {}", app.ui.status),
    };
    let mut bar = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("STATUS"))
        .wrap(Wrap { trim: true });
    if app.ui.error.is_some() {
        bar = bar.style(Style::default().fg(Color::Red));
    }
    bar
}

fn get_help_text(app: &App, sc: &Shortcuts) -> String {
    let global = format!(
        "{}: quit | {}: logout | {}: notifications",
        format_keys(&sc.global.quit),
        format_keys(&sc.global.logout),
        format_keys(&sc.global.notifications)
    );
    let screen = match app.ui.screen {
        Screen::Login => String::new(),
        Screen::Shipper => {
            let b = &sc.booking;
            match app.booking.stage {
                BookingStage::CollectingDetails => format!(
                    "{}: next field | {}: edit | {}: suggest truck | {}: get fare",
                    format_keys(&b.next_field),
                    format_keys(&b.edit_field),
                    format_keys(&b.suggest),
                    format_keys(&b.submit)
                ),
                BookingStage::Quoted => format!(
                    "{}: confirm booking | {}: back | {}: start over",
                    format_keys(&b.submit),
                    format_keys(&b.back),
                    format_keys(&b.book_another)
                ),
                BookingStage::Confirming => format!(
                    "{}: cancel booking | {}: start over",
                    format_keys(&b.cancel),
                    format_keys(&b.book_another)
                ),
                BookingStage::InTransit | BookingStage::Delivered => {
                    format!("{}: book another load", format_keys(&b.book_another))
                }
            }
        }
        Screen::Driver => format!(
            "{}: online/offline | {}/{}: select | {}: accept | {}: complete job",
            format_keys(&sc.driver.toggle_online),
            format_keys(&sc.driver.up),
            format_keys(&sc.driver.down),
            format_keys(&sc.driver.accept),
            format_keys(&sc.driver.complete)
        ),
        Screen::Admin => format!(
            "{}/{}: select user | {}: suspend/activate | {}: search users | {}: search loads",
            format_keys(&sc.admin.up),
            format_keys(&sc.admin.down),
            format_keys(&sc.admin.toggle_status),
            format_keys(&sc.admin.search_users),
            format_keys(&sc.admin.search_loads)
        ),
    };
    if screen.is_empty() {
        global
    } else {
        format!("{screen} | {global}")
    }
}

fn format_keys(keys: &[String]) -> String {
    keys.join("/")
}
