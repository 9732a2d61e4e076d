//! Key handlers.

use anyhow::Result;
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::{
    admin::search_users,
    booking::BookingStage,
    catalog::TruckCategory,
    events::Screen,
    input::{InputBoxState, InputCallbackId},
    load::LoadDraft,
    notify::NotificationPermission,
    shortcuts::matches_shortcut,
    users::{LoginOutcome, UserRole},
    worker::WorkerCmd,
};

use super::{App, sync_shipper};

/// Handle one key press. Returns true when the app should exit.
pub async fn handle_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    if app.input_box.is_some() {
        return handle_input_box_key(app, k).await;
    }

    let sc = &app.shortcuts.global;
    if matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    }
    if matches_shortcut(&k, &sc.notifications) {
        toggle_notifications(app);
        return Ok(false);
    }
    if matches_shortcut(&k, &sc.logout) && app.session.current().is_some() {
        logout(app).await?;
        return Ok(false);
    }

    match app.ui.screen {
        Screen::Login => handle_login_key(app, k).await?,
        Screen::Shipper => handle_booking_key(app, k).await?,
        Screen::Driver => handle_driver_key(app, k).await?,
        Screen::Admin => handle_admin_key(app, k),
    }
    Ok(false)
}

pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// Granted <-> denied; an unanswered prompt becomes granted.
/// A failed save keeps the new permission for this run.
fn toggle_notifications(app: &mut App) {
    let next = match app.notifier.permission() {
        NotificationPermission::Granted => NotificationPermission::Denied,
        NotificationPermission::Default | NotificationPermission::Denied => {
            NotificationPermission::Granted
        }
    };
    app.notifier.set_permission(next);
    app.cfg.notifications.permission = next;
    app.ui.status = match next {
        NotificationPermission::Granted => "Notifications enabled".into(),
        _ => "Notifications disabled".into(),
    };
    match app.cfg.save(&app.cfg_path) {
        Ok(()) => app.ui.error = None,
        Err(e) => {
            tracing::warn!("could not save {}: {e:#}", app.cfg_path.display());
            app.ui.error = Some(format!("Notification setting not saved: {e}"));
        }
    }
}

async fn logout(app: &mut App) -> Result<()> {
    if app.driver.online {
        app.driver.online = false;
        app.worker_tx.send(WorkerCmd::DriverOnline(false)).await?;
    }
    app.session.logout();
    if let Err(e) = app.session_file.clear().await {
        tracing::warn!("could not remove session file: {e}");
    }
    app.awaiting_role = false;
    app.booking.draft = LoadDraft::default_route();
    sync_shipper(app).await?;
    app.ui.screen = Screen::Login;
    app.ui.error = None;
    app.ui.status = "Logged out".into();
    Ok(())
}

/// Move to the role's screen and persist the session.
async fn enter_role_screen(app: &mut App) -> Result<()> {
    let Some(user) = app.session.current().cloned() else {
        return Ok(());
    };
    if let Err(e) = app.session_file.save(&user).await {
        tracing::warn!("could not save session: {e}");
    }
    app.awaiting_role = false;
    app.ui.screen = Screen::for_role(user.role);
    app.ui.selected = 0;
    app.ui.error = None;
    app.ui.status = format!("Logged in as {}", user.phone);
    sync_shipper(app).await
}

async fn handle_login_key(app: &mut App, k: KeyEvent) -> Result<()> {
    let sc = &app.shortcuts.login;

    if app.awaiting_role {
        let role = if matches_shortcut(&k, &sc.shipper) {
            Some(UserRole::Shipper)
        } else if matches_shortcut(&k, &sc.driver) {
            Some(UserRole::Driver)
        } else if matches_shortcut(&k, &sc.admin) {
            Some(UserRole::Admin)
        } else {
            None
        };
        if let Some(role) = role {
            let selected = app.session.select_role(role).map(|_| ());
            match selected {
                Ok(()) => enter_role_screen(app).await?,
                Err(e) => app.ui.error = Some(e.to_string()),
            }
        }
        return Ok(());
    }

    if matches_shortcut(&k, &sc.phone) {
        app.input_box = Some(InputBoxState::new(
            "Mobile number (e.g. 03001234567):",
            "",
            InputCallbackId::Phone,
        ));
    }
    Ok(())
}

const DETAIL_FIELDS: usize = 5;

async fn handle_booking_key(app: &mut App, k: KeyEvent) -> Result<()> {
    let sc = &app.shortcuts.booking;
    let stage = app.booking.stage;

    if stage != BookingStage::CollectingDetails && matches_shortcut(&k, &sc.book_another) {
        app.booking.draft = LoadDraft::reset();
        app.ui.editing_field_idx = 0;
        app.worker_tx.send(WorkerCmd::BookAnother).await?;
        return Ok(());
    }

    match stage {
        BookingStage::CollectingDetails => {
            if matches_shortcut(&k, &sc.next_field) {
                app.ui.editing_field_idx = (app.ui.editing_field_idx + 1) % DETAIL_FIELDS;
            } else if matches_shortcut(&k, &sc.edit_field) {
                edit_detail_field(app);
            } else if matches_shortcut(&k, &sc.suggest) {
                let goods = app.booking.draft.goods_type.clone().unwrap_or_default();
                if goods.trim().is_empty() {
                    app.ui.error = Some("Describe the goods first".into());
                } else if !app.booking.suggesting {
                    app.booking.suggesting = true;
                    app.ui.error = None;
                    app.ui.status = "Asking for a truck suggestion...".into();
                    app.worker_tx
                        .send(WorkerCmd::SuggestCategory { goods })
                        .await?;
                }
            } else if matches_shortcut(&k, &sc.submit) {
                let missing = app.booking.draft.missing_fields();
                if missing.is_empty() {
                    app.ui.error = None;
                    app.ui.status = "Calculating fare...".into();
                    app.worker_tx
                        .send(WorkerCmd::RequestQuote(app.booking.draft.clone()))
                        .await?;
                } else {
                    app.ui.error = Some(format!("Missing: {}", missing.join(", ")));
                }
            }
        }
        BookingStage::Quoted => {
            if matches_shortcut(&k, &sc.submit) {
                app.ui.status = "Confirming...".into();
                app.worker_tx.send(WorkerCmd::Confirm).await?;
            } else if matches_shortcut(&k, &sc.back) {
                app.worker_tx.send(WorkerCmd::GoBack).await?;
            }
        }
        BookingStage::Confirming => {
            if matches_shortcut(&k, &sc.cancel) {
                app.worker_tx.send(WorkerCmd::CancelBooking).await?;
            }
        }
        BookingStage::InTransit | BookingStage::Delivered => {}
    }
    Ok(())
}

/// Open the popup for text fields; the category field cycles instead.
fn edit_detail_field(app: &mut App) {
    let draft = &mut app.booking.draft;
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let (prompt, value, id) = match app.ui.editing_field_idx {
        0 => ("Pickup address:", text(&draft.pickup_addr), InputCallbackId::PickupAddr),
        1 => ("Drop address:", text(&draft.drop_addr), InputCallbackId::DropAddr),
        2 => ("Goods type:", text(&draft.goods_type), InputCallbackId::GoodsType),
        3 => (
            "Weight (tons):",
            draft.weight_tons.map(|w| w.to_string()).unwrap_or_default(),
            InputCallbackId::WeightTons,
        ),
        _ => {
            draft.category_required = Some(next_category(draft.category_required));
            return;
        }
    };
    app.input_box = Some(InputBoxState::new(prompt, value, id));
}

fn next_category(current: Option<TruckCategory>) -> TruckCategory {
    let all = TruckCategory::ALL;
    match current.and_then(|c| all.iter().position(|x| *x == c)) {
        Some(i) => all[(i + 1) % all.len()],
        None => all[0],
    }
}

async fn handle_driver_key(app: &mut App, k: KeyEvent) -> Result<()> {
    let sc = &app.shortcuts.driver;

    if matches_shortcut(&k, &sc.toggle_online) {
        app.driver.online = !app.driver.online;
        app.worker_tx
            .send(WorkerCmd::DriverOnline(app.driver.online))
            .await?;
        app.ui.status = if app.driver.online {
            "Online: waiting for offers".into()
        } else {
            "Offline".into()
        };
    } else if matches_shortcut(&k, &sc.down) {
        if app.ui.selected + 1 < app.driver.offers.len() {
            app.ui.selected += 1;
        }
    } else if matches_shortcut(&k, &sc.up) {
        app.ui.selected = app.ui.selected.saturating_sub(1);
    } else if matches_shortcut(&k, &sc.accept) {
        if let Some(offer) = app.driver.offers.get(app.ui.selected) {
            app.worker_tx
                .send(WorkerCmd::AcceptOffer(offer.id.clone()))
                .await?;
        }
    } else if matches_shortcut(&k, &sc.complete) && app.driver.accepted.is_some() {
        app.worker_tx.send(WorkerCmd::CompleteJob).await?;
    }
    Ok(())
}

fn handle_admin_key(app: &mut App, k: KeyEvent) {
    let sc = &app.shortcuts.admin;

    if matches_shortcut(&k, &sc.search_users) {
        app.input_box = Some(InputBoxState::new(
            "Search users (phone or status):",
            app.admin.user_query.clone(),
            InputCallbackId::UserSearch,
        ));
    } else if matches_shortcut(&k, &sc.search_loads) {
        app.input_box = Some(InputBoxState::new(
            "Search loads (id, shipper or status):",
            app.admin.load_query.clone(),
            InputCallbackId::LoadSearch,
        ));
    } else if matches_shortcut(&k, &sc.down) {
        let shown = search_users(&app.session.users(), &app.admin.user_query).len();
        if app.ui.selected + 1 < shown {
            app.ui.selected += 1;
        }
    } else if matches_shortcut(&k, &sc.up) {
        app.ui.selected = app.ui.selected.saturating_sub(1);
    } else if matches_shortcut(&k, &sc.toggle_status) {
        let users = app.session.users();
        let Some(target) = search_users(&users, &app.admin.user_query)
            .get(app.ui.selected)
            .map(|u| u.id.clone())
        else {
            return;
        };
        match app.session.toggle_user_status(&target) {
            Ok(user) => {
                app.ui.error = None;
                app.ui.status = format!("{} is now {}", user.phone, user.status);
            }
            Err(e) => app.ui.error = Some(e.to_string()),
        }
    }
}

async fn handle_input_box_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let Some(input_state) = &mut app.input_box else {
        return Ok(false);
    };
    let sc = &app.shortcuts.input_box;

    if is_ctrl_c(&k) {
        return Ok(true);
    }

    if matches_shortcut(&k, &sc.confirm) {
        let value = input_state.value.clone();
        let callback_id = input_state.callback_id;
        app.input_box = None;
        apply_input_callback(app, callback_id, value).await?;
    } else if matches_shortcut(&k, &sc.cancel) {
        app.input_box = None;
    } else if matches_shortcut(&k, &sc.backspace) {
        input_state.backspace();
    } else if matches_shortcut(&k, &sc.delete) {
        input_state.delete();
    } else if matches_shortcut(&k, &sc.left) {
        input_state.move_left();
    } else if matches_shortcut(&k, &sc.right) {
        input_state.move_right();
    } else if matches_shortcut(&k, &sc.home) {
        input_state.move_home();
    } else if matches_shortcut(&k, &sc.end) {
        input_state.move_end();
    } else if matches_shortcut(&k, &sc.clear_line) {
        input_state.clear_line();
    } else if let KeyCode::Char(c) = k.code
        && !k.modifiers.contains(KeyModifiers::CONTROL)
    {
        input_state.insert_char(c);
    }

    Ok(false)
}

async fn apply_input_callback(
    app: &mut App,
    callback_id: InputCallbackId,
    value: String,
) -> Result<()> {
    let text = |v: String| Some(v.trim().to_string()).filter(|s| !s.is_empty());
    let draft = &mut app.booking.draft;
    match callback_id {
        InputCallbackId::Phone => match app.session.login_with_phone(&value, Utc::now()) {
            Ok(LoginOutcome::Existing) => enter_role_screen(app).await?,
            Ok(LoginOutcome::NewUser) => {
                app.awaiting_role = true;
                app.ui.error = None;
                app.ui.status = "New number: choose a role".into();
            }
            Err(e) => app.ui.error = Some(e.to_string()),
        },
        InputCallbackId::PickupAddr => draft.pickup_addr = text(value),
        InputCallbackId::DropAddr => draft.drop_addr = text(value),
        InputCallbackId::GoodsType => draft.goods_type = text(value),
        InputCallbackId::WeightTons => match value.trim().parse::<f64>() {
            Ok(w) if w.is_finite() && w > 0.0 => {
                draft.weight_tons = Some(w);
                app.ui.error = None;
            }
            _ => app.ui.error = Some(format!("Invalid weight: {value}")),
        },
        InputCallbackId::UserSearch => {
            app.admin.user_query = value.trim().to_string();
            app.ui.selected = 0;
        }
        InputCallbackId::LoadSearch => app.admin.load_query = value.trim().to_string(),
    }
    Ok(())
}
