//! Screen kinds and UI state shared with rendering.

use crate::users::UserRole;

/// Screen currently shown by the TUI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// Phone entry and, for new users, role selection.
    Login,
    /// Booking wizard.
    Shipper,
    /// Job offers and the job in hand.
    Driver,
    /// Platform figures, user and load management.
    Admin,
}

impl Screen {
    /// Landing screen for a role; users without one stay on login.
    pub fn for_role(role: Option<UserRole>) -> Self {
        match role {
            Some(UserRole::Shipper) => Screen::Shipper,
            Some(UserRole::Driver) => Screen::Driver,
            Some(UserRole::Admin) => Screen::Admin,
            None => Screen::Login,
        }
    }
}

/// UI state shared with the renderer.
#[derive(Clone, Debug)]
pub struct UiState {
    pub screen: Screen,
    /// Selected row in the driver's offers or the admin's users.
    pub selected: usize,
    /// Messages for the side panel, oldest first.
    pub log: Vec<String>,
    /// Bottom status line.
    pub status: String,
    /// Load detail field being edited (0..5).
    pub editing_field_idx: usize,
    /// Highlighted error message.
    pub error: Option<String>,
}

impl UiState {
    pub fn new(screen: Screen) -> Self {
        Self {
            screen,
            selected: 0,
            log: vec![],
            status: "Ready".into(),
            editing_field_idx: 0,
            error: None,
        }
    }

    /// Append to the log, keeping it bounded.
    pub fn push_log(&mut self, line: impl Into<String>) {
        const MAX_LOG: usize = 200;
        self.log.push(line.into());
        if self.log.len() > MAX_LOG {
            self.log.drain(..self.log.len() - MAX_LOG);
        }
    }
}
