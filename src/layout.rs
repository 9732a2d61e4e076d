//! Layout helpers.

use ratatui::prelude::*;

/// Body above the help and status bars.
pub struct MainLayout {
    pub body: Rect,
    pub help_bar: Rect,
    pub status_bar: Rect,
}

/// Main panel on the left, info/log panel on the right.
pub struct BodyLayout {
    pub main_panel: Rect,
    pub info_panel: Rect,
}

/// Step tracker on top of the wizard content.
pub struct WizardLayout {
    pub tracker: Rect,
    pub content: Rect,
}

pub fn create_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);

    MainLayout {
        body: chunks[0],
        help_bar: chunks[1],
        status_bar: chunks[2],
    }
}

/// 65/35 horizontal split.
pub fn create_body_layout(area: Rect) -> BodyLayout {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    BodyLayout {
        main_panel: chunks[0],
        info_panel: chunks[1],
    }
}

pub fn create_wizard_layout(area: Rect) -> WizardLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    WizardLayout {
        tracker: chunks[0],
        content: chunks[1],
    }
}
