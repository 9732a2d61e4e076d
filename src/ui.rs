//! Terminal setup and teardown.

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    io::{self, Stdout},
    panic,
};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Enter raw mode on the alternate screen. A panic restores the terminal
/// before the default hook prints its message.
pub fn init_terminal() -> Result<Tui> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if let Err(e) = restore_terminal() {
            tracing::error!("terminal restore after panic failed: {e}");
        }
        tracing::error!("panic: {info}");
        default_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

/// Leave raw mode and the alternate screen.
pub fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}
