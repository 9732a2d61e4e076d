//! Key bindings loaded from `shortcut.toml`.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// All key bindings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Shortcuts {
    pub global: GlobalShortcuts,
    pub login: LoginShortcuts,
    pub booking: BookingShortcuts,
    pub driver: DriverShortcuts,
    pub admin: AdminShortcuts,
    pub input_box: InputBoxShortcuts,
}

/// Active on every screen except inside the input box.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalShortcuts {
    pub quit: Vec<String>,
    pub logout: Vec<String>,
    /// Cycle notification permission.
    pub notifications: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginShortcuts {
    pub phone: Vec<String>,
    pub shipper: Vec<String>,
    pub driver: Vec<String>,
    pub admin: Vec<String>,
}

/// Shipper booking wizard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingShortcuts {
    pub next_field: Vec<String>,
    pub edit_field: Vec<String>,
    pub suggest: Vec<String>,
    /// Request a quote, or confirm one.
    pub submit: Vec<String>,
    pub back: Vec<String>,
    pub cancel: Vec<String>,
    pub book_another: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverShortcuts {
    pub toggle_online: Vec<String>,
    pub accept: Vec<String>,
    pub complete: Vec<String>,
    pub down: Vec<String>,
    pub up: Vec<String>,
}

/// Admin console. Up/down move through the filtered user list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminShortcuts {
    /// Suspend or reactivate the selected user.
    pub toggle_status: Vec<String>,
    pub search_users: Vec<String>,
    pub search_loads: Vec<String>,
    pub down: Vec<String>,
    pub up: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputBoxShortcuts {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub backspace: Vec<String>,
    pub delete: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub home: Vec<String>,
    pub end: Vec<String>,
    pub clear_line: Vec<String>,
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for GlobalShortcuts {
    fn default() -> Self {
        Self {
            quit: keys(&["Ctrl+q"]),
            logout: keys(&["Ctrl+l"]),
            notifications: keys(&["Ctrl+n"]),
        }
    }
}

impl Default for LoginShortcuts {
    fn default() -> Self {
        Self {
            phone: keys(&["Enter"]),
            shipper: keys(&["s"]),
            driver: keys(&["d"]),
            admin: keys(&["a"]),
        }
    }
}

impl Default for BookingShortcuts {
    fn default() -> Self {
        Self {
            next_field: keys(&["Tab", "Down", "j"]),
            edit_field: keys(&["e"]),
            suggest: keys(&["g"]),
            submit: keys(&["Enter"]),
            back: keys(&["Esc", "b"]),
            cancel: keys(&["x"]),
            book_another: keys(&["r"]),
        }
    }
}

impl Default for DriverShortcuts {
    fn default() -> Self {
        Self {
            toggle_online: keys(&["o"]),
            accept: keys(&["Enter"]),
            complete: keys(&["c"]),
            down: keys(&["Down", "j"]),
            up: keys(&["Up", "k"]),
        }
    }
}

impl Default for AdminShortcuts {
    fn default() -> Self {
        Self {
            toggle_status: keys(&["t"]),
            search_users: keys(&["/"]),
            search_loads: keys(&["f"]),
            down: keys(&["Down", "j"]),
            up: keys(&["Up", "k"]),
        }
    }
}

impl Default for InputBoxShortcuts {
    fn default() -> Self {
        Self {
            confirm: keys(&["Enter"]),
            cancel: keys(&["Esc"]),
            backspace: keys(&["Backspace"]),
            delete: keys(&["Delete"]),
            left: keys(&["Left"]),
            right: keys(&["Right"]),
            home: keys(&["Home"]),
            end: keys(&["End"]),
            clear_line: keys(&["Ctrl+u"]),
        }
    }
}

impl Shortcuts {
    /// Read from TOML, or fall back to defaults when the file is missing.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }
}

/// Whether `key` matches any of the binding strings.
pub fn matches_shortcut(key: &KeyEvent, shortcuts: &[String]) -> bool {
    shortcuts.iter().any(|s| matches_single_shortcut(key, s))
}

/// Match one binding such as `Ctrl+u`, `a`, or `Enter`.
fn matches_single_shortcut(key: &KeyEvent, shortcut: &str) -> bool {
    let parts: Vec<&str> = shortcut.split('+').collect();
    let (modifiers_str, key_str) = match parts.split_last() {
        Some((last, mods)) => (mods, *last),
        None => return false,
    };

    let mut expected_modifiers = KeyModifiers::empty();
    for modifier in modifiers_str {
        match modifier.to_ascii_lowercase().as_str() {
            "ctrl" => expected_modifiers |= KeyModifiers::CONTROL,
            "alt" => expected_modifiers |= KeyModifiers::ALT,
            "shift" => expected_modifiers |= KeyModifiers::SHIFT,
            _ => return false,
        }
    }

    if key.modifiers != expected_modifiers {
        return false;
    }

    match key_str.to_ascii_lowercase().as_str() {
        "enter" => key.code == KeyCode::Enter,
        "esc" => key.code == KeyCode::Esc,
        "tab" => key.code == KeyCode::Tab,
        "space" => key.code == KeyCode::Char(' '),
        "backspace" => key.code == KeyCode::Backspace,
        "delete" => key.code == KeyCode::Delete,
        "up" => key.code == KeyCode::Up,
        "down" => key.code == KeyCode::Down,
        "left" => key.code == KeyCode::Left,
        "right" => key.code == KeyCode::Right,
        "home" => key.code == KeyCode::Home,
        "end" => key.code == KeyCode::End,
        _ => {
            let mut chars = key_str.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => key.code == KeyCode::Char(c),
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_matches_shortcut_simple_char() {
        let k = key(KeyCode::Char('g'), KeyModifiers::empty());
        assert!(matches_shortcut(&k, &keys(&["g"])));
        assert!(!matches_shortcut(&k, &keys(&["x"])));
    }

    #[test]
    fn test_matches_shortcut_special_keys() {
        let k = key(KeyCode::Enter, KeyModifiers::empty());
        assert!(matches_shortcut(&k, &keys(&["Enter"])));
        assert!(matches_shortcut(&k, &keys(&["enter"])));
        assert!(!matches_shortcut(&k, &keys(&["Esc"])));
        let space = key(KeyCode::Char(' '), KeyModifiers::empty());
        assert!(matches_shortcut(&space, &keys(&["Space"])));
    }

    #[test]
    fn test_matches_shortcut_with_modifier() {
        let k = key(KeyCode::Char('n'), KeyModifiers::CONTROL);
        assert!(matches_shortcut(&k, &keys(&["Ctrl+n"])));
        assert!(!matches_shortcut(&k, &keys(&["n"])));
        assert!(!matches_shortcut(&k, &keys(&["Meta+n"])));
    }

    #[test]
    fn test_default_bindings_do_not_overlap_on_booking_screen() {
        let sc = Shortcuts::default();
        let tab = key(KeyCode::Tab, KeyModifiers::empty());
        assert!(matches_shortcut(&tab, &sc.booking.next_field));
        assert!(!matches_shortcut(&tab, &sc.booking.submit));
        let quit = key(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(matches_shortcut(&quit, &sc.global.quit));
    }

    #[test]
    fn test_admin_defaults() {
        let sc = Shortcuts::default();
        let slash = key(KeyCode::Char('/'), KeyModifiers::empty());
        assert!(matches_shortcut(&slash, &sc.admin.search_users));
        assert!(!matches_shortcut(&slash, &sc.admin.search_loads));
        let t = key(KeyCode::Char('t'), KeyModifiers::empty());
        assert!(matches_shortcut(&t, &sc.admin.toggle_status));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let sc: Shortcuts = toml::from_str("[driver]\ntoggle_online = [\"Space\"]").unwrap();
        assert_eq!(sc.driver.toggle_online, keys(&["Space"]));
        assert_eq!(sc.driver.accept, keys(&["Enter"]));
        assert_eq!(sc.global.quit, keys(&["Ctrl+q"]));
    }
}
