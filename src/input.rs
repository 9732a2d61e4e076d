//! Single-line text input popup.

use ratatui::{
    layout::Alignment,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

/// What the entered value is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputCallbackId {
    Phone,
    PickupAddr,
    DropAddr,
    GoodsType,
    WeightTons,
    UserSearch,
    LoadSearch,
}

#[derive(Clone, Debug)]
pub struct InputBoxState {
    pub prompt: String,
    pub value: String,
    /// Cursor position in characters.
    pub cursor: usize,
    pub callback_id: InputCallbackId,
}

impl InputBoxState {
    /// Open with `value` prefilled and the cursor at the end.
    pub fn new(
        prompt: impl Into<String>,
        value: impl Into<String>,
        callback_id: InputCallbackId,
    ) -> Self {
        let value = value.into();
        Self {
            prompt: prompt.into(),
            cursor: value.chars().count(),
            value,
            callback_id,
        }
    }

    /// Byte offset of the `n`-th character.
    fn byte_at(&self, n: usize) -> usize {
        self.value
            .char_indices()
            .nth(n)
            .map_or(self.value.len(), |(i, _)| i)
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_at(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Remove the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_at(self.cursor);
            self.value.remove(at);
        }
    }

    /// Remove the character under the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_at(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Visible slice of the value with a `|` cursor, scrolled to fit `width`.
    fn visible_with_cursor(&self, width: usize) -> String {
        let scroll = self.cursor.saturating_sub(width.saturating_sub(2));
        let chars: Vec<char> = self.value.chars().skip(scroll).take(width).collect();
        let at = (self.cursor - scroll).min(chars.len());
        let before: String = chars[..at].iter().collect();
        let after: String = chars[at..].iter().collect();
        format!("{before}|{after}")
    }
}

/// Draw the input box as a centred popup.
pub fn render_input_box(f: &mut Frame, state: &InputBoxState) {
    let popup_area = centered_popup(f.area(), 70, 7);
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Input")
        .style(Style::default().bg(Color::DarkGray));
    f.render_widget(block, popup_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(popup_area);

    let prompt = Paragraph::new(state.prompt.as_str()).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(prompt, rows[0]);

    let input = Paragraph::new(state.visible_with_cursor(rows[1].width as usize))
        .style(Style::default().fg(Color::Green));
    f.render_widget(input, rows[1]);

    let help = Paragraph::new("Enter=confirm | Esc=cancel | Ctrl+U=clear")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, rows[3]);
}

/// Rect of `height` rows and `width_percent` of the width, centred in `area`.
fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(value: &str) -> InputBoxState {
        InputBoxState::new("Pickup:", value, InputCallbackId::PickupAddr)
    }

    #[test]
    fn test_edit_in_middle_with_multibyte() {
        let mut s = boxed("Lahre");
        s.move_left();
        s.move_left();
        s.insert_char('o');
        assert_eq!(s.value, "Lahore");

        let mut s = boxed("Café");
        s.backspace();
        s.insert_char('e');
        assert_eq!(s.value, "Cafe");
        s.move_home();
        s.delete();
        assert_eq!(s.value, "afe");
        assert_eq!(s.cursor, 0);
    }

    #[test]
    fn test_cursor_bounds() {
        let mut s = boxed("ab");
        s.move_right();
        assert_eq!(s.cursor, 2);
        s.delete();
        assert_eq!(s.value, "ab");
        s.move_home();
        s.move_left();
        s.backspace();
        assert_eq!((s.value.as_str(), s.cursor), ("ab", 0));
        s.clear_line();
        assert!(s.value.is_empty());
    }

    #[test]
    fn test_visible_text_scrolls_with_cursor() {
        let s = boxed("0123456789");
        assert_eq!(s.visible_with_cursor(20), "0123456789|");
        assert_eq!(s.visible_with_cursor(6), "6789|");
    }
}
