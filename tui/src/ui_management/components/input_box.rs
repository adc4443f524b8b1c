use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    prelude::{Backend, Rect},
    style::{Color, Style, Stylize},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::state_store::{action::Action, State};

use super::{Component, ComponentRender};

/// Single line text editor
pub struct InputBox {
    /// Current value of the input box
    text: String,
    /// Position of the cursor, counted in chars
    cursor_position: usize,
}

impl InputBox {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn reset(&mut self) {
        self.cursor_position = 0;
        self.text.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Byte offset of the cursor inside `text`
    fn byte_index(&self) -> usize {
        self.text
            .char_indices()
            .nth(self.cursor_position)
            .map_or(self.text.len(), |(index, _)| index)
    }

    fn move_cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    fn move_cursor_right(&mut self) {
        self.cursor_position = (self.cursor_position + 1).min(self.char_count());
    }

    fn enter_char(&mut self, new_char: char) {
        let index = self.byte_index();
        self.text.insert(index, new_char);

        self.move_cursor_right();
    }

    fn delete_char(&mut self) {
        if self.cursor_position == 0 {
            return;
        }

        self.move_cursor_left();
        let index = self.byte_index();
        self.text.remove(index);
    }

    fn delete_char_under_cursor(&mut self) {
        if self.cursor_position < self.char_count() {
            let index = self.byte_index();
            self.text.remove(index);
        }
    }
}

impl Component for InputBox {
    fn new(_state: &State, _action_tx: UnboundedSender<Action>) -> Self {
        Self {
            text: String::new(),
            cursor_position: 0,
        }
    }

    fn move_with_state(self, _state: &State) -> Self
    where
        Self: Sized,
    {
        Self { ..self }
    }

    fn name(&self) -> &str {
        "Input Box"
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            // shortcuts like ctrl+c are handled by the pages
            KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => {}
            KeyCode::Char(to_insert) => self.enter_char(to_insert),
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Delete => self.delete_char_under_cursor(),
            KeyCode::Left => self.move_cursor_left(),
            KeyCode::Right => self.move_cursor_right(),
            KeyCode::Home => self.cursor_position = 0,
            KeyCode::End => self.cursor_position = self.char_count(),
            _ => {}
        }
    }
}

pub struct RenderProps {
    pub title: String,
    pub area: Rect,
    pub border_color: Color,
    pub show_cursor: bool,
}

impl ComponentRender<RenderProps> for InputBox {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, props: RenderProps) {
        let input = Paragraph::new(self.text.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .fg(props.border_color)
                    .title(props.title),
            );
        frame.render_widget(input, props.area);

        if props.show_cursor {
            // stay inside the borders when the text is wider than the box
            let max_offset = props.area.width.saturating_sub(2);
            let offset = u16::try_from(self.cursor_position)
                .unwrap_or(u16::MAX)
                .min(max_offset);

            frame.set_cursor(props.area.x + offset + 1, props.area.y + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyEventState;

    use super::*;

    fn input_box() -> InputBox {
        let (action_tx, _action_rx) = tokio::sync::mpsc::unbounded_channel();

        InputBox::new(&State::new(""), action_tx)
    }

    fn press(input: &mut InputBox, code: KeyCode) {
        input.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(input: &mut InputBox, text: &str) {
        for c in text.chars() {
            press(input, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_editing_in_the_middle_of_multibyte_text() {
        let mut input = input_box();
        type_text(&mut input, "héllo");

        press(&mut input, KeyCode::Left);
        press(&mut input, KeyCode::Left);
        press(&mut input, KeyCode::Left);
        press(&mut input, KeyCode::Backspace);
        type_text(&mut input, "ë");
        press(&mut input, KeyCode::End);
        type_text(&mut input, "!");

        assert_eq!(input.text(), "hëllo!");
    }

    #[test]
    fn test_home_and_delete() {
        let mut input = input_box();
        type_text(&mut input, "🦀rust");

        press(&mut input, KeyCode::Home);
        press(&mut input, KeyCode::Delete);
        press(&mut input, KeyCode::Backspace);

        assert_eq!(input.text(), "rust");
    }

    #[test]
    fn test_cursor_does_not_leave_the_text() {
        let mut input = input_box();
        press(&mut input, KeyCode::Left);
        press(&mut input, KeyCode::Backspace);
        type_text(&mut input, "ab");
        press(&mut input, KeyCode::Right);
        press(&mut input, KeyCode::Delete);
        type_text(&mut input, "c");

        assert_eq!(input.text(), "abc");
    }

    #[test]
    fn test_control_chords_and_releases_are_ignored() {
        let mut input = input_box();

        input.handle_key_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        input.handle_key_event(KeyEvent {
            code: KeyCode::Char('x'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });

        assert!(input.is_empty());
    }

    #[test]
    fn test_reset_clears_the_text() {
        let mut input = input_box();
        type_text(&mut input, "ünïcode");

        input.reset();
        type_text(&mut input, "!");

        assert_eq!(input.text(), "!");
    }
}
