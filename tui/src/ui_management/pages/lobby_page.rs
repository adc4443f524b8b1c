use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{prelude::*, widgets::*, Frame};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    state_store::{action::Action, State},
    ui_management::components::{
        input_box::{self, InputBox},
        usage::{widget_usage_to_text, HasUsageInfo, UsageInfo, UsageInfoLine},
        Component, ComponentRender,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Username,
    RoomId,
}

struct Props {
    server_url: String,
    /// Username of the established identity, which can not be changed anymore
    username: Option<String>,
    last_error: Option<String>,
    is_request_pending: bool,
}

impl From<&State> for Props {
    fn from(state: &State) -> Self {
        Props {
            server_url: state.server_url.clone(),
            username: state.user.as_ref().map(|user| user.username.clone()),
            last_error: state.last_error.clone(),
            is_request_pending: state.is_request_pending,
        }
    }
}

/// LobbyPage asks for a username and lets the user create a room or join one by id
pub struct LobbyPage {
    action_tx: UnboundedSender<Action>,
    props: Props,
    //
    focused_field: Field,
    username_input: InputBox,
    room_input: InputBox,
}

impl LobbyPage {
    fn username(&self) -> String {
        match self.props.username.as_ref() {
            Some(username) => username.clone(),
            None => String::from(self.username_input.text()),
        }
    }

    fn switch_field(&mut self) {
        // the username is fixed once the identity exists
        self.focused_field = match (self.focused_field, self.props.username.is_some()) {
            (_, true) => Field::RoomId,
            (Field::Username, false) => Field::RoomId,
            (Field::RoomId, false) => Field::Username,
        };
    }

    fn submit(&mut self) {
        if self.props.is_request_pending {
            return;
        }

        let username = self.username();
        let room = self.room_input.text().trim();

        let action = if room.is_empty() {
            Action::CreateRoom { username }
        } else {
            Action::JoinRoom {
                room: String::from(room),
                username,
            }
        };

        let _ = self.action_tx.send(action);
    }

    fn focused_input_mut(&mut self) -> &mut InputBox {
        match self.focused_field {
            Field::Username => &mut self.username_input,
            Field::RoomId => &mut self.room_input,
        }
    }

    fn border_color(&self, field: Field) -> Color {
        if self.focused_field == field {
            Color::Yellow
        } else {
            Color::Reset
        }
    }
}

impl Component for LobbyPage {
    fn new(state: &State, action_tx: UnboundedSender<Action>) -> Self
    where
        Self: Sized,
    {
        LobbyPage {
            action_tx: action_tx.clone(),
            props: Props::from(state),
            //
            focused_field: Field::Username,
            username_input: InputBox::new(state, action_tx.clone()),
            room_input: InputBox::new(state, action_tx),
        }
        .move_with_state(state)
    }

    fn move_with_state(self, state: &State) -> Self
    where
        Self: Sized,
    {
        let props = Props::from(state);
        let focused_field = match props.username {
            Some(_) => Field::RoomId,
            None => self.focused_field,
        };

        LobbyPage {
            props,
            focused_field,
            username_input: self.username_input.move_with_state(state),
            room_input: self.room_input.move_with_state(state),
            ..self
        }
    }

    fn name(&self) -> &str {
        "Lobby"
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let _ = self.action_tx.send(Action::Exit);
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Esc if self.props.last_error.is_some() => {
                let _ = self.action_tx.send(Action::DismissError);
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => self.switch_field(),
            _ => self.focused_input_mut().handle_key_event(key),
        }
    }
}

impl ComponentRender<()> for LobbyPage {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, _props: ()) {
        let [_, vertical_centered, _] = *Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Ratio(1, 4),
                    Constraint::Min(1),
                    Constraint::Ratio(1, 4),
                ]
                .as_ref(),
            )
            .split(frame.size())
        else {
            panic!("The main layout should have 3 chunks")
        };

        let [_, both_centered, _] = *Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                [
                    Constraint::Ratio(1, 4),
                    Constraint::Min(1),
                    Constraint::Ratio(1, 4),
                ]
                .as_ref(),
            )
            .split(vertical_centered)
        else {
            panic!("The horizontal layout should have 3 chunks")
        };

        let [server_area, username_area, room_area, status_area, usage_area] = *Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Length(1),
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Min(1),
                ]
                .as_ref(),
            )
            .split(both_centered)
        else {
            panic!("The lobby layout should have 5 chunks")
        };

        let server = Paragraph::new(Line::from(vec![
            "Server: ".into(),
            Span::from(self.props.server_url.as_str()).bold(),
        ]));
        frame.render_widget(server, server_area);

        match self.props.username.as_ref() {
            Some(username) => {
                let username = Paragraph::new(Span::from(username.as_str()).bold())
                    .block(Block::default().borders(Borders::ALL).title("Username"));
                frame.render_widget(username, username_area);
            }
            None => self.username_input.render(
                frame,
                input_box::RenderProps {
                    title: String::from("Username"),
                    area: username_area,
                    border_color: self.border_color(Field::Username),
                    show_cursor: self.focused_field == Field::Username,
                },
            ),
        }

        self.room_input.render(
            frame,
            input_box::RenderProps {
                title: String::from("Room ID (leave empty to create a room)"),
                area: room_area,
                border_color: self.border_color(Field::RoomId),
                show_cursor: self.focused_field == Field::RoomId,
            },
        );

        let status = match (self.props.is_request_pending, self.props.last_error.as_ref()) {
            (true, _) => Paragraph::new(Span::from("Contacting the server...").italic()),
            (false, Some(error)) => {
                Paragraph::new(Span::from(error.as_str())).style(Style::default().fg(Color::Red))
            }
            (false, None) => Paragraph::new(""),
        };
        frame.render_widget(
            status
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("Status")),
            status_area,
        );

        let usage =
            Paragraph::new(widget_usage_to_text(self.usage_info())).wrap(Wrap { trim: true });
        frame.render_widget(usage, usage_area);
    }
}

impl HasUsageInfo for LobbyPage {
    fn usage_info(&self) -> UsageInfo {
        let mut lines = vec![
            UsageInfoLine::new(&["Enter"], "to create a room, or to join the room id entered"),
            UsageInfoLine::new(&["Ctrl+C"], "to exit"),
        ];
        if self.props.username.is_none() {
            lines.push(UsageInfoLine::new(&["Tab", "↑", "↓"], "to switch fields"));
        }
        if self.props.last_error.is_some() {
            lines.push(UsageInfoLine::new(&["Esc"], "to dismiss the error"));
        }

        UsageInfo {
            description: None,
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use comms::model::UserIdentity;
    use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};
    use uuid::Uuid;

    use super::*;

    fn lobby(state: &State) -> (LobbyPage, UnboundedReceiver<Action>) {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        (LobbyPage::new(state, action_tx), action_rx)
    }

    fn press(page: &mut LobbyPage, code: KeyCode) {
        page.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(page: &mut LobbyPage, text: &str) {
        for c in text.chars() {
            press(page, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_enter_without_room_creates_one() {
        let (mut page, mut action_rx) = lobby(&State::new(""));

        type_text(&mut page, "alice");
        press(&mut page, KeyCode::Enter);

        assert!(matches!(
            action_rx.try_recv(),
            Ok(Action::CreateRoom { username }) if username == "alice"
        ));
    }

    #[test]
    fn test_enter_with_room_joins_it() {
        let (mut page, mut action_rx) = lobby(&State::new(""));

        type_text(&mut page, "bob");
        press(&mut page, KeyCode::Tab);
        type_text(&mut page, " room-42 ");
        press(&mut page, KeyCode::Enter);

        assert!(matches!(
            action_rx.try_recv(),
            Ok(Action::JoinRoom { room, username }) if room == "room-42" && username == "bob"
        ));
    }

    #[test]
    fn test_established_username_is_used() {
        let mut state = State::new("");
        state.user = Some(UserIdentity::new(Uuid::new_v4(), "alice"));
        let (mut page, mut action_rx) = lobby(&state);

        // typing goes to the room field, the username can not be edited
        type_text(&mut page, "room-7");
        press(&mut page, KeyCode::Tab);
        press(&mut page, KeyCode::Enter);

        assert!(matches!(
            action_rx.try_recv(),
            Ok(Action::JoinRoom { room, username }) if room == "room-7" && username == "alice"
        ));
    }

    #[test]
    fn test_no_submission_while_a_request_is_pending() {
        let mut state = State::new("");
        state.is_request_pending = true;
        let (mut page, mut action_rx) = lobby(&state);

        press(&mut page, KeyCode::Enter);

        assert!(matches!(action_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_errors_can_be_dismissed() {
        let mut state = State::new("");
        let (page, mut action_rx) = lobby(&state);

        state.last_error = Some(String::from("Please enter a username."));
        let mut page = page.move_with_state(&state);
        press(&mut page, KeyCode::Esc);
        page.handle_key_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));

        assert!(matches!(action_rx.try_recv(), Ok(Action::DismissError)));
        assert!(matches!(action_rx.try_recv(), Ok(Action::Exit)));
    }
}
