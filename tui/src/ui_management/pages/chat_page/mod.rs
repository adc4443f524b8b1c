use circular_queue::CircularQueue;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{prelude::*, widgets::*, Frame};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    state_store::{action::Action, MessageBoxItem, State, StreamStatus},
    ui_management::components::{
        usage::{widget_usage_to_text, HasUsageInfo, UsageInfo, UsageInfoLine},
        Component, ComponentRender,
    },
};

use self::message_input_box::MessageInputBox;

mod message_input_box;

struct Props {
    server_url: String,
    username: Option<String>,
    active_room: Option<String>,
    stream_status: StreamStatus,
    messages: CircularQueue<MessageBoxItem>,
    last_error: Option<String>,
    /// Seconds spent in the room
    timer: usize,
}

impl From<&State> for Props {
    fn from(state: &State) -> Self {
        Props {
            server_url: state.server_url.clone(),
            username: state.user.as_ref().map(|user| user.username.clone()),
            active_room: state.active_room.clone(),
            stream_status: state.stream_status.clone(),
            messages: state.messages.clone(),
            last_error: state.last_error.clone(),
            timer: state.timer,
        }
    }
}

/// ChatPage shows the conversation of the active room
pub struct ChatPage {
    action_tx: UnboundedSender<Action>,
    props: Props,
    //
    message_input_box: MessageInputBox,
}

impl Component for ChatPage {
    fn new(state: &State, action_tx: UnboundedSender<Action>) -> Self
    where
        Self: Sized,
    {
        ChatPage {
            action_tx: action_tx.clone(),
            props: Props::from(state),
            //
            message_input_box: MessageInputBox::new(state, action_tx),
        }
        .move_with_state(state)
    }

    fn move_with_state(self, state: &State) -> Self
    where
        Self: Sized,
    {
        ChatPage {
            props: Props::from(state),
            message_input_box: self.message_input_box.move_with_state(state),
            ..self
        }
    }

    fn name(&self) -> &str {
        "Chat"
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let _ = self.action_tx.send(Action::Exit);
            }
            KeyCode::Esc if self.props.last_error.is_some() => {
                let _ = self.action_tx.send(Action::DismissError);
            }
            KeyCode::Esc => {
                let _ = self.action_tx.send(Action::LeaveRoom);
            }
            _ => self.message_input_box.handle_key_event(key),
        }
    }
}

fn calculate_list_offset(height: u16, items_len: usize) -> usize {
    // go back by (container height - 2 for borders) to get the offset
    items_len.saturating_sub(height.saturating_sub(2) as usize)
}

/// `[username]: content`, or the bare text for notifications
fn message_text(item: &MessageBoxItem) -> String {
    match item {
        MessageBoxItem::Message {
            username, content, ..
        } => format!("[{username}]: {content}"),
        MessageBoxItem::Notification(content) => content.clone(),
    }
}

fn message_style(item: &MessageBoxItem) -> Style {
    match item {
        MessageBoxItem::Message {
            from_system: false, ..
        } => Style::default(),
        MessageBoxItem::Message {
            from_system: true, ..
        } => Style::default().fg(Color::Cyan),
        MessageBoxItem::Notification(_) => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    }
}

fn stream_status_span<'a>(status: &StreamStatus) -> Span<'a> {
    match status {
        StreamStatus::Connecting => Span::from("● connecting").yellow(),
        StreamStatus::Connected => Span::from("● live").green(),
        StreamStatus::Reconnecting => Span::from("● reconnecting").yellow(),
        StreamStatus::Disconnected => Span::from("● offline").red(),
    }
}

impl ComponentRender<()> for ChatPage {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, _props: ()) {
        let [left, right] = *Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(75), Constraint::Percentage(25)].as_ref())
            .split(frame.size())
        else {
            panic!("The main layout should have 2 chunks")
        };

        let error_height = if self.props.last_error.is_some() { 3 } else { 0 };
        let [container_room, container_messages, container_error, container_input] =
            *Layout::default()
                .direction(Direction::Vertical)
                .constraints(
                    [
                        Constraint::Length(3),
                        Constraint::Min(1),
                        Constraint::Length(error_height),
                        Constraint::Length(3),
                    ]
                    .as_ref(),
                )
                .split(left)
        else {
            panic!("The left layout should have 4 chunks")
        };

        let room_info = Paragraph::new(Line::from(vec![
            "in room ".into(),
            Span::from(self.props.active_room.clone().unwrap_or_default()).bold(),
            "  ".into(),
            stream_status_span(&self.props.stream_status),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Active Room Information"),
        );
        frame.render_widget(room_info, container_room);

        let message_offset =
            calculate_list_offset(container_messages.height, self.props.messages.len());
        let messages = self
            .props
            .messages
            .asc_iter()
            .skip(message_offset)
            .map(|item| ListItem::new(Line::from(message_text(item))).style(message_style(item)))
            .collect::<Vec<ListItem>>();
        let messages =
            List::new(messages).block(Block::default().borders(Borders::ALL).title("Messages"));
        frame.render_widget(messages, container_messages);

        if let Some(error) = self.props.last_error.as_ref() {
            let error = Paragraph::new(error.as_str())
                .style(Style::default().fg(Color::Red))
                .block(Block::default().borders(Borders::ALL).title("Error"));
            frame.render_widget(error, container_error);
        }

        self.message_input_box.render(
            frame,
            message_input_box::RenderProps {
                area: container_input,
                border_color: Color::Yellow,
            },
        );

        let [container_user_info, container_usage] = *Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(1)].as_ref())
            .split(right)
        else {
            panic!("The right layout should have 2 chunks")
        };

        let user_info = Paragraph::new(Text::from(vec![
            Line::from(format!(
                "User: @{}",
                self.props.username.as_deref().unwrap_or_default()
            )),
            Line::from(format!("Server: {}", self.props.server_url)),
            Line::from(format!("Chatting for: {} secs", self.props.timer)),
        ]))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("User Information"),
        );
        frame.render_widget(user_info, container_user_info);

        let usage = Paragraph::new(widget_usage_to_text(self.usage_info()))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Usage"));
        frame.render_widget(usage, container_usage);
    }
}

impl HasUsageInfo for ChatPage {
    fn usage_info(&self) -> UsageInfo {
        let mut lines = vec![UsageInfoLine::new(&["Enter"], "to send your message")];
        if self.props.last_error.is_some() {
            lines.push(UsageInfoLine::new(&["Esc"], "to dismiss the error"));
        } else {
            lines.push(UsageInfoLine::new(&["Esc"], "to leave the room"));
        }
        lines.push(UsageInfoLine::new(&["Ctrl+C"], "to exit"));

        UsageInfo {
            description: Some(String::from(
                "Type your message to send it to everyone in the room",
            )),
            lines,
        }
    }
}
