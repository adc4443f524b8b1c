use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    prelude::{Backend, Rect},
    style::Color,
    Frame,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    state_store::{action::Action, State},
    ui_management::components::{
        input_box::{self, InputBox},
        Component, ComponentRender,
    },
};

struct Props {
    /// Messages accepted by the server so far
    sent_message_count: usize,
    is_request_pending: bool,
}

impl From<&State> for Props {
    fn from(state: &State) -> Self {
        Self {
            sent_message_count: state.sent_message_count,
            is_request_pending: state.is_request_pending,
        }
    }
}

/// MessageInputBox keeps the draft until the server has accepted it,
/// so a failed send can be retried without typing the message again.
pub struct MessageInputBox {
    action_tx: UnboundedSender<Action>,
    props: Props,
    //
    pub input_box: InputBox,
}

impl MessageInputBox {
    fn submit_message(&mut self) {
        if self.input_box.is_empty() || self.props.is_request_pending {
            return;
        }

        let _ = self.action_tx.send(Action::SendMessage {
            content: String::from(self.input_box.text()),
        });
    }
}

impl Component for MessageInputBox {
    fn new(state: &State, action_tx: UnboundedSender<Action>) -> Self {
        Self {
            action_tx: action_tx.clone(),
            props: Props::from(state),
            //
            input_box: InputBox::new(state, action_tx),
        }
    }

    fn move_with_state(self, state: &State) -> Self
    where
        Self: Sized,
    {
        let props = Props::from(state);
        let mut input_box = self.input_box.move_with_state(state);
        if props.sent_message_count != self.props.sent_message_count {
            input_box.reset();
        }

        Self {
            props,
            input_box,
            ..self
        }
    }

    fn name(&self) -> &str {
        "Message Input"
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Enter => self.submit_message(),
            _ => self.input_box.handle_key_event(key),
        }
    }
}

pub struct RenderProps {
    pub area: Rect,
    pub border_color: Color,
}

impl ComponentRender<RenderProps> for MessageInputBox {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, props: RenderProps) {
        let title = if self.props.is_request_pending {
            "Message Input (sending...)"
        } else {
            "Message Input"
        };

        self.input_box.render(
            frame,
            input_box::RenderProps {
                title: String::from(title),
                area: props.area,
                border_color: props.border_color,
                show_cursor: true,
            },
        )
    }
}
