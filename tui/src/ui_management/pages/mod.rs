use crossterm::event::KeyEvent;
use ratatui::{prelude::Backend, Frame};
use tokio::sync::mpsc::UnboundedSender;

use crate::state_store::{action::Action, State};

use self::{chat_page::ChatPage, lobby_page::LobbyPage};

use super::components::{Component, ComponentRender};

mod chat_page;
mod lobby_page;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActivePage {
    ChatPage,
    LobbyPage,
}

struct Props {
    active_page: ActivePage,
}

impl From<&State> for Props {
    fn from(state: &State) -> Self {
        Props {
            active_page: match state.active_room {
                Some(_) => ActivePage::ChatPage,
                None => ActivePage::LobbyPage,
            },
        }
    }
}

/// AppRouter shows the chat while the session is in a room, and the lobby otherwise
pub struct AppRouter {
    props: Props,
    //
    chat_page: ChatPage,
    lobby_page: LobbyPage,
}

impl AppRouter {
    fn get_active_page_component(&self) -> &dyn Component {
        match self.props.active_page {
            ActivePage::ChatPage => &self.chat_page,
            ActivePage::LobbyPage => &self.lobby_page,
        }
    }

    fn get_active_page_component_mut(&mut self) -> &mut dyn Component {
        match self.props.active_page {
            ActivePage::ChatPage => &mut self.chat_page,
            ActivePage::LobbyPage => &mut self.lobby_page,
        }
    }
}

impl Component for AppRouter {
    fn new(state: &State, action_tx: UnboundedSender<Action>) -> Self
    where
        Self: Sized,
    {
        AppRouter {
            props: Props::from(state),
            //
            chat_page: ChatPage::new(state, action_tx.clone()),
            lobby_page: LobbyPage::new(state, action_tx),
        }
        .move_with_state(state)
    }

    fn move_with_state(self, state: &State) -> Self
    where
        Self: Sized,
    {
        AppRouter {
            props: Props::from(state),
            //
            chat_page: self.chat_page.move_with_state(state),
            lobby_page: self.lobby_page.move_with_state(state),
        }
    }

    // route all functions to the active page
    fn name(&self) -> &str {
        self.get_active_page_component().name()
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        self.get_active_page_component_mut().handle_key_event(key)
    }
}

impl ComponentRender<()> for AppRouter {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, props: ()) {
        match self.props.active_page {
            ActivePage::ChatPage => self.chat_page.render(frame, props),
            ActivePage::LobbyPage => self.lobby_page.render(frame, props),
        }
    }
}
