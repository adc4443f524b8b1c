use std::io::{self, Stdout};

use anyhow::Context;
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tokio::sync::{
    broadcast,
    mpsc::{self, UnboundedReceiver},
};
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::{
    state_store::{action::Action, State},
    termination::Interrupted,
    ui_management::components::{Component, ComponentRender},
};

use super::pages::AppRouter;

/// UiManager owns the terminal. It renders every [State] it receives
/// and forwards the user's intents to the state store as [Action]s.
pub struct UiManager {
    action_tx: mpsc::UnboundedSender<Action>,
}

impl UiManager {
    pub fn new() -> (Self, UnboundedReceiver<Action>) {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        (Self { action_tx }, action_rx)
    }

    pub async fn main_loop(
        self,
        mut state_rx: UnboundedReceiver<State>,
        mut interrupt_rx: broadcast::Receiver<Interrupted>,
    ) -> anyhow::Result<Interrupted> {
        let mut app_router = {
            let state = state_rx
                .recv()
                .await
                .context("the state store stopped before publishing its first state")?;

            AppRouter::new(&state, self.action_tx.clone())
        };

        let mut screen = Screen::enter()?;
        let mut terminal_events = EventStream::new();
        let mut needs_redraw = true;

        let result = loop {
            if needs_redraw {
                if let Err(err) = draw(&mut screen.terminal, &app_router) {
                    break Err(err);
                }
                needs_redraw = false;
            }

            tokio::select! {
                maybe_event = terminal_events.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        app_router.handle_key_event(key);
                        needs_redraw = true;
                    },
                    Some(Ok(Event::Resize(..))) => needs_redraw = true,
                    Some(Ok(_)) => (),
                    Some(Err(err)) => break Err(err).context("could not read terminal events"),
                    None => break Ok(Interrupted::UserInt),
                },
                // The room timer ticks through here too, no render ticker is needed
                Some(state) = state_rx.recv() => {
                    app_router = app_router.move_with_state(&state);
                    needs_redraw = true;
                },
                Ok(interrupted) = interrupt_rx.recv() => {
                    break Ok(interrupted);
                }
            }
        };

        debug!(page = app_router.name(), "leaving the terminal ui");
        screen.leave()?;

        result
    }
}

fn draw<B: Backend>(terminal: &mut Terminal<B>, app_router: &AppRouter) -> anyhow::Result<()> {
    terminal
        .draw(|frame| app_router.render(frame, ()))
        .context("could not render to the terminal")?;

    Ok(())
}

/// Raw mode on the alternate screen. Restored on [Screen::leave],
/// or on drop when the ui stops early.
struct Screen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl Screen {
    fn enter() -> anyhow::Result<Self> {
        enable_raw_mode().context("could not enable raw mode")?;

        let mut screen = Screen {
            terminal: Terminal::new(CrosstermBackend::new(io::stdout()))?,
            active: true,
        };
        execute!(screen.terminal.backend_mut(), EnterAlternateScreen)?;

        Ok(screen)
    }

    fn leave(mut self) -> anyhow::Result<()> {
        self.restore()
    }

    fn restore(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;

        Ok(self.terminal.show_cursor()?)
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            warn!(%err, "could not restore the terminal");
        }
    }
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;

    use super::*;

    fn rendered_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol.as_str())
            .collect()
    }

    #[test]
    fn test_draws_the_page_of_the_current_state() {
        let (action_tx, _action_rx) = mpsc::unbounded_channel();
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        let mut state = State::new("http://127.0.0.1:8000");

        let app_router = AppRouter::new(&state, action_tx);
        draw(&mut terminal, &app_router).unwrap();
        assert!(rendered_text(&terminal).contains("Username"));

        state.active_room = Some(String::from("room-42"));
        let app_router = app_router.move_with_state(&state);
        draw(&mut terminal, &app_router).unwrap();

        let text = rendered_text(&terminal);
        assert!(text.contains("Active Room Information"));
        assert!(text.contains("room-42"));
    }
}
