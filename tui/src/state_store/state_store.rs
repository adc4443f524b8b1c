use std::time::Duration;

use comms::transport::client::RoomApi;
use tokio::sync::{
    broadcast,
    mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use tracing::info;

use crate::{session::RoomSessionController, termination::Interrupted, termination::Terminator};

use super::{action::Action, State};

pub struct StateStore {
    server_url: String,
    state_tx: UnboundedSender<State>,
}

impl StateStore {
    pub fn new(server_url: impl Into<String>) -> (Self, UnboundedReceiver<State>) {
        let (state_tx, state_rx) = mpsc::unbounded_channel::<State>();

        (
            StateStore {
                server_url: server_url.into(),
                state_tx,
            },
            state_rx,
        )
    }
}

impl StateStore {
    pub async fn main_loop<A>(
        self,
        api: A,
        mut terminator: Terminator,
        mut action_rx: UnboundedReceiver<Action>,
        mut interrupt_rx: broadcast::Receiver<Interrupted>,
    ) -> anyhow::Result<Interrupted>
    where
        A: RoomApi + Clone + Send + Sync + 'static,
    {
        let mut session = RoomSessionController::new(api);
        let mut state = State::new(self.server_url.clone());

        // the initial state once
        self.state_tx.send(state.clone())?;

        let mut ticker = tokio::time::interval(Duration::from_secs(1));

        let result = loop {
            tokio::select! {
                // Handle request results and the events of the active room as they come in
                Some(event) = session.recv() => {
                    state.handle_session_event(event);
                },
                // Handle the actions coming from the UI. Requests only start here,
                // their results come back through the session.
                Some(action) = action_rx.recv() => match action {
                    Action::CreateRoom { username } => {
                        state.mark_request_start();
                        state.process_room_request(session.create_room(&username));
                    },
                    Action::JoinRoom { room, username } => {
                        state.mark_request_start();
                        state.process_room_request(session.join_room(&room, &username));
                    },
                    Action::SendMessage { content } => {
                        state.mark_request_start();
                        state.process_send_request(session.send_message(&content));
                    },
                    Action::LeaveRoom => {
                        session.leave_room();
                        state.abandon_pending_request();
                    },
                    Action::DismissError => {
                        state.dismiss_error();
                    },
                    Action::Exit => {
                        let _ = terminator.terminate(Interrupted::UserInt);

                        break Interrupted::UserInt;
                    },
                },
                // Count the seconds spent in the room
                _ = ticker.tick() => {
                    state.tick_timer();
                },
                // Catch and handle interrupt signal to gracefully shutdown
                Ok(interrupted) = interrupt_rx.recv() => {
                    break interrupted;
                }
            }

            state.sync_with_session(&session);
            self.state_tx.send(state.clone())?;
        };

        session.leave_room();
        info!(?result, "state store stopped");

        Ok(result)
    }
}
