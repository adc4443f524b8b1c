use comms::{
    model::{Message, RoomId, UserIdentity},
    transport::client::RoomApi,
};
use tokio::{sync::mpsc, task::JoinSet};
use tracing::{debug, info, trace, warn};

use super::{
    identity::IdentityManager,
    subscription::{StreamSubscription, SubscriptionEvent, SubscriptionId, SubscriptionSink},
    SessionError,
};

const SUBSCRIPTION_EVENTS_CAPACITY: usize = 100;

/// Bumped whenever the session moves on, a room request from an older generation is ignored
type Generation = u64;

/// The mutable state of a room session
#[derive(Debug, Default)]
pub struct SessionState {
    /// Room the session is chatting in. Set iff a subscription is active or being opened.
    pub current_room: Option<RoomId>,
    /// The only subscription of the session which may not be closed
    pub active_subscription: Option<StreamSubscription>,
}

/// Everything the session reports back to its owner, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A message of the active room, in the order the server delivered it
    Message(Message),
    /// The active room's stream failed, it keeps reconnecting
    StreamError(String),
    /// A create or join went through and the room's event stream is open
    RoomEntered(RoomId),
    /// The server accepted a message
    MessageSent(Message),
    /// A create, join or send failed. The session is left consistent.
    RequestFailed(SessionError),
}

/// Result of a request running in the background
#[derive(Debug)]
enum RequestOutcome {
    Room {
        generation: Generation,
        result: Result<RoomId, SessionError>,
    },
    Message(Result<Message, SessionError>),
}

/// RoomSessionController moves the user between rooms, keeping at most one room stream open.
///
/// Operations validate their input right away and leave the network requests running
/// in the background, so the owner keeps handling events while they are in flight.
/// Their results are delivered by [RoomSessionController::recv].
pub struct RoomSessionController<A> {
    api: A,
    identities: IdentityManager,
    state: SessionState,
    generation: Generation,
    last_subscription_id: SubscriptionId,
    events_tx: SubscriptionSink,
    events_rx: mpsc::Receiver<(SubscriptionId, SubscriptionEvent)>,
    requests: JoinSet<RequestOutcome>,
}

impl<A> RoomSessionController<A> {
    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identities.identity()
    }

    pub fn current_room(&self) -> Option<&RoomId> {
        self.state.current_room.as_ref()
    }

    pub fn subscription(&self) -> Option<&StreamSubscription> {
        self.state.active_subscription.as_ref()
    }
}

impl<A> RoomSessionController<A>
where
    A: RoomApi + Clone + Send + Sync + 'static,
{
    pub fn new(api: A) -> Self {
        Self::with_identity_manager(api, IdentityManager::default())
    }

    pub fn with_identity_manager(api: A, identities: IdentityManager) -> Self {
        let (events_tx, events_rx) = mpsc::channel(SUBSCRIPTION_EVENTS_CAPACITY);

        RoomSessionController {
            api,
            identities,
            state: SessionState::default(),
            generation: 0,
            last_subscription_id: 0,
            events_tx,
            events_rx,
            requests: JoinSet::new(),
        }
    }

    pub fn ensure_identity(
        &mut self,
        candidate_username: &str,
    ) -> Result<&UserIdentity, SessionError> {
        self.identities.ensure_identity(candidate_username)
    }

    /// Starts creating a room. Once the server has issued it, the session moves into
    /// the new room and [SessionEvent::RoomEntered] carries its id.
    /// The session is left untouched if the server refuses to create the room.
    pub fn create_room(&mut self, username: &str) -> Result<(), SessionError> {
        let user = self.identities.ensure_identity(username)?.clone();
        let generation = self.next_generation();
        let api = self.api.clone();

        self.requests.spawn(async move {
            let result = api
                .create_room(&user)
                .await
                .map_err(|err| SessionError::remote("Failed to create room", err));

            RequestOutcome::Room { generation, result }
        });

        Ok(())
    }

    /// Starts joining an existing room, moving the session into it once the server agrees.
    pub fn join_room(&mut self, room_input: &str, username: &str) -> Result<(), SessionError> {
        let user = self.identities.ensure_identity(username)?.clone();

        let room = room_input.trim();
        if room.is_empty() {
            return Err(SessionError::InvalidInput("Please enter a room ID to join."));
        }
        let room = RoomId::new(room);
        let generation = self.next_generation();
        let api = self.api.clone();

        self.requests.spawn(async move {
            let result = match api.join_room(&room, &user).await {
                Ok(()) => Ok(room),
                Err(err) => Err(SessionError::remote("Failed to join room", err)),
            };

            RequestOutcome::Room { generation, result }
        });

        Ok(())
    }

    /// Starts sending the trimmed content to the current room.
    /// Returns the message being sent, or `None` when there was nothing to send.
    pub fn send_message(&mut self, content: &str) -> Result<Option<Message>, SessionError> {
        let room = self
            .state
            .current_room
            .clone()
            .ok_or(SessionError::NotInRoom)?;
        let sender = self
            .identities
            .identity()
            .cloned()
            .ok_or(SessionError::IdentityMissing)?;

        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }

        let message = Message::new(self.identities.new_id(), sender, content);
        let api = self.api.clone();
        let outgoing = message.clone();

        self.requests.spawn(async move {
            let result = match api.send_message(&room, &outgoing).await {
                Ok(()) => Ok(outgoing),
                Err(err) => Err(SessionError::remote("Failed to send message", err)),
            };

            RequestOutcome::Message(result)
        });

        Ok(Some(message))
    }

    /// Stops listening to the current room. The server is not notified.
    /// Create and join requests still in flight are ignored when they complete.
    pub fn leave_room(&mut self) {
        self.next_generation();
        self.close_active_subscription();

        if let Some(room) = self.state.current_room.take() {
            info!(%room, "left room");
        }
    }

    /// Receive the next event of the session: request results and the events of the
    /// active subscription. Events still in flight from closed subscriptions are dropped.
    ///
    /// # Cancel Safety
    ///
    /// This method is cancel-safe and can be used in [tokio::select!].
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        loop {
            let event = tokio::select! {
                Some((id, event)) = self.events_rx.recv() => {
                    self.handle_subscription_event(id, event)
                },
                Some(joined) = self.requests.join_next(), if !self.requests.is_empty() => {
                    match joined {
                        Ok(outcome) => self.handle_request_outcome(outcome),
                        Err(err) => {
                            warn!(%err, "request task did not complete");
                            Some(SessionEvent::RequestFailed(SessionError::RemoteRequestFailed(
                                format!("Request aborted: {err}"),
                            )))
                        }
                    }
                },
                else => return None,
            };

            if let Some(event) = event {
                return Some(event);
            }
        }
    }

    fn handle_subscription_event(
        &mut self,
        id: SubscriptionId,
        event: SubscriptionEvent,
    ) -> Option<SessionEvent> {
        let Some(subscription) = self
            .state
            .active_subscription
            .as_mut()
            .filter(|subscription| subscription.id() == id)
        else {
            trace!(subscription = id, "dropping event of a closed subscription");
            return None;
        };

        subscription.record(&event);
        let room = subscription.room().clone();

        match event {
            SubscriptionEvent::Opened => Some(SessionEvent::RoomEntered(room)),
            SubscriptionEvent::OpenFailed(reason) => {
                // no half switched session: without a stream there is no room
                self.close_active_subscription();
                self.state.current_room = None;

                Some(SessionEvent::RequestFailed(SessionError::RemoteRequestFailed(
                    format!("Failed to connect to room: {reason}"),
                )))
            }
            SubscriptionEvent::Message(message) => Some(SessionEvent::Message(message)),
            SubscriptionEvent::TransportError(reason) => Some(SessionEvent::StreamError(reason)),
        }
    }

    fn handle_request_outcome(&mut self, outcome: RequestOutcome) -> Option<SessionEvent> {
        match outcome {
            RequestOutcome::Room { generation, result } if generation != self.generation => {
                debug!(?result, "ignoring a room request the session has moved on from");
                None
            }
            RequestOutcome::Room {
                result: Ok(room), ..
            } => {
                info!(%room, "room request accepted");
                self.switch_room(room);
                None
            }
            RequestOutcome::Room {
                result: Err(err), ..
            } => Some(SessionEvent::RequestFailed(err)),
            RequestOutcome::Message(Ok(message)) => {
                debug!(id = %message.id, "message sent");
                Some(SessionEvent::MessageSent(message))
            }
            RequestOutcome::Message(Err(err)) => Some(SessionEvent::RequestFailed(err)),
        }
    }

    fn switch_room(&mut self, room: RoomId) {
        // two overlapping streams would render every message twice
        self.close_active_subscription();
        self.state.current_room = Some(room.clone());

        self.last_subscription_id += 1;
        self.state.active_subscription = Some(StreamSubscription::open(
            self.api.clone(),
            self.last_subscription_id,
            room,
            self.events_tx.clone(),
        ));
    }

    fn close_active_subscription(&mut self) {
        if let Some(mut subscription) = self.state.active_subscription.take() {
            subscription.close();
        }
    }

    fn next_generation(&mut self) -> Generation {
        self.generation += 1;
        self.generation
    }
}
