use circular_queue::CircularQueue;
use comms::model::{Message, UserIdentity};

use crate::session::{RoomSessionController, SessionError, SessionEvent, SubscriptionState};

#[derive(Debug, Clone, PartialEq)]
pub enum MessageBoxItem {
    Message {
        username: String,
        content: String,
        from_system: bool,
    },
    Notification(String),
}

impl From<Message> for MessageBoxItem {
    fn from(message: Message) -> Self {
        MessageBoxItem::Message {
            from_system: message.sender.is_system(),
            username: message.sender.username,
            content: message.content,
        }
    }
}

const MAX_MESSAGES_TO_STORE: usize = 100;

/// Health of the active room's event stream, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// State holds the state of the application
#[derive(Debug, Clone)]
pub struct State {
    /// The room server the client talks to
    pub server_url: String,
    /// The identity of the user, once established
    pub user: Option<UserIdentity>,
    /// Room the session is currently chatting in
    pub active_room: Option<String>,
    pub stream_status: StreamStatus,
    /// History of messages received in the active room
    pub messages: CircularQueue<MessageBoxItem>,
    /// Last failure, shown until dismissed or until the next request
    pub last_error: Option<String>,
    /// Whether a request to the server is in flight
    pub is_request_pending: bool,
    /// Number of messages the server has accepted so far
    pub sent_message_count: usize,
    /// Seconds spent in the active room
    pub timer: usize,
}

impl State {
    pub fn new(server_url: impl Into<String>) -> Self {
        State {
            server_url: server_url.into(),
            user: None,
            active_room: None,
            stream_status: StreamStatus::Disconnected,
            messages: CircularQueue::with_capacity(MAX_MESSAGES_TO_STORE),
            last_error: None,
            is_request_pending: false,
            sent_message_count: 0,
            timer: 0,
        }
    }

    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Message(message) => {
                self.messages.push(MessageBoxItem::from(message));
            }
            SessionEvent::StreamError(_) if self.stream_status != StreamStatus::Reconnecting => {
                self.messages.push(MessageBoxItem::Notification(String::from(
                    "Connection lost. Trying to reconnect...",
                )));
            }
            SessionEvent::StreamError(_) => {}
            SessionEvent::RoomEntered(_) => {
                self.is_request_pending = false;
            }
            SessionEvent::MessageSent(_) => {
                self.is_request_pending = false;
                self.sent_message_count += 1;
            }
            SessionEvent::RequestFailed(err) => {
                self.is_request_pending = false;
                self.last_error = Some(err.to_string());
            }
        }
    }

    /// Mirrors the identity, room and stream status of the session
    pub fn sync_with_session<A>(&mut self, session: &RoomSessionController<A>) {
        self.user = session.identity().cloned();

        let room = session.current_room().map(|room| room.to_string());
        if room != self.active_room {
            self.messages.clear();
            self.timer = 0;

            if let Some(room) = room.as_ref() {
                self.messages
                    .push(MessageBoxItem::Notification(format!("Connected to Room {room}")));
            }

            self.active_room = room;
        }

        self.stream_status = match session.subscription().map(|s| s.state()) {
            Some(SubscriptionState::Opening) => StreamStatus::Connecting,
            Some(SubscriptionState::Open) => StreamStatus::Connected,
            Some(SubscriptionState::Errored) => StreamStatus::Reconnecting,
            Some(SubscriptionState::Closed) | None => StreamStatus::Disconnected,
        };
    }

    pub fn mark_request_start(&mut self) {
        self.is_request_pending = true;
        self.last_error = None;
    }

    /// Processes the start of a create or join request.
    /// On success the request stays pending until the session reports back.
    pub fn process_room_request(&mut self, started: Result<(), SessionError>) {
        if let Err(err) = started {
            self.is_request_pending = false;
            self.last_error = Some(err.to_string());
        }
    }

    /// Processes the start of a send request. Blank messages are not sent at all.
    pub fn process_send_request(&mut self, started: Result<Option<Message>, SessionError>) {
        match started {
            Ok(Some(_)) => {}
            Ok(None) => self.is_request_pending = false,
            Err(err) => {
                self.is_request_pending = false;
                self.last_error = Some(err.to_string());
            }
        }
    }

    /// The session left the room, results of room requests still in flight will not arrive
    pub fn abandon_pending_request(&mut self) {
        self.is_request_pending = false;
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    pub fn tick_timer(&mut self) {
        self.timer += 1;
    }
}
