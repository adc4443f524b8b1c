use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use comms::{
    model::{Message, RoomId, UserIdentity},
    transport::client::{EventStream, RoomApi, TransportError},
};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// A request received by [FakeRoomApi]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ApiCall {
    CreateRoom(UserIdentity),
    JoinRoom(RoomId, UserIdentity),
    SendMessage(RoomId, Message),
    OpenStream(RoomId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Endpoint {
    CreateRoom,
    JoinRoom,
    SendMessage,
    OpenStream,
}

type StreamFeed = mpsc::UnboundedSender<Result<String, TransportError>>;

#[derive(Default)]
struct Inner {
    calls: Vec<ApiCall>,
    rooms_to_create: VecDeque<RoomId>,
    failing: HashSet<Endpoint>,
    /// Requests to these endpoints wait until the gate is opened
    gates: HashMap<Endpoint, watch::Sender<bool>>,
    streams: HashMap<RoomId, StreamFeed>,
}

impl Inner {
    fn check(&self, endpoint: Endpoint) -> Result<(), TransportError> {
        if self.failing.contains(&endpoint) {
            return Err(TransportError::Status {
                status: 503,
                body: format!("{endpoint:?} is unavailable"),
            });
        }

        Ok(())
    }
}

/// In-memory room server recording every request it receives.
/// Event streams are fed by the test through [FakeRoomApi::push_payload] and friends.
#[derive(Clone, Default)]
pub(crate) struct FakeRoomApi {
    inner: Arc<Mutex<Inner>>,
}

impl FakeRoomApi {
    /// Rooms handed out, in order, by successive room creations
    pub fn with_rooms(rooms: &[&str]) -> Self {
        let api = Self::default();
        api.lock().rooms_to_create = rooms.iter().copied().map(RoomId::new).collect();

        api
    }

    pub fn fail(&self, endpoint: Endpoint) {
        self.lock().failing.insert(endpoint);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.lock().failing.remove(&endpoint);
    }

    /// Keeps the following requests to the endpoint in flight until [FakeRoomApi::release]
    pub fn hold(&self, endpoint: Endpoint) {
        let (gate, _) = watch::channel(false);
        self.lock().gates.insert(endpoint, gate);
    }

    pub fn release(&self, endpoint: Endpoint) {
        if let Some(gate) = self.lock().gates.get(&endpoint) {
            gate.send_replace(true);
        }
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    pub fn push_payload(&self, room: &str, payload: &str) {
        self.feed(room, Ok(String::from(payload)));
    }

    pub fn push_message(&self, room: &str, message: &Message) {
        self.push_payload(room, &serde_json::to_string(message).unwrap());
    }

    pub fn push_error(&self, room: &str, reason: &str) {
        self.feed(room, Err(TransportError::Stream(String::from(reason))));
    }

    /// Yields until the latest stream opened for the room has been dropped by its consumer
    pub async fn wait_until_stream_dropped(&self, room: &str) -> bool {
        for _ in 0..100 {
            let dropped = self
                .lock()
                .streams
                .get(&RoomId::new(room))
                .map_or(true, |feed| feed.is_closed());
            if dropped {
                return true;
            }

            tokio::task::yield_now().await;
        }

        false
    }

    fn feed(&self, room: &str, item: Result<String, TransportError>) {
        if let Some(feed) = self.lock().streams.get(&RoomId::new(room)) {
            // the consumer may be gone already, which is what some tests are after
            let _ = feed.send(item);
        }
    }

    /// Records the call, then waits for the endpoint's gate and checks whether it is failing
    async fn receive(&self, call: ApiCall, endpoint: Endpoint) -> Result<(), TransportError> {
        let gate = {
            let mut inner = self.lock();
            inner.calls.push(call);
            inner.gates.get(&endpoint).map(watch::Sender::subscribe)
        };

        if let Some(mut gate) = gate {
            // a dropped gate means the fake itself is gone
            let _ = gate.wait_for(|open| *open).await;
        }

        self.lock().check(endpoint)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }
}

impl RoomApi for FakeRoomApi {
    async fn create_room(&self, user: &UserIdentity) -> Result<RoomId, TransportError> {
        self.receive(ApiCall::CreateRoom(user.clone()), Endpoint::CreateRoom)
            .await?;

        self.lock()
            .rooms_to_create
            .pop_front()
            .ok_or_else(|| TransportError::InvalidRoomId(String::new()))
    }

    async fn join_room(&self, room: &RoomId, user: &UserIdentity) -> Result<(), TransportError> {
        self.receive(ApiCall::JoinRoom(room.clone(), user.clone()), Endpoint::JoinRoom)
            .await
    }

    async fn send_message(&self, room: &RoomId, message: &Message) -> Result<(), TransportError> {
        self.receive(
            ApiCall::SendMessage(room.clone(), message.clone()),
            Endpoint::SendMessage,
        )
        .await
    }

    async fn open_stream(&self, room: &RoomId) -> Result<EventStream, TransportError> {
        self.receive(ApiCall::OpenStream(room.clone()), Endpoint::OpenStream)
            .await?;

        let (feed, events) = mpsc::unbounded_channel();
        self.lock().streams.insert(room.clone(), feed);

        Ok(Box::pin(UnboundedReceiverStream::new(events)))
    }
}
