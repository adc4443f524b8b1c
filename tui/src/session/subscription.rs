use comms::{
    model::{Message, RoomId, UserIdentity},
    transport::client::{EventStream, RoomApi},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type SubscriptionId = u64;

/// Lifecycle of a [StreamSubscription].
///
/// A subscription is `Opening` until the server accepts the stream request.
/// `Errored` is not terminal, the transport keeps reconnecting and the next
/// delivered event moves the subscription back to `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Opening,
    Open,
    Errored,
    Closed,
}

/// Something that happened on the event stream of a subscription
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionEvent {
    /// The server accepted the stream request
    Opened,
    /// The stream could not be opened, nothing else follows
    OpenFailed(String),
    /// An inbound event, already decoded. Undecodable payloads arrive as system messages.
    Message(Message),
    /// The transport failed. Purely informational, the subscription stays alive.
    TransportError(String),
}

/// Events of every subscription are funneled into a single channel, tagged with their subscription
pub(crate) type SubscriptionSink = mpsc::Sender<(SubscriptionId, SubscriptionEvent)>;

/// StreamSubscription is the live connection to the event stream of a single room
#[derive(Debug)]
pub struct StreamSubscription {
    id: SubscriptionId,
    room: RoomId,
    state: SubscriptionState,
    /// Task opening the stream, then moving its events into the sink
    forwarder: Option<JoinHandle<()>>,
}

impl StreamSubscription {
    /// Starts opening the event stream of the room in the background.
    ///
    /// The outcome reaches `sink` as [SubscriptionEvent::Opened] or
    /// [SubscriptionEvent::OpenFailed], followed by the events of the room once opened.
    pub(crate) fn open<A>(
        api: A,
        id: SubscriptionId,
        room: RoomId,
        sink: SubscriptionSink,
    ) -> Self
    where
        A: RoomApi + Send + Sync + 'static,
    {
        let forwarder = tokio::spawn(forward_events(api, id, room.clone(), sink));
        debug!(subscription = id, %room, "opening the room's event stream");

        StreamSubscription {
            id,
            room,
            state: SubscriptionState::Opening,
            forwarder: Some(forwarder),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SubscriptionState::Closed
    }

    /// Applies the state transition implied by an event of this subscription
    pub(crate) fn record(&mut self, event: &SubscriptionEvent) {
        self.state = match (self.state, event) {
            (SubscriptionState::Closed, _) => SubscriptionState::Closed,
            (_, SubscriptionEvent::OpenFailed(_)) => SubscriptionState::Closed,
            (_, SubscriptionEvent::Opened | SubscriptionEvent::Message(_)) => {
                SubscriptionState::Open
            }
            (_, SubscriptionEvent::TransportError(_)) => SubscriptionState::Errored,
        };
    }

    /// Releases the transport. Calling it on a closed subscription does nothing.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }

        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
            info!(
                subscription = self.id,
                room = %self.room,
                "unsubscribed from the room's event stream"
            );
        }
        self.state = SubscriptionState::Closed;
    }
}

impl Drop for StreamSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Decodes an event payload as a [Message].
///
/// Payloads that are not messages are never dropped, they are wrapped in a message
/// sent by [UserIdentity::system] carrying the raw payload as content.
pub fn decode_message(payload: &str) -> Message {
    match serde_json::from_str::<Message>(payload) {
        Ok(message) => message,
        Err(err) => {
            debug!(%err, payload, "event is not a message, delivering it as a system message");

            Message::new(Uuid::nil(), UserIdentity::system(), payload)
        }
    }
}

async fn forward_events<A: RoomApi>(
    api: A,
    id: SubscriptionId,
    room: RoomId,
    sink: SubscriptionSink,
) {
    let mut events: EventStream = match api.open_stream(&room).await {
        Ok(events) => events,
        Err(err) => {
            warn!(subscription = id, %room, %err, "could not open the room's event stream");
            let _ = sink
                .send((id, SubscriptionEvent::OpenFailed(err.to_string())))
                .await;
            return;
        }
    };

    info!(subscription = id, %room, "subscribed to the room's event stream");
    if sink.send((id, SubscriptionEvent::Opened)).await.is_err() {
        return;
    }

    while let Some(item) = events.next().await {
        let event = match item {
            Ok(payload) => SubscriptionEvent::Message(decode_message(&payload)),
            Err(err) => {
                warn!(
                    subscription = id,
                    %err,
                    "event stream error, waiting for the transport to recover"
                );
                SubscriptionEvent::TransportError(err.to_string())
            }
        };

        // the session is gone, nobody is listening anymore
        if sink.send((id, event)).await.is_err() {
            return;
        }
    }

    let _ = sink
        .send((
            id,
            SubscriptionEvent::TransportError(String::from("event stream ended")),
        ))
        .await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use comms::model::SYSTEM_USERNAME;

    use super::*;
    use crate::session::testing::{Endpoint, FakeRoomApi};

    const ROOM: &str = "room-42";

    type Events = mpsc::Receiver<(SubscriptionId, SubscriptionEvent)>;

    fn open(api: &FakeRoomApi) -> (StreamSubscription, Events) {
        let (tx, rx) = mpsc::channel(10);
        let subscription = StreamSubscription::open(api.clone(), 7, RoomId::new(ROOM), tx);

        (subscription, rx)
    }

    async fn next_event(rx: &mut Events) -> (SubscriptionId, SubscriptionEvent) {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("sink closed")
    }

    /// Opens a subscription and waits until the server has accepted the stream
    async fn open_and_wait(api: &FakeRoomApi) -> (StreamSubscription, Events) {
        let (mut subscription, mut rx) = open(api);
        let (_, event) = next_event(&mut rx).await;
        assert_eq!(event, SubscriptionEvent::Opened);
        subscription.record(&event);

        (subscription, rx)
    }

    fn alice_says(content: &str) -> Message {
        Message::new(Uuid::new_v4(), UserIdentity::new(Uuid::new_v4(), "alice"), content)
    }

    #[test]
    fn test_decode_message() {
        let message = alice_says("hello");
        let payload = serde_json::to_string(&message).unwrap();

        assert_eq!(decode_message(&payload), message);
    }

    #[test]
    fn test_decode_falls_back_to_raw_payload() {
        for payload in ["not json", r#"{"content":"no sender"}"#, "42"] {
            let message = decode_message(payload);

            assert!(message.sender.is_system());
            assert_eq!(message.sender.username, SYSTEM_USERNAME);
            assert_eq!(message.content, payload);
        }
    }

    #[tokio::test]
    async fn test_subscription_opens_in_the_background() {
        let api = FakeRoomApi::default();
        api.hold(Endpoint::OpenStream);

        let (mut subscription, mut rx) = open(&api);
        assert_eq!(subscription.state(), SubscriptionState::Opening);

        api.release(Endpoint::OpenStream);
        let (id, event) = next_event(&mut rx).await;
        subscription.record(&event);

        assert_eq!((id, event), (7, SubscriptionEvent::Opened));
        assert_eq!(subscription.state(), SubscriptionState::Open);
    }

    #[tokio::test]
    async fn test_events_are_forwarded_in_delivery_order() {
        let api = FakeRoomApi::default();
        let (_subscription, mut rx) = open_and_wait(&api).await;
        let messages = [alice_says("one"), alice_says("two"), alice_says("three")];

        for message in &messages {
            api.push_message(ROOM, message);
        }

        for message in messages {
            assert_eq!(
                next_event(&mut rx).await,
                (7, SubscriptionEvent::Message(message))
            );
        }
    }

    #[tokio::test]
    async fn test_malformed_payload_is_delivered_once() {
        let api = FakeRoomApi::default();
        let (_subscription, mut rx) = open_and_wait(&api).await;

        api.push_payload(ROOM, "not json");
        api.push_message(ROOM, &alice_says("after"));

        let (_, event) = next_event(&mut rx).await;
        let SubscriptionEvent::Message(message) = event else {
            panic!("expected a message, got {event:?}");
        };
        assert!(message.sender.is_system());
        assert_eq!(message.content, "not json");

        let (_, event) = next_event(&mut rx).await;
        assert!(matches!(event, SubscriptionEvent::Message(m) if m.content == "after"));
    }

    #[tokio::test]
    async fn test_transport_errors_do_not_end_the_subscription() {
        let api = FakeRoomApi::default();
        let (mut subscription, mut rx) = open_and_wait(&api).await;

        api.push_error(ROOM, "connection reset");
        api.push_message(ROOM, &alice_says("still here"));

        let (_, event) = next_event(&mut rx).await;
        assert!(matches!(
            event,
            SubscriptionEvent::TransportError(ref reason) if reason.contains("connection reset")
        ));
        subscription.record(&event);
        assert_eq!(subscription.state(), SubscriptionState::Errored);

        let (_, event) = next_event(&mut rx).await;
        subscription.record(&event);
        assert_eq!(subscription.state(), SubscriptionState::Open);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_releases_the_transport() {
        let api = FakeRoomApi::default();
        let (mut subscription, _rx) = open_and_wait(&api).await;

        subscription.close();
        subscription.close();

        assert!(subscription.is_closed());
        assert!(api.wait_until_stream_dropped(ROOM).await);

        subscription.record(&SubscriptionEvent::Message(alice_says("late")));
        assert!(subscription.is_closed());
    }

    #[tokio::test]
    async fn test_open_failure_is_reported() {
        let api = FakeRoomApi::default();
        api.fail(Endpoint::OpenStream);

        let (mut subscription, mut rx) = open(&api);
        let (_, event) = next_event(&mut rx).await;

        assert!(matches!(
            event,
            SubscriptionEvent::OpenFailed(ref reason) if reason.contains("503")
        ));
        subscription.record(&event);
        assert!(subscription.is_closed());
    }
}
