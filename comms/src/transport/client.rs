use std::{future::Future, pin::Pin, time::Duration};

use eventsource_stream::{Event as SseEvent, EventStreamError, Eventsource};
use futures::{
    stream::{self, Stream},
    StreamExt,
};
use reqwest::{header::ACCEPT, Response, Url};
use tracing::{debug, trace, warn};

use crate::{
    model::{Message, RoomId, UserIdentity},
    request::{CreateRoomRequest, JoinRoomRequest, SendMessageRequest},
};

pub type BoxedStream<Item> = Pin<Box<dyn Stream<Item = Item> + Send>>;

/// [EventStream] is a stream of raw event payloads pushed by the server for a single room
///
/// Transport failures are yielded as errors without ending the stream. The connection
/// is re-established after the retry delay, so polling can simply continue.
///
/// # Cancel Safety
///
/// This stream is cancel-safe, meaning that it can be used in [tokio::select!]
/// without the risk of missing events.
pub type EventStream = BoxedStream<Result<String, TransportError>>;

/// Delay between reconnection attempts, unless the server asks for another one
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);
/// Upper bound for room creation, joins and sends, from connecting until the response is read
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const EVENT_STREAM_MIME: &str = "text/event-stream";
const LAST_EVENT_ID_HEADER: &str = "Last-Event-ID";
/// Event type of unnamed events, the only ones carrying room traffic
const MESSAGE_EVENT: &str = "message";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid server url '{0}'")]
    InvalidBaseUrl(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("server responded with an invalid room id: {0:?}")]
    InvalidRoomId(String),
    #[error("event stream interrupted: {0}")]
    Stream(String),
}

/// The room server, as seen by a single client session.
pub trait RoomApi {
    /// Create a room on behalf of the user, returning the id issued by the server
    fn create_room(
        &self,
        user: &UserIdentity,
    ) -> impl Future<Output = Result<RoomId, TransportError>> + Send;

    /// Add the user to an existing room
    fn join_room(
        &self,
        room: &RoomId,
        user: &UserIdentity,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Broadcast a message to everyone subscribed to the room
    fn send_message(
        &self,
        room: &RoomId,
        message: &Message,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Start listening to the event stream of the room.
    /// Resolves once the server has accepted the stream request.
    fn open_stream(
        &self,
        room: &RoomId,
    ) -> impl Future<Output = Result<EventStream, TransportError>> + Send;
}

/// [RoomApi] implementation talking JSON over HTTP, with rooms streamed as server-sent events
#[derive(Debug, Clone)]
pub struct HttpRoomApi {
    client: reqwest::Client,
    base_url: Url,
    retry_delay: Duration,
    request_timeout: Duration,
}

impl HttpRoomApi {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        // no overall timeout on the client, it would cut the event streams
        let client = reqwest::Client::builder()
            .connect_timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;

        Self::with_client(client, base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| TransportError::InvalidBaseUrl(String::from(base_url)))?;

        Ok(Self {
            client,
            base_url,
            retry_delay: DEFAULT_RETRY_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Overrides the delay used before re-establishing a dropped event stream
    pub fn with_retry_delay(self, retry_delay: Duration) -> Self {
        Self {
            retry_delay,
            ..self
        }
    }

    /// Overrides the time allowed to the create, join and send requests
    pub fn with_request_timeout(self, request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            ..self
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `{base}/rooms[/{room}][/{tail}]`, escaping the room id as a single path segment
    fn rooms_url(&self, room: Option<&RoomId>, tail: Option<&str>) -> Url {
        let mut url = self.base_url.clone();

        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("rooms");
            segments.extend(room.map(RoomId::as_str));
            segments.extend(tail);
        }

        url
    }
}

impl RoomApi for HttpRoomApi {
    async fn create_room(&self, user: &UserIdentity) -> Result<RoomId, TransportError> {
        let response = self
            .client
            .post(self.rooms_url(None, None))
            .timeout(self.request_timeout)
            .json(&CreateRoomRequest { user: user.clone() })
            .send()
            .await?;
        let body = ensure_success(response).await?.text().await?;

        parse_room_id(&body)
    }

    async fn join_room(&self, room: &RoomId, user: &UserIdentity) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.rooms_url(Some(room), Some("join")))
            .timeout(self.request_timeout)
            .json(&JoinRoomRequest { user: user.clone() })
            .send()
            .await?;
        ensure_success(response).await?;

        Ok(())
    }

    async fn send_message(&self, room: &RoomId, message: &Message) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.rooms_url(Some(room), None))
            .timeout(self.request_timeout)
            .json(&SendMessageRequest {
                message: message.clone(),
            })
            .send()
            .await?;
        ensure_success(response).await?;

        Ok(())
    }

    async fn open_stream(&self, room: &RoomId) -> Result<EventStream, TransportError> {
        let url = self.rooms_url(Some(room), Some("stream"));
        let response = connect(&self.client, &url, None).await?;
        debug!(%url, "event stream connected");

        Ok(reconnecting_event_stream(ReconnectState {
            client: self.client.clone(),
            url,
            retry_delay: self.retry_delay,
            last_event_id: None,
            events: Some(into_sse_stream(response)),
        }))
    }
}

/// Turns non-2xx responses into [TransportError::Status], keeping the body as the reason
async fn ensure_success(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();

    Err(TransportError::Status {
        status: status.as_u16(),
        body,
    })
}

/// The server answers room creation with a JSON string, but a bare token is accepted as well
fn parse_room_id(body: &str) -> Result<RoomId, TransportError> {
    let body = body.trim();
    let id = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::String(id)) => id,
        Ok(serde_json::Value::Number(id)) => id.to_string(),
        Ok(_) => return Err(TransportError::InvalidRoomId(String::from(body))),
        Err(_) => String::from(body),
    };

    match id.trim() {
        "" => Err(TransportError::InvalidRoomId(String::from(body))),
        id => Ok(RoomId::new(id)),
    }
}

type SseStream = BoxedStream<Result<SseEvent, EventStreamError<reqwest::Error>>>;

async fn connect(
    client: &reqwest::Client,
    url: &Url,
    last_event_id: Option<&str>,
) -> Result<Response, TransportError> {
    let mut request = client.get(url.clone()).header(ACCEPT, EVENT_STREAM_MIME);
    if let Some(last_event_id) = last_event_id {
        request = request.header(LAST_EVENT_ID_HEADER, last_event_id);
    }

    ensure_success(request.send().await?).await
}

fn into_sse_stream(response: Response) -> SseStream {
    Box::pin(response.bytes_stream().eventsource())
}

fn is_message_event(event: &SseEvent) -> bool {
    event.event.is_empty() || event.event == MESSAGE_EVENT
}

struct ReconnectState {
    client: reqwest::Client,
    url: Url,
    retry_delay: Duration,
    last_event_id: Option<String>,
    /// `None` while the connection is down and has to be re-established
    events: Option<SseStream>,
}

/// Yields the data of every unnamed server-sent event. When the connection fails or the server
/// ends it, the failure is yielded and the stream reconnects after the retry delay.
fn reconnecting_event_stream(state: ReconnectState) -> EventStream {
    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if state.events.is_none() {
                tokio::time::sleep(state.retry_delay).await;

                match connect(&state.client, &state.url, state.last_event_id.as_deref()).await {
                    Ok(response) => {
                        debug!(url = %state.url, "event stream reconnected");
                        state.events = Some(into_sse_stream(response));
                    }
                    Err(err) => {
                        warn!(url = %state.url, %err, "could not reconnect to the event stream");
                        return Some((Err(err), state));
                    }
                }
            }

            let Some(events) = state.events.as_mut() else {
                continue;
            };

            let err = match events.next().await {
                Some(Ok(event)) => {
                    if let Some(retry_delay) = event.retry {
                        state.retry_delay = retry_delay;
                    }
                    if !event.id.is_empty() {
                        state.last_event_id = Some(event.id.clone());
                    }
                    // events without data are only carrying the fields above,
                    // named events (keep-alives and such) are not room traffic
                    if event.data.is_empty() || !is_message_event(&event) {
                        trace!(event = %event.event, "skipping event");
                        continue;
                    }

                    return Some((Ok(event.data), state));
                }
                Some(Err(err)) => TransportError::Stream(err.to_string()),
                None => TransportError::Stream(String::from("connection closed by the server")),
            };

            warn!(url = %state.url, %err, "event stream dropped");
            state.events = None;

            return Some((Err(err), state));
        }
    }))
}
