use comms::{
    model::{Message, RoomId, UserIdentity},
    transport::client::{HttpRoomApi, RoomApi},
};
use futures::StreamExt;
use uuid::Uuid;

const SERVER_URL: &str = "http://127.0.0.1:8000";

// Usage: cargo run --example tail_room [room-id]
// Creates a room when no id is given, then prints every event the room receives.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let api = HttpRoomApi::new(SERVER_URL)?;
    let user = UserIdentity::new(Uuid::new_v4(), "tail");

    let room = match std::env::args().nth(1) {
        Some(room) => {
            let room = RoomId::new(room);
            api.join_room(&room, &user).await?;
            room
        }
        None => api.create_room(&user).await?,
    };
    println!("listening to room {room}");

    let mut events = api.open_stream(&room).await?;

    api.send_message(&room, &Message::new(Uuid::new_v4(), user, "tail attached"))
        .await?;

    while let Some(event) = events.next().await {
        match event {
            // server has sent an event, it may or may not be a message
            Ok(payload) => match serde_json::from_str::<Message>(&payload) {
                Ok(message) => println!("[{}]: {}", message.sender.username, message.content),
                Err(_) => println!("[?]: {payload}"),
            },
            // the stream keeps reconnecting in the background
            Err(e) => println!("stream error: {e}"),
        }
    }

    Ok(())
}
