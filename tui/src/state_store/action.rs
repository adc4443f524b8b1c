/// Requests from the UI, processed one at a time by the [super::StateStore]
#[derive(Debug, Clone)]
pub enum Action {
    CreateRoom { username: String },
    JoinRoom { room: String, username: String },
    SendMessage { content: String },
    LeaveRoom,
    DismissError,
    Exit,
}
