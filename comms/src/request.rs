use serde::{Deserialize, Serialize};

use crate::model::{Message, UserIdentity};

/// Body of `POST /rooms`, creating a new room owned by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub user: UserIdentity,
}

/// Body of `POST /rooms/{room}/join`, adding the user to an existing room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    pub user: UserIdentity,
}

/// Body of `POST /rooms/{room}`, broadcasting a message to the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: Message,
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn bob() -> UserIdentity {
        UserIdentity::new(Uuid::nil(), "bob")
    }

    #[test]
    fn test_create_room_request() {
        let request = CreateRoomRequest { user: bob() };

        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"user":{"id":"00000000-0000-0000-0000-000000000000","username":"bob"}}"#
        );
    }

    #[test]
    fn test_join_room_request() {
        let request = JoinRoomRequest { user: bob() };

        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"user":{"id":"00000000-0000-0000-0000-000000000000","username":"bob"}}"#
        );
    }

    #[test]
    fn test_send_message_request() {
        let request = SendMessageRequest {
            message: Message::new(Uuid::nil(), bob(), "hi"),
        };

        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"message":{"id":"00000000-0000-0000-0000-000000000000","sender":{"id":"00000000-0000-0000-0000-000000000000","username":"bob"},"content":"hi"}}"#
        );
    }
}
