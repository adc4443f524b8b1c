//! The room session: who the user is, which room they are in,
//! and the single event stream the session listens to.

pub use self::controller::{RoomSessionController, SessionEvent, SessionState};
pub use self::error::SessionError;
pub use self::identity::IdentityManager;
pub use self::subscription::{StreamSubscription, SubscriptionState};

mod controller;
mod error;
mod identity;
mod subscription;
#[cfg(test)]
pub(crate) mod testing;
