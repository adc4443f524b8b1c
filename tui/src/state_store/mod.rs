pub use self::state::{MessageBoxItem, State, StreamStatus};
pub use self::state_store::StateStore;

pub mod action;
mod state;
mod state_store;
