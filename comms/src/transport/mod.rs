/// Transport over HTTP implementation for a client to be able to interact with the room server
#[cfg(feature = "client")]
pub mod client;
