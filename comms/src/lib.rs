/// Identities and messages exchanged with the room server
pub mod model;
/// Request bodies accepted by the room server's HTTP endpoints
pub mod request;
/// Implementation of room requests and event streams over HTTP.
/// Requires the 'client' feature to be enabled and will bring in reqwest and tokio alongside with other dependencies
pub mod transport;
