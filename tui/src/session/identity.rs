use comms::model::UserIdentity;
use tracing::info;
use uuid::Uuid;

use super::SessionError;

/// Source of the random identifiers given to users and messages
pub type IdGenerator = fn() -> Uuid;

/// IdentityManager lazily mints the identity of the user for the current session.
/// Once minted, the identity never changes.
#[derive(Debug)]
pub struct IdentityManager {
    identity: Option<UserIdentity>,
    generate_id: IdGenerator,
}

impl Default for IdentityManager {
    fn default() -> Self {
        Self::with_generator(Uuid::new_v4)
    }
}

impl IdentityManager {
    pub fn with_generator(generate_id: IdGenerator) -> Self {
        Self {
            identity: None,
            generate_id,
        }
    }

    /// Returns the session identity, minting one named after `candidate_username` on first use.
    /// The candidate is ignored once an identity exists.
    pub fn ensure_identity(
        &mut self,
        candidate_username: &str,
    ) -> Result<&UserIdentity, SessionError> {
        if self.identity.is_none() {
            let username = candidate_username.trim();
            if username.is_empty() {
                return Err(SessionError::InvalidInput("Please enter a username."));
            }

            let identity = UserIdentity::new(self.new_id(), username);
            info!(id = %identity.id, username = %identity.username, "user identity created");

            self.identity = Some(identity);
        }

        self.identity.as_ref().ok_or(SessionError::IdentityMissing)
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    /// A fresh identifier from the same generator that mints user ids
    pub fn new_id(&self) -> Uuid {
        (self.generate_id)()
    }
}
