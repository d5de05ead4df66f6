// Identity resolution - maps external principals to owner records

use tracing::{debug, info};

use crate::auth::{
    models::{ExternalIdentity, UpdateProfileRequest, User},
    repository::UserRepository,
};
use crate::error::ApiError;
use crate::SharedClock;

/// Resolves authenticated principals to internal users
#[derive(Clone)]
pub struct IdentityResolver {
    repository: UserRepository,
    clock: SharedClock,
}

impl IdentityResolver {
    /// Create a new IdentityResolver
    pub fn new(repository: UserRepository, clock: SharedClock) -> Self {
        Self { repository, clock }
    }

    /// Look up the user for `identity`, creating it on first sight
    pub async fn resolve_or_create(&self, identity: &ExternalIdentity) -> Result<User, ApiError> {
        if let Some(user) = self.repository.find_by_external_id(&identity.external_id).await? {
            debug!("Resolved existing user {}", user.id);
            return Ok(user);
        }

        let user = self.repository.upsert(identity, self.clock.utc()).await?;
        info!("Created user {} for external identity", user.id);
        Ok(user)
    }

    /// Overwrite the caller's profile, falling back to token claims for omitted fields
    pub async fn update_profile(
        &self,
        user: &User,
        identity: &ExternalIdentity,
        request: UpdateProfileRequest,
    ) -> Result<User, ApiError> {
        let name = request.name.or_else(|| identity.name.clone());
        let email = request.email.or_else(|| identity.email.clone());

        let updated = self
            .repository
            .update_profile(user.id, name.as_deref(), email.as_deref())
            .await?;
        info!("Updated profile for user {}", updated.id);
        Ok(updated)
    }
}
