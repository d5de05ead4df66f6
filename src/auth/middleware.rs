// Authentication extractors for owner routes

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::debug;

use crate::auth::{
    error::AuthError,
    models::{ExternalIdentity, User},
    token::TokenService,
};
use crate::error::ApiError;
use crate::AppState;

/// Pull the bearer token out of the Authorization header
fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidToken)
}

/// Verified external identity of the caller
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity(pub ExternalIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedIdentity
where
    S: Send + Sync,
    Arc<TokenService>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let token_service = Arc::<TokenService>::from_ref(state);
        let claims = token_service.validate(token)?;

        Ok(AuthenticatedIdentity(ExternalIdentity {
            external_id: claims.sub,
            name: claims.name,
            email: claims.email,
        }))
    }
}

/// Owner record of the caller, created on first authenticated request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub identity: ExternalIdentity,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthenticatedIdentity(identity) =
            AuthenticatedIdentity::from_request_parts(parts, state).await?;
        let user = state.identity_resolver.resolve_or_create(&identity).await?;
        debug!("Authenticated request for user {}", user.id);
        Ok(CurrentUser { user, identity })
    }
}
