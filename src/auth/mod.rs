// Identity module
// Verifies identity-provider tokens and resolves them to owner records

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use middleware::{AuthenticatedIdentity, CurrentUser};
pub use models::{ExternalIdentity, UpdateProfileRequest, User};
pub use repository::UserRepository;
pub use service::IdentityResolver;
pub use token::TokenService;
