//! Authentication against the Keycloak identity provider.
//!
//! [`AuthSession`] owns the token lifecycle: it restores a persisted
//! session, keeps the access token fresh and starts a PKCE login whenever
//! the backend or the refresh timer reports the session as gone.

mod keycloak;
mod pkce;
mod provider;
mod session;
mod store;
mod token;

pub use keycloak::KeycloakClient;
pub use provider::StaticIdentity;
pub use session::{AuthEvent, AuthSession};
pub use store::SessionStore;
pub use token::AuthUser;
