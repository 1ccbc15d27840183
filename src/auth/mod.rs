// src/auth/mod.rs

pub mod error;
pub mod oauth;
pub mod password;
pub mod service;
pub mod session;

pub use error::{AuthError, AuthResult};
pub use oauth::{ExternalProfile, OAuthProvider, OAuthRegistry};
pub use service::{AuthService, Authenticated, Credentials, RegisterParams};
pub use session::{Session, SessionStore};
