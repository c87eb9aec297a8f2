//! Identity and session management for unified login across EasyPrep.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod verifier;
mod authorizer;

pub use principal::{Identity, Role};
pub use session::{SessionState, SessionStore, SignupProfile};
pub use verifier::{AuthError, CredentialVerifier};
pub use authorizer::{authorize, Decision};
