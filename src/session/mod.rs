//! Session management
//!
//! This module handles the login state machine, token refresh and the
//! construction of authorized HTTP clients bound to the session's regional
//! tier.

pub mod auth;
pub mod network;
pub mod transport;

pub use auth::AuthenticationProtocol;
pub use network::NetworkManager;
pub use transport::{AuthorizedTransport, TransportBinding, TransportFactory};
