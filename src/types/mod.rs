//! Type definitions for the Blink client
//!
//! Session model, request bodies and response payloads.

pub mod internal;
pub mod request;
pub mod response;

pub use internal::*;
pub use request::{GrantType, LegacyLoginRequest, PinVerifyRequest, TokenGrantRequest};
pub use response::{
    Account, Auth, Dashboard, LoginResponse, ManifestHandle, ManifestResponse, Phone, SyncModule,
    TierInfo, TokenEnvelope, User, VideoDescriptor,
};
