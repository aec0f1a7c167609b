//! OAuth 1.0a sign-in provider with signed requests and sealed handshake state.
//!
//! This crate implements the three-legged OAuth 1.0a flow used by Twitter-style
//! sign-in: request-token acquisition, user redirection, callback validation
//! and the verifier-for-access-token exchange. Continuation state is carried
//! in an encrypted, authenticated blob round-tripped through the user's
//! browser, so any number of handshakes can be in flight across any number of
//! instances with no shared state. It integrates with the signin-core traits
//! to emit a claims-based identity for the host pipeline to persist.

mod client;
mod config;
mod error;
mod events;
mod provider;
mod signature;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use client::BackchannelClient;
pub use config::Oauth1Config;
pub use error::{AbortReason, Oauth1Error, Oauth1Result};
pub use events::{
    FailureContext, HandshakeEvents, HookOutcome, NoopEvents, RedirectContext, TicketContext,
};
pub use provider::{Oauth1AuthPayload, Oauth1Provider, Oauth1Response, SignInRedirect, SignInTicket};
pub use signature::{authorization_header, percent_encode, sign};
pub use state::{HandshakeState, SealedStateCodec, StateCodec};
pub use types::{AccessToken, CallbackParams, RequestToken, UserProfile};

// Re-export common types for convenience
pub use signin_core::{IdentityProvider, VerifiedIdentity};
