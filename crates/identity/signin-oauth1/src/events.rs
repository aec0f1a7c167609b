//! Extension hooks dispatched at fixed points of the handshake.

use crate::error::AbortReason;
use signin_core::VerifiedIdentity;

/// What a hook decided about the in-flight handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    Continue,
    /// Veto the flow; the reason is surfaced as the handshake failure.
    Abort(String),
}

/// Context handed to the pre-redirect hook. The destination may be rewritten.
#[derive(Debug)]
pub struct RedirectContext {
    pub authorization_url: String,
    /// Request token the user is being sent to authorize.
    pub correlation_id: String,
}

/// Context handed to the ticket hook; claims may be added or adjusted before
/// the identity reaches the sign-in scheme.
#[derive(Debug)]
pub struct TicketContext {
    pub identity: VerifiedIdentity,
}

/// Context handed to the failure hook after a handshake aborts.
#[derive(Debug)]
pub struct FailureContext {
    pub reason: AbortReason,
    pub detail: String,
}

/// Hook set invoked synchronously, at most one handler per extension point.
/// Every method defaults to pass-through, so implementors override only what
/// they need.
pub trait HandshakeEvents: Send + Sync {
    /// Runs after the request token is obtained, before the user is redirected.
    fn redirecting_to_provider(&self, _ctx: &mut RedirectContext) -> HookOutcome {
        HookOutcome::Continue
    }

    /// Runs after the token exchange, once the identity has been assembled.
    fn ticket_created(&self, _ctx: &mut TicketContext) -> HookOutcome {
        HookOutcome::Continue
    }

    /// Runs whenever the handshake aborts, with the terminal reason.
    fn handshake_failed(&self, _ctx: &FailureContext) {}
}

/// Default hook set that lets every handshake pass through untouched.
pub struct NoopEvents;

impl HandshakeEvents for NoopEvents {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_hooks_pass_through() {
        let events = NoopEvents;

        let mut redirect = RedirectContext {
            authorization_url: "https://provider.example/authorize?oauth_token=RT1".to_string(),
            correlation_id: "RT1".to_string(),
        };
        assert_eq!(
            events.redirecting_to_provider(&mut redirect),
            HookOutcome::Continue
        );

        let mut ticket = TicketContext {
            identity: VerifiedIdentity::new("oauth1:twitter", "42"),
        };
        assert_eq!(events.ticket_created(&mut ticket), HookOutcome::Continue);
    }
}
