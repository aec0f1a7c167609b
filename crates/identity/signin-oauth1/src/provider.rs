//! Three-legged handshake orchestration.
//!
//! Each handshake is a stateless sequence of two entry points: `start_sign_in`
//! (obtain request token, seal continuation state, redirect the user) and
//! `complete_sign_in` (validate the callback, exchange the verifier, emit the
//! identity). Any failure is terminal for the attempt; the user re-initiates
//! from the start.

use crate::client::BackchannelClient;
use crate::config::Oauth1Config;
use crate::error::{Oauth1Error, Oauth1Result};
use crate::events::{
    FailureContext, HandshakeEvents, HookOutcome, NoopEvents, RedirectContext, TicketContext,
};
use crate::state::{HandshakeState, StateCodec};
use crate::types::{AccessToken, CallbackParams, UserProfile};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use signin_core::{IdentityError, IdentityProvider, IdentityResult, VerifiedIdentity};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of leg 1: where to send the user, plus the sealed state the host
/// must round-trip through the browser (typically a short-lived cookie on the
/// redirect response) and present back on the callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRedirect {
    pub authorization_url: String,
    pub state: String,
}

/// Outcome of a completed handshake, handed to the configured sign-in scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInTicket {
    pub identity: VerifiedIdentity,
    pub sign_in_scheme: String,
    pub redirect_target: String,
}

/// Payload for the generic [`IdentityProvider`] entry point.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Oauth1AuthPayload {
    StartSignIn {
        redirect_target: Option<String>,
    },
    Callback {
        oauth_token: String,
        oauth_verifier: Option<String>,
        state: String,
    },
}

/// Response surfaced through the [`IdentityProvider`] entry point when the
/// flow needs a browser redirect rather than an identity.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Oauth1Response {
    Redirect {
        authorization_url: String,
        state: String,
    },
    Error {
        message: String,
    },
}

/// OAuth 1.0a sign-in provider.
#[derive(Clone)]
pub struct Oauth1Provider {
    config: Arc<Oauth1Config>,
    client: BackchannelClient,
    codec: Arc<dyn StateCodec>,
    events: Arc<dyn HandshakeEvents>,
}

impl Oauth1Provider {
    pub fn new(config: Oauth1Config, codec: Arc<dyn StateCodec>) -> Oauth1Result<Self> {
        let config = Arc::new(config);
        let client = BackchannelClient::new(config.clone())?;

        Ok(Self {
            config,
            client,
            codec,
            events: Arc::new(NoopEvents),
        })
    }

    pub fn with_events(mut self, events: Arc<dyn HandshakeEvents>) -> Self {
        self.events = events;
        self
    }

    /// Substitute the backchannel transport (corporate proxies, test doubles).
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.client = BackchannelClient::with_http_client(self.config.clone(), http_client);
        self
    }

    /// Legs 1–2: obtain a request token and produce the authorization
    /// redirect. `redirect_target` is where the host sends the user once the
    /// whole handshake succeeds.
    pub async fn start_sign_in(&self, redirect_target: &str) -> Oauth1Result<SignInRedirect> {
        match self.start_sign_in_inner(redirect_target).await {
            Ok(redirect) => Ok(redirect),
            Err(err) => {
                self.dispatch_failure(&err);
                Err(err)
            }
        }
    }

    async fn start_sign_in_inner(&self, redirect_target: &str) -> Oauth1Result<SignInRedirect> {
        debug!("Handshake entering RequestingToken");
        let callback_url = self.config.callback_url();
        let request_token = self.client.request_token(&callback_url).await?;

        let state = HandshakeState::new(
            request_token.token.clone(),
            request_token.token_secret,
            redirect_target,
            self.config.state_ttl,
        );
        let sealed_state = self.codec.encode(&state)?;

        let mut authorization_url = url::Url::parse(&self.config.authorization_endpoint)?;
        authorization_url
            .query_pairs_mut()
            .append_pair("oauth_token", &request_token.token);

        let mut ctx = RedirectContext {
            authorization_url: authorization_url.into(),
            correlation_id: request_token.token,
        };
        if let HookOutcome::Abort(reason) = self.events.redirecting_to_provider(&mut ctx) {
            return Err(Oauth1Error::HookAborted(reason));
        }

        info!("Handshake awaiting callback from provider");
        Ok(SignInRedirect {
            authorization_url: ctx.authorization_url,
            state: sealed_state,
        })
    }

    /// Legs 3–5: validate the callback, exchange the verifier and emit the
    /// sign-in ticket.
    pub async fn complete_sign_in(&self, callback: CallbackParams) -> Oauth1Result<SignInTicket> {
        match self.complete_sign_in_inner(callback).await {
            Ok(ticket) => Ok(ticket),
            Err(err) => {
                self.dispatch_failure(&err);
                Err(err)
            }
        }
    }

    async fn complete_sign_in_inner(
        &self,
        callback: CallbackParams,
    ) -> Oauth1Result<SignInTicket> {
        debug!("Handshake entering ValidatingCallback");
        let state = self.codec.decode(&callback.state)?;

        // Token substitution guard: the callback token must be the one this
        // state was minted for.
        if callback.oauth_token != state.correlation_id {
            return Err(Oauth1Error::InvalidCallback(
                "oauth_token does not match handshake state".to_string(),
            ));
        }

        let verifier = callback.oauth_verifier.ok_or_else(|| {
            Oauth1Error::InvalidCallback("missing oauth_verifier".to_string())
        })?;

        debug!("Handshake entering ExchangingToken");
        let access_token = self
            .client
            .exchange_token(&callback.oauth_token, &state.request_token_secret, &verifier)
            .await?;

        let profile = match self.config.user_identity_endpoint {
            Some(_) => Some(self.client.fetch_user_identity(&access_token).await?),
            None => None,
        };

        let identity = self.build_identity(&access_token, profile.as_ref());

        let mut ctx = TicketContext { identity };
        if let HookOutcome::Abort(reason) = self.events.ticket_created(&mut ctx) {
            return Err(Oauth1Error::HookAborted(reason));
        }

        info!(subject = %ctx.identity.subject, "Handshake completed");
        Ok(SignInTicket {
            identity: ctx.identity,
            sign_in_scheme: self.config.sign_in_scheme.clone(),
            redirect_target: state.redirect_target,
        })
    }

    fn build_identity(
        &self,
        access_token: &AccessToken,
        profile: Option<&UserProfile>,
    ) -> VerifiedIdentity {
        let mut identity = VerifiedIdentity::new("oauth1", access_token.user_id.clone());
        identity.display_name = Some(access_token.screen_name.clone());
        identity
            .claims
            .insert("user_id".to_string(), access_token.user_id.clone());
        identity
            .claims
            .insert("screen_name".to_string(), access_token.screen_name.clone());

        if let Some(profile) = profile {
            if let Some(name) = &profile.name {
                identity.claims.insert("name".to_string(), name.clone());
                identity.display_name = Some(name.clone());
            }
            if let Some(email) = &profile.email {
                identity.claims.insert("email".to_string(), email.clone());
            }
        }

        // Off by default to keep the downstream authentication cookie small.
        if self.config.save_tokens_as_claims {
            identity
                .claims
                .insert("access_token".to_string(), access_token.token.clone());
            identity.claims.insert(
                "access_token_secret".to_string(),
                access_token.token_secret.clone(),
            );
        }

        identity
    }

    fn dispatch_failure(&self, err: &Oauth1Error) {
        let ctx = FailureContext {
            reason: err.abort_reason(),
            detail: err.to_string(),
        };
        warn!(reason = ?ctx.reason, "Handshake aborted: {}", ctx.detail);
        self.events.handshake_failed(&ctx);
    }
}

#[async_trait]
impl IdentityProvider for Oauth1Provider {
    fn provider_id(&self) -> &str {
        "oauth1"
    }

    async fn verify(&self, auth_payload: serde_json::Value) -> IdentityResult<VerifiedIdentity> {
        let payload: Oauth1AuthPayload =
            serde_json::from_value(auth_payload).map_err(|_| IdentityError::InvalidPayload)?;

        match payload {
            Oauth1AuthPayload::StartSignIn { redirect_target } => {
                let redirect = self
                    .start_sign_in(redirect_target.as_deref().unwrap_or("/"))
                    .await
                    .map_err(|e| IdentityError::ProviderError(e.to_string()))?;

                // Sign-in needs a browser round trip before an identity can
                // exist; surface the redirect for the caller to act on.
                let response = Oauth1Response::Redirect {
                    authorization_url: redirect.authorization_url,
                    state: redirect.state,
                };
                let response_json =
                    serde_json::to_string(&response).map_err(IdentityError::SerializationError)?;

                Err(IdentityError::ProviderError(response_json))
            }
            Oauth1AuthPayload::Callback {
                oauth_token,
                oauth_verifier,
                state,
            } => {
                let ticket = self
                    .complete_sign_in(CallbackParams {
                        oauth_token,
                        oauth_verifier,
                        state,
                    })
                    .await
                    .map_err(|e| IdentityError::ProviderError(e.to_string()))?;

                Ok(ticket.identity)
            }
        }
    }
}
