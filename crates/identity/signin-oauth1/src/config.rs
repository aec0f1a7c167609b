//! OAuth 1.0a provider configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sign-in provider configuration.
///
/// Built once during host startup and treated as read-only for the lifetime
/// of every handshake that observes it. Defaults follow the Twitter sign-in
/// middleware this provider generalizes: callback path `/signin-twitter`,
/// 60 second backchannel timeout, tokens kept out of the emitted claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Oauth1Config {
    /// Consumer key used to identify the application to the provider.
    pub consumer_key: String,
    /// Consumer secret used to sign every backchannel request.
    pub consumer_secret: String,

    pub request_token_endpoint: String,
    pub authorization_endpoint: String,
    pub access_token_endpoint: String,
    /// Optional profile endpoint, queried after the token exchange when set.
    pub user_identity_endpoint: Option<String>,

    /// Absolute base URL of the hosting application, e.g. `https://app.example.com`.
    pub callback_base: String,
    /// Request path where the provider returns the user agent.
    pub callback_path: String,

    /// Upper bound for each backchannel call. No retries are issued on expiry.
    #[serde(with = "duration_secs")]
    pub backchannel_timeout: Duration,

    /// Scheme name of the downstream collaborator that persists the identity.
    pub sign_in_scheme: String,

    /// Whether the access token and secret are embedded in the emitted claims.
    pub save_tokens_as_claims: bool,

    /// Validity window of the sealed handshake state.
    #[serde(with = "duration_secs")]
    pub state_ttl: Duration,
}

impl Oauth1Config {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            request_token_endpoint: "https://api.twitter.com/oauth/request_token".to_string(),
            authorization_endpoint: "https://api.twitter.com/oauth/authenticate".to_string(),
            access_token_endpoint: "https://api.twitter.com/oauth/access_token".to_string(),
            user_identity_endpoint: None,
            callback_base: String::new(),
            callback_path: "/signin-twitter".to_string(),
            backchannel_timeout: Duration::from_secs(60),
            sign_in_scheme: "cookies".to_string(),
            save_tokens_as_claims: false,
            state_ttl: Duration::from_secs(600),
        }
    }

    pub fn with_endpoints(
        mut self,
        request_token: impl Into<String>,
        authorization: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        self.request_token_endpoint = request_token.into();
        self.authorization_endpoint = authorization.into();
        self.access_token_endpoint = access_token.into();
        self
    }

    pub fn with_user_identity_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.user_identity_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_callback(mut self, base: impl Into<String>, path: impl Into<String>) -> Self {
        self.callback_base = base.into();
        self.callback_path = path.into();
        self
    }

    pub fn with_backchannel_timeout(mut self, timeout: Duration) -> Self {
        self.backchannel_timeout = timeout;
        self
    }

    pub fn with_sign_in_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.sign_in_scheme = scheme.into();
        self
    }

    pub fn with_save_tokens_as_claims(mut self, save: bool) -> Self {
        self.save_tokens_as_claims = save;
        self
    }

    pub fn with_state_ttl(mut self, ttl: Duration) -> Self {
        self.state_ttl = ttl;
        self
    }

    /// Full callback URL registered with the provider in leg 1.
    pub fn callback_url(&self) -> String {
        format!(
            "{}{}",
            self.callback_base.trim_end_matches('/'),
            self.callback_path
        )
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
