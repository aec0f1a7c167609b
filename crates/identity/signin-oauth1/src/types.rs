//! OAuth 1.0a protocol types.

use crate::error::{Oauth1Error, Oauth1Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Temporary credential issued by the provider in leg 1.
///
/// Lives for a single handshake attempt; the secret is needed once more to
/// sign the access-token exchange in leg 3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestToken {
    pub token: String,
    pub token_secret: String,
    pub callback_confirmed: bool,
}

/// Token credential issued by the provider at the end of leg 3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub token_secret: String,
    pub user_id: String,
    pub screen_name: String,
}

/// Profile data from an optional verify-credentials call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id_str: String,
    pub screen_name: String,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(flatten)]
    pub additional_fields: HashMap<String, serde_json::Value>,
}

/// Query parameters the provider appends when redirecting back to the
/// callback path, plus the round-tripped handshake state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackParams {
    pub oauth_token: String,
    pub oauth_verifier: Option<String>,
    pub state: String,
}

/// Parse a form-encoded token-endpoint response body into a key/value map.
pub(crate) fn parse_form_body(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

impl RequestToken {
    /// Parse the leg-1 response body
    /// (`oauth_token=..&oauth_token_secret=..&oauth_callback_confirmed=true`).
    pub(crate) fn from_form_body(body: &str) -> Oauth1Result<Self> {
        let fields = parse_form_body(body);

        let token = fields
            .get("oauth_token")
            .cloned()
            .ok_or_else(|| Oauth1Error::BackchannelError("missing oauth_token".to_string()))?;
        let token_secret = fields.get("oauth_token_secret").cloned().ok_or_else(|| {
            Oauth1Error::BackchannelError("missing oauth_token_secret".to_string())
        })?;
        let callback_confirmed = fields
            .get("oauth_callback_confirmed")
            .map(|v| v == "true")
            .unwrap_or(false);

        Ok(Self {
            token,
            token_secret,
            callback_confirmed,
        })
    }
}

impl AccessToken {
    /// Parse the leg-3 response body
    /// (`oauth_token=..&oauth_token_secret=..&user_id=..&screen_name=..`).
    pub(crate) fn from_form_body(body: &str) -> Oauth1Result<Self> {
        let fields = parse_form_body(body);

        let token = fields
            .get("oauth_token")
            .cloned()
            .ok_or_else(|| Oauth1Error::BackchannelError("missing oauth_token".to_string()))?;
        let token_secret = fields.get("oauth_token_secret").cloned().ok_or_else(|| {
            Oauth1Error::BackchannelError("missing oauth_token_secret".to_string())
        })?;
        let user_id = fields.get("user_id").cloned().unwrap_or_default();
        let screen_name = fields.get("screen_name").cloned().unwrap_or_default();

        Ok(Self {
            token,
            token_secret,
            user_id,
            screen_name,
        })
    }
}
