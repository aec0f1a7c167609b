//! Signed server-to-server calls to the OAuth 1.0a provider.

use crate::config::Oauth1Config;
use crate::error::{Oauth1Error, Oauth1Result};
use crate::signature::{authorization_header, base_oauth_params};
use crate::types::{AccessToken, RequestToken, UserProfile};
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Backchannel client for the request-token and access-token legs.
///
/// Every call is a single attempt bounded by the configured timeout; request
/// tokens are single-use, so a blind retry here could burn a token the first
/// attempt already consumed.
#[derive(Clone)]
pub struct BackchannelClient {
    http_client: Client,
    config: Arc<Oauth1Config>,
}

impl BackchannelClient {
    pub fn new(config: Arc<Oauth1Config>) -> Oauth1Result<Self> {
        let http_client = Client::builder()
            .timeout(config.backchannel_timeout)
            .build()
            .map_err(|e| Oauth1Error::ConfigError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Use a caller-supplied transport instead of the default one. The
    /// supplied client is expected to carry its own timeout policy.
    pub fn with_http_client(config: Arc<Oauth1Config>, http_client: Client) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// Leg 1: obtain a request token, registering the callback URL.
    pub async fn request_token(&self, callback_url: &str) -> Oauth1Result<RequestToken> {
        let mut oauth_params = base_oauth_params(&self.config.consumer_key);
        oauth_params.push(("oauth_callback".to_string(), callback_url.to_string()));

        let header = authorization_header(
            "POST",
            &self.config.request_token_endpoint,
            &oauth_params,
            &self.config.consumer_secret,
            None,
        )?;

        let response = self
            .http_client
            .post(&self.config.request_token_endpoint)
            .header(reqwest::header::AUTHORIZATION, header)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Request token call rejected by provider");
            return Err(Oauth1Error::BackchannelError(format!(
                "request token endpoint returned {status}: {body}"
            )));
        }

        let body = response.text().await?;
        let token = RequestToken::from_form_body(&body)?;

        if !token.callback_confirmed {
            return Err(Oauth1Error::RequestTokenFailed(
                "provider did not confirm the callback".to_string(),
            ));
        }

        debug!("Obtained request token");
        Ok(token)
    }

    /// Leg 3: redeem the request token and verifier for an access token.
    pub async fn exchange_token(
        &self,
        token: &str,
        token_secret: &str,
        verifier: &str,
    ) -> Oauth1Result<AccessToken> {
        let mut oauth_params = base_oauth_params(&self.config.consumer_key);
        oauth_params.push(("oauth_token".to_string(), token.to_string()));
        oauth_params.push(("oauth_verifier".to_string(), verifier.to_string()));

        let header = authorization_header(
            "POST",
            &self.config.access_token_endpoint,
            &oauth_params,
            &self.config.consumer_secret,
            Some(token_secret),
        )?;

        let response = self
            .http_client
            .post(&self.config.access_token_endpoint)
            .header(reqwest::header::AUTHORIZATION, header)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Token exchange rejected by provider");
            return Err(Oauth1Error::TokenExchangeFailed(format!(
                "access token endpoint returned {status}: {body}"
            )));
        }

        let body = response.text().await?;
        let access_token = AccessToken::from_form_body(&body)?;

        info!("Exchanged verifier for access token");
        Ok(access_token)
    }

    /// Optional profile fetch for providers that expose identity via a
    /// separate signed call.
    pub async fn fetch_user_identity(
        &self,
        access_token: &AccessToken,
    ) -> Oauth1Result<UserProfile> {
        let endpoint = self.config.user_identity_endpoint.as_ref().ok_or_else(|| {
            Oauth1Error::ConfigError("user identity endpoint not configured".to_string())
        })?;

        let mut oauth_params = base_oauth_params(&self.config.consumer_key);
        oauth_params.push(("oauth_token".to_string(), access_token.token.clone()));

        let header = authorization_header(
            "GET",
            endpoint,
            &oauth_params,
            &self.config.consumer_secret,
            Some(&access_token.token_secret),
        )?;

        let response = self
            .http_client
            .get(endpoint)
            .header(reqwest::header::AUTHORIZATION, header)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, "User identity call rejected by provider");
            return Err(Oauth1Error::UserIdentityFailed(format!(
                "user identity endpoint returned {status}: {body}"
            )));
        }

        let profile: UserProfile = response
            .json()
            .await
            .map_err(|e| Oauth1Error::BackchannelError(format!("malformed profile body: {e}")))?;

        debug!(subject = %profile.id_str, "Fetched user identity");
        Ok(profile)
    }
}
