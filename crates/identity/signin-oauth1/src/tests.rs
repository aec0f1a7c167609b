//! Integration and security tests for the OAuth 1.0a handshake.

#[cfg(test)]
mod integration_tests {
    use crate::state::HandshakeState;
    use crate::{
        AbortReason, CallbackParams, FailureContext, HandshakeEvents, HookOutcome, Oauth1Config,
        Oauth1Error, Oauth1Provider, RedirectContext, SealedStateCodec, StateCodec, TicketContext,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> Oauth1Config {
        Oauth1Config::new("CK", "CS")
            .with_endpoints(
                format!("{}/oauth/request_token", server.uri()),
                format!("{}/oauth/authenticate", server.uri()),
                format!("{}/oauth/access_token", server.uri()),
            )
            .with_callback("https://app.example.com", "/signin-twitter")
            .with_backchannel_timeout(Duration::from_millis(250))
    }

    async fn setup(config: Oauth1Config) -> (Oauth1Provider, Arc<SealedStateCodec>) {
        let codec = Arc::new(SealedStateCodec::new(&SealedStateCodec::generate_key()).unwrap());
        let provider = Oauth1Provider::new(config, codec.clone()).unwrap();
        (provider, codec)
    }

    async fn mount_request_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/oauth/request_token"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "oauth_token=RT1&oauth_token_secret=S1&oauth_callback_confirmed=true",
            ))
            .mount(server)
            .await;
    }

    async fn mount_access_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/oauth/access_token"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "oauth_token=AT1&oauth_token_secret=S2&user_id=42&screen_name=alice",
            ))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn full_handshake_emits_identity_claims() {
        let server = MockServer::start().await;
        mount_request_token(&server).await;
        mount_access_token(&server).await;

        let (provider, _) = setup(test_config(&server)).await;

        let redirect = provider.start_sign_in("/dashboard").await.unwrap();
        assert!(redirect.authorization_url.contains("/oauth/authenticate"));
        assert!(redirect.authorization_url.contains("oauth_token=RT1"));
        assert!(!redirect.state.is_empty());

        let ticket = provider
            .complete_sign_in(CallbackParams {
                oauth_token: "RT1".to_string(),
                oauth_verifier: Some("V1".to_string()),
                state: redirect.state,
            })
            .await
            .unwrap();

        assert_eq!(ticket.redirect_target, "/dashboard");
        assert_eq!(ticket.identity.subject, "42");
        assert_eq!(ticket.identity.claim("user_id"), Some("42"));
        assert_eq!(ticket.identity.claim("screen_name"), Some("alice"));
        // Tokens stay out of the claims unless explicitly enabled.
        assert_eq!(ticket.identity.claim("access_token"), None);
    }

    #[tokio::test]
    async fn tokens_are_saved_as_claims_when_enabled() {
        let server = MockServer::start().await;
        mount_request_token(&server).await;
        mount_access_token(&server).await;

        let (provider, _) =
            setup(test_config(&server).with_save_tokens_as_claims(true)).await;

        let redirect = provider.start_sign_in("/").await.unwrap();
        let ticket = provider
            .complete_sign_in(CallbackParams {
                oauth_token: "RT1".to_string(),
                oauth_verifier: Some("V1".to_string()),
                state: redirect.state,
            })
            .await
            .unwrap();

        assert_eq!(ticket.identity.claim("access_token"), Some("AT1"));
        assert_eq!(ticket.identity.claim("access_token_secret"), Some("S2"));
    }

    #[tokio::test]
    async fn expired_state_aborts_without_touching_the_token_endpoint() {
        let server = MockServer::start().await;

        // The exchange must never be attempted for already-invalid state.
        Mock::given(method("POST"))
            .and(path("/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (provider, codec) = setup(test_config(&server)).await;

        let mut state = HandshakeState::new("RT1", "S1", "/", Duration::from_secs(300));
        state.expires_at = chrono::Utc::now() - chrono::Duration::minutes(1);
        let sealed = codec.encode(&state).unwrap();

        let result = provider
            .complete_sign_in(CallbackParams {
                oauth_token: "RT1".to_string(),
                oauth_verifier: Some("V1".to_string()),
                state: sealed,
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, Oauth1Error::ExpiredState));
        assert_eq!(err.abort_reason(), AbortReason::InvalidCallback);
    }

    #[tokio::test]
    async fn mismatched_token_aborts_without_touching_the_token_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (provider, codec) = setup(test_config(&server)).await;

        let state = HandshakeState::new("RT1", "S1", "/", Duration::from_secs(300));
        let sealed = codec.encode(&state).unwrap();

        let result = provider
            .complete_sign_in(CallbackParams {
                oauth_token: "SOMEONE_ELSES_TOKEN".to_string(),
                oauth_verifier: Some("V1".to_string()),
                state: sealed,
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, Oauth1Error::InvalidCallback(_)));
        assert_eq!(err.abort_reason(), AbortReason::InvalidCallback);
    }

    #[tokio::test]
    async fn forged_state_aborts_as_invalid_callback() {
        let server = MockServer::start().await;
        let (provider, _) = setup(test_config(&server)).await;

        let result = provider
            .complete_sign_in(CallbackParams {
                oauth_token: "RT1".to_string(),
                oauth_verifier: Some("V1".to_string()),
                state: "forged-by-an-attacker".to_string(),
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, Oauth1Error::InvalidState));
        assert_eq!(err.abort_reason(), AbortReason::InvalidCallback);
    }

    #[tokio::test]
    async fn missing_verifier_aborts_as_invalid_callback() {
        let server = MockServer::start().await;
        let (provider, codec) = setup(test_config(&server)).await;

        let state = HandshakeState::new("RT1", "S1", "/", Duration::from_secs(300));
        let sealed = codec.encode(&state).unwrap();

        let result = provider
            .complete_sign_in(CallbackParams {
                oauth_token: "RT1".to_string(),
                oauth_verifier: None,
                state: sealed,
            })
            .await;

        assert!(matches!(result, Err(Oauth1Error::InvalidCallback(_))));
    }

    struct RecordingEvents {
        failures: Mutex<Vec<AbortReason>>,
    }

    impl HandshakeEvents for RecordingEvents {
        fn handshake_failed(&self, ctx: &FailureContext) {
            self.failures.lock().unwrap().push(ctx.reason);
        }
    }

    #[tokio::test]
    async fn timed_out_request_token_aborts_with_single_attempt() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/request_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(5))
                    .set_body_string(
                        "oauth_token=RT1&oauth_token_secret=S1&oauth_callback_confirmed=true",
                    ),
            )
            .expect(1)
            .mount(&server)
            .await;

        let events = Arc::new(RecordingEvents {
            failures: Mutex::new(Vec::new()),
        });
        let (provider, _) = setup(test_config(&server)).await;
        let provider = provider.with_events(events.clone());

        let result = provider.start_sign_in("/").await;

        assert!(matches!(result, Err(Oauth1Error::BackchannelTimeout)));
        assert_eq!(
            events.failures.lock().unwrap().as_slice(),
            &[AbortReason::BackchannelTimeout]
        );
    }

    struct RewritingEvents;

    impl HandshakeEvents for RewritingEvents {
        fn redirecting_to_provider(&self, ctx: &mut RedirectContext) -> HookOutcome {
            ctx.authorization_url = format!("{}&screen_name=hint", ctx.authorization_url);
            HookOutcome::Continue
        }
    }

    #[tokio::test]
    async fn pre_redirect_hook_may_rewrite_the_destination() {
        let server = MockServer::start().await;
        mount_request_token(&server).await;

        let (provider, _) = setup(test_config(&server)).await;
        let provider = provider.with_events(Arc::new(RewritingEvents));

        let redirect = provider.start_sign_in("/").await.unwrap();
        assert!(redirect.authorization_url.ends_with("&screen_name=hint"));
    }

    struct VetoingEvents;

    impl HandshakeEvents for VetoingEvents {
        fn ticket_created(&self, _ctx: &mut TicketContext) -> HookOutcome {
            HookOutcome::Abort("account suspended".to_string())
        }
    }

    #[tokio::test]
    async fn ticket_hook_may_veto_the_handshake() {
        let server = MockServer::start().await;
        mount_request_token(&server).await;
        mount_access_token(&server).await;

        let (provider, _) = setup(test_config(&server)).await;
        let provider = provider.with_events(Arc::new(VetoingEvents));

        let redirect = provider.start_sign_in("/").await.unwrap();
        let result = provider
            .complete_sign_in(CallbackParams {
                oauth_token: "RT1".to_string(),
                oauth_verifier: Some("V1".to_string()),
                state: redirect.state,
            })
            .await;

        match result {
            Err(Oauth1Error::HookAborted(reason)) => assert_eq!(reason, "account suspended"),
            other => panic!("expected HookAborted, got {other:?}"),
        }
    }

    struct AugmentingEvents;

    impl HandshakeEvents for AugmentingEvents {
        fn ticket_created(&self, ctx: &mut TicketContext) -> HookOutcome {
            ctx.identity
                .claims
                .insert("role".to_string(), "member".to_string());
            HookOutcome::Continue
        }
    }

    #[tokio::test]
    async fn ticket_hook_may_augment_claims() {
        let server = MockServer::start().await;
        mount_request_token(&server).await;
        mount_access_token(&server).await;

        let (provider, _) = setup(test_config(&server)).await;
        let provider = provider.with_events(Arc::new(AugmentingEvents));

        let redirect = provider.start_sign_in("/").await.unwrap();
        let ticket = provider
            .complete_sign_in(CallbackParams {
                oauth_token: "RT1".to_string(),
                oauth_verifier: Some("V1".to_string()),
                state: redirect.state,
            })
            .await
            .unwrap();

        assert_eq!(ticket.identity.claim("role"), Some("member"));
    }

    #[tokio::test]
    async fn profile_fetch_enriches_the_identity() {
        let server = MockServer::start().await;
        mount_request_token(&server).await;
        mount_access_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/1.1/account/verify_credentials.json"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id_str": "42",
                "screen_name": "alice",
                "name": "Alice Example",
                "email": "alice@example.com"
            })))
            .mount(&server)
            .await;

        let config = test_config(&server).with_user_identity_endpoint(format!(
            "{}/1.1/account/verify_credentials.json",
            server.uri()
        ));
        let (provider, _) = setup(config).await;

        let redirect = provider.start_sign_in("/").await.unwrap();
        let ticket = provider
            .complete_sign_in(CallbackParams {
                oauth_token: "RT1".to_string(),
                oauth_verifier: Some("V1".to_string()),
                state: redirect.state,
            })
            .await
            .unwrap();

        assert_eq!(ticket.identity.claim("email"), Some("alice@example.com"));
        assert_eq!(
            ticket.identity.display_name,
            Some("Alice Example".to_string())
        );
    }

    #[tokio::test]
    async fn state_blob_is_single_use_only_with_its_own_token() {
        // Two concurrent handshakes must not be able to swap callbacks.
        let server = MockServer::start().await;
        mount_request_token(&server).await;
        mount_access_token(&server).await;

        let (provider, codec) = setup(test_config(&server)).await;

        // A second handshake's state, minted for a different request token.
        let other_state = HandshakeState::new("RT2", "S9", "/", Duration::from_secs(300));
        let other_sealed = codec.encode(&other_state).unwrap();

        let result = provider
            .complete_sign_in(CallbackParams {
                oauth_token: "RT1".to_string(),
                oauth_verifier: Some("V1".to_string()),
                state: other_sealed,
            })
            .await;

        assert!(matches!(result, Err(Oauth1Error::InvalidCallback(_))));
    }

    mod identity_provider_entry_point {
        use super::*;
        use crate::{IdentityProvider, Oauth1Response};
        use signin_core::IdentityError;

        #[tokio::test]
        async fn start_payload_surfaces_the_redirect() {
            let server = MockServer::start().await;
            mount_request_token(&server).await;
            let (provider, _) = setup(test_config(&server)).await;

            let payload = serde_json::json!({
                "type": "StartSignIn",
                "redirect_target": "/dashboard"
            });

            let result = provider.verify(payload).await;
            let Err(IdentityError::ProviderError(json)) = result else {
                panic!("expected provider error carrying the redirect");
            };

            let response: Oauth1Response = serde_json::from_str(&json).unwrap();
            match response {
                Oauth1Response::Redirect {
                    authorization_url,
                    state,
                } => {
                    assert!(authorization_url.contains("oauth_token=RT1"));
                    assert!(!state.is_empty());
                }
                _ => panic!("expected redirect response"),
            }
        }

        #[tokio::test]
        async fn callback_payload_yields_the_identity() {
            let server = MockServer::start().await;
            mount_request_token(&server).await;
            mount_access_token(&server).await;
            let (provider, _) = setup(test_config(&server)).await;

            let redirect = provider.start_sign_in("/").await.unwrap();

            let payload = serde_json::json!({
                "type": "Callback",
                "oauth_token": "RT1",
                "oauth_verifier": "V1",
                "state": redirect.state
            });

            let identity = provider.verify(payload).await.unwrap();
            assert_eq!(identity.provider_id, "oauth1");
            assert_eq!(identity.subject, "42");
        }
    }
}
