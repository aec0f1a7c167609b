//! OAuth 1.0a request signing (HMAC-SHA1).
//!
//! Implements the canonical parameter string, the signature base string and
//! the `Authorization: OAuth ...` header described in RFC 5849. Signing is a
//! pure function of its inputs; nonce and timestamp generation live here too
//! so the backchannel client never has to think about them.

use crate::error::{Oauth1Error, Oauth1Result};
use base64::{Engine, engine::general_purpose::STANDARD, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::{Rng, thread_rng};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Percent-encode per the RFC 3986 unreserved set.
///
/// Stricter than form-urlencoding: space becomes `%20` and every byte outside
/// `A-Z a-z 0-9 - . _ ~` is escaped, which is what the signature base string
/// requires.
pub fn percent_encode(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Compute the OAuth 1.0a signature for a request.
///
/// Parameters are encoded, sorted by encoded key then encoded value, and
/// joined into the base string `METHOD&encoded_url&encoded_params`. The HMAC
/// key is `consumer_secret&token_secret`, with an empty token secret before a
/// token exists (leg 1).
pub fn sign(
    http_method: &str,
    base_url: &str,
    parameters: &[(String, String)],
    consumer_secret: &str,
    token_secret: Option<&str>,
) -> Oauth1Result<String> {
    if http_method.is_empty() {
        return Err(Oauth1Error::InvalidInput("empty HTTP method".to_string()));
    }
    if base_url.is_empty() {
        return Err(Oauth1Error::InvalidInput("empty base URL".to_string()));
    }

    let mut encoded: Vec<(String, String)> = parameters
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let parameter_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        http_method.to_uppercase(),
        percent_encode(base_url),
        percent_encode(&parameter_string)
    );

    let signing_key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or(""))
    );

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .map_err(|e| Oauth1Error::InvalidInput(format!("invalid signing key: {e}")))?;
    mac.update(base_string.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Render a signed `Authorization: OAuth ...` header value.
///
/// `oauth_params` must already contain the protocol parameters for the call
/// (`oauth_consumer_key`, `oauth_nonce`, timestamp, callback/token/verifier
/// as applicable); the signature is computed over them and appended.
pub fn authorization_header(
    http_method: &str,
    base_url: &str,
    oauth_params: &[(String, String)],
    consumer_secret: &str,
    token_secret: Option<&str>,
) -> Oauth1Result<String> {
    let signature = sign(
        http_method,
        base_url,
        oauth_params,
        consumer_secret,
        token_secret,
    )?;

    let mut header_params: Vec<(String, String)> = oauth_params.to_vec();
    header_params.push(("oauth_signature".to_string(), signature));
    header_params.sort();

    let rendered = header_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {}", rendered))
}

/// Base protocol parameters shared by every signed call.
pub(crate) fn base_oauth_params(consumer_key: &str) -> Vec<(String, String)> {
    vec![
        ("oauth_consumer_key".to_string(), consumer_key.to_string()),
        ("oauth_nonce".to_string(), generate_nonce()),
        (
            "oauth_signature_method".to_string(),
            "HMAC-SHA1".to_string(),
        ),
        (
            "oauth_timestamp".to_string(),
            chrono::Utc::now().timestamp().to_string(),
        ),
        ("oauth_version".to_string(), "1.0".to_string()),
    ]
}

fn generate_nonce() -> String {
    let mut rng = thread_rng();
    let bytes: Vec<u8> = (0..24).map(|_| rng.r#gen::<u8>()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}
