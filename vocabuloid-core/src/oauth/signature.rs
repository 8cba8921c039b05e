//! HMAC-SHA1 request signing (RFC 5849 section 3.4).
//!
//! Every signed request carries an `Authorization: OAuth ...` header built
//! from the consumer key, an optional token, a fresh nonce and timestamp, and
//! the signature over the normalized request.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;
use url::Url;

use super::Consumer;
use crate::credentials::TokenPair;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay literal; everything else is encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";
const NONCE_LENGTH: usize = 32;

/// Percent-encode a value the way OAuth 1.0a requires.
pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Signs requests for one consumer and, optionally, one token.
#[derive(Debug, Clone, Copy)]
pub struct Signer<'a> {
    consumer: &'a Consumer,
    token: Option<&'a TokenPair>,
}

impl<'a> Signer<'a> {
    pub fn new(consumer: &'a Consumer, token: Option<&'a TokenPair>) -> Self {
        Self { consumer, token }
    }

    /// Build the `Authorization` header value for a request.
    ///
    /// `extra` holds additional protocol parameters such as `oauth_callback`
    /// or `oauth_verifier`. Query parameters of `url` are included in the
    /// signature.
    pub fn authorization_header(&self, method: &str, url: &Url, extra: &[(&str, &str)]) -> String {
        let nonce = super::nonce(NONCE_LENGTH);
        let timestamp = chrono::Utc::now().timestamp();
        self.authorization_header_with(method, url, extra, &nonce, timestamp)
    }

    /// Same as [`authorization_header`](Self::authorization_header) with a
    /// fixed nonce and timestamp.
    pub fn authorization_header_with(
        &self,
        method: &str,
        url: &Url,
        extra: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> String {
        let mut params = self.protocol_params(extra, nonce, timestamp);
        let base = signature_base_string(method, url, &params);
        params.push(("oauth_signature".to_string(), self.sign(&base)));

        let fields: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();

        format!("OAuth {}", fields.join(", "))
    }

    /// Compute the base64 HMAC-SHA1 signature of a base string.
    pub fn sign(&self, base_string: &str) -> String {
        let token_secret = self.token.map(|t| t.secret.expose()).unwrap_or("");
        let key = format!("{}&{}", encode(self.consumer.secret.expose()), encode(token_secret));

        let mut mac =
            HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
        mac.update(base_string.as_bytes());

        BASE64.encode(mac.finalize().into_bytes())
    }

    fn protocol_params(
        &self,
        extra: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> Vec<(String, String)> {
        let mut params = vec![
            ("oauth_consumer_key".to_string(), self.consumer.key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
        ];

        if let Some(token) = self.token {
            params.push(("oauth_token".to_string(), token.token.expose().to_string()));
        }

        params.push(("oauth_version".to_string(), OAUTH_VERSION.to_string()));
        params.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        params
    }
}

/// Build the signature base string for a request.
///
/// `protocol_params` are the `oauth_*` parameters (without the signature);
/// query parameters are read from `url`.
pub fn signature_base_string(method: &str, url: &Url, protocol_params: &[(String, String)]) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (encode(&k), encode(&v)))
        .chain(protocol_params.iter().map(|(k, v)| (encode(k), encode(v))))
        .collect();
    pairs.sort();

    let normalized: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(&base_string_uri(url)),
        encode(&normalized.join("&"))
    )
}

/// Scheme, host, non-default port and path; no query or fragment.
fn base_string_uri(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    match url.port() {
        Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
        None => format!("{}://{}{}", url.scheme(), host, url.path()),
    }
}
