//! OAuth 1.0a (RFC 5849).
//!
//! [`signature`] signs individual requests; [`flow`] runs the three-legged
//! handshake that produces the access token those signatures use.

pub mod flow;
pub mod signature;

pub use flow::{AuthorizationError, AuthorizationFlow, AuthorizationState};
pub use signature::Signer;

use crate::store::Secret;

/// The application's consumer key and secret.
#[derive(Debug, Clone)]
pub struct Consumer {
    pub key: String,
    pub secret: Secret,
}

impl Consumer {
    pub fn new(key: impl Into<String>, secret: Secret) -> Self {
        Self {
            key: key.into(),
            secret,
        }
    }
}

/// Fresh `oauth_nonce` of `length` alphanumeric characters.
pub fn nonce(length: usize) -> String {
    use rand::Rng;
    use rand::distributions::Alphanumeric;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_is_alphanumeric_and_unique() {
        let first = nonce(32);

        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, nonce(32));
    }

    #[test]
    fn test_consumer_debug_hides_secret() {
        let consumer = Consumer::new("dpf43f3p2l4k3l03", Secret::new("kd94hf93k423kf44"));
        let debug = format!("{:?}", consumer);
        assert!(debug.contains("dpf43f3p2l4k3l03"));
        assert!(!debug.contains("kd94hf93k423kf44"));
    }
}
