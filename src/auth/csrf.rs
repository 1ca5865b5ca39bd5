//! CSRF tokens bound to a session and a namespace.
//!
//! Every rendered admin form carries a token minted by [`TokenService::generate`];
//! every state-changing submission must present it back. Tokens are single-use:
//! checking one removes it from the session.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::error::InvalidTokenError;
use crate::session::Session;

/// Namespace used for all admin forms.
pub const ADMIN_TOKEN_NAMESPACE: &str = "baun-admin";

/// Form field carrying the token.
pub const TOKEN_FIELD: &str = "token";

const TOKEN_LENGTH: usize = 32;

/// Token as stored in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfToken {
    pub value: String,
    pub issued_at: DateTime<Utc>,
}

/// Mints and verifies CSRF tokens.
#[derive(Debug, Clone, Default)]
pub struct TokenService {
    /// Tokens older than this are rejected. `None` disables the age check.
    max_age: Option<Duration>,
}

impl TokenService {
    pub fn new(max_age: Option<Duration>) -> Self {
        Self { max_age }
    }

    /// Mint a fresh token for `namespace`, replacing any previous one.
    pub fn generate(&self, session: &mut Session, namespace: &str) -> String {
        let value: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();

        session.set_token(
            namespace,
            CsrfToken {
                value: value.clone(),
                issued_at: Utc::now(),
            },
        );
        value
    }

    /// Verify `presented` against the session's token for `namespace`.
    ///
    /// The stored token is consumed regardless of the result.
    pub fn check(
        &self,
        session: &mut Session,
        namespace: &str,
        presented: &str,
    ) -> Result<(), InvalidTokenError> {
        let invalid = || InvalidTokenError {
            namespace: namespace.to_string(),
        };

        let stored = session.take_token(namespace).ok_or_else(invalid)?;

        let matches: bool = stored.value.as_bytes().ct_eq(presented.as_bytes()).into();
        if presented.is_empty() || !matches {
            return Err(invalid());
        }

        if let Some(max_age) = self.max_age {
            if Utc::now() - stored.issued_at > max_age {
                tracing::debug!(namespace, "CSRF token expired");
                return Err(invalid());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_checks() {
        let service = TokenService::default();
        let mut session = Session::new();

        let token = service.generate(&mut session, ADMIN_TOKEN_NAMESPACE);
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(service.check(&mut session, ADMIN_TOKEN_NAMESPACE, &token).is_ok());
    }

    #[test]
    fn test_wrong_token_fails() {
        let service = TokenService::default();
        let mut session = Session::new();

        let token = service.generate(&mut session, ADMIN_TOKEN_NAMESPACE);
        let wrong = format!("{}x", &token[1..]);
        let err = service
            .check(&mut session, ADMIN_TOKEN_NAMESPACE, &wrong)
            .unwrap_err();
        assert_eq!(err.namespace, ADMIN_TOKEN_NAMESPACE);
    }

    #[test]
    fn test_empty_token_fails() {
        let service = TokenService::default();
        let mut session = Session::new();

        service.generate(&mut session, ADMIN_TOKEN_NAMESPACE);
        assert!(service.check(&mut session, ADMIN_TOKEN_NAMESPACE, "").is_err());
    }

    #[test]
    fn test_missing_token_fails() {
        let service = TokenService::default();
        let mut session = Session::new();
        assert!(service.check(&mut session, ADMIN_TOKEN_NAMESPACE, "anything").is_err());
    }

    #[test]
    fn test_only_latest_token_is_valid() {
        let service = TokenService::default();
        let mut session = Session::new();

        let first = service.generate(&mut session, ADMIN_TOKEN_NAMESPACE);
        let second = service.generate(&mut session, ADMIN_TOKEN_NAMESPACE);
        assert_ne!(first, second);
        assert!(service.check(&mut session, ADMIN_TOKEN_NAMESPACE, &first).is_err());

        let third = service.generate(&mut session, ADMIN_TOKEN_NAMESPACE);
        assert!(service.check(&mut session, ADMIN_TOKEN_NAMESPACE, &third).is_ok());
    }

    #[test]
    fn test_token_is_single_use() {
        let service = TokenService::default();
        let mut session = Session::new();

        let token = service.generate(&mut session, ADMIN_TOKEN_NAMESPACE);
        assert!(service.check(&mut session, ADMIN_TOKEN_NAMESPACE, &token).is_ok());
        assert!(service.check(&mut session, ADMIN_TOKEN_NAMESPACE, &token).is_err());
    }

    #[test]
    fn test_namespaces_are_independent() {
        let service = TokenService::default();
        let mut session = Session::new();

        let admin = service.generate(&mut session, ADMIN_TOKEN_NAMESPACE);
        let other = service.generate(&mut session, "other");
        assert!(service.check(&mut session, "other", &admin).is_err());
        assert!(service.check(&mut session, ADMIN_TOKEN_NAMESPACE, &admin).is_ok());
        assert_ne!(admin, other);
    }

    #[test]
    fn test_token_from_another_session_fails() {
        let service = TokenService::default();
        let mut alice = Session::new();
        let mut bob = Session::new();

        let token = service.generate(&mut alice, ADMIN_TOKEN_NAMESPACE);
        service.generate(&mut bob, ADMIN_TOKEN_NAMESPACE);
        assert!(service.check(&mut bob, ADMIN_TOKEN_NAMESPACE, &token).is_err());
    }

    #[test]
    fn test_expired_token_fails() {
        let service = TokenService::new(Some(Duration::seconds(60)));
        let mut session = Session::new();

        session.set_token(
            ADMIN_TOKEN_NAMESPACE,
            CsrfToken {
                value: "old-token".to_string(),
                issued_at: Utc::now() - Duration::seconds(120),
            },
        );
        assert!(service.check(&mut session, ADMIN_TOKEN_NAMESPACE, "old-token").is_err());
    }

    #[test]
    fn test_token_prefix_fails() {
        let service = TokenService::default();
        let mut session = Session::new();

        let token = service.generate(&mut session, ADMIN_TOKEN_NAMESPACE);
        assert!(service.check(&mut session, ADMIN_TOKEN_NAMESPACE, &token[..16]).is_err());
    }
}
