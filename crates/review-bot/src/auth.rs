//! Webhook authentication tokens
//!
//! GitLab echoes a per-hook secret back in `X-Gitlab-Token`. The bot accepts
//! either the shared secret itself or a token bound to one repository:
//!
//! ```text
//! token     = base64url(json{ slug, created_at, signature })
//! signature = hex(hmac_sha256(secret, slug ‖ unix(created_at)))
//! ```
//!
//! A bound token only authorizes deliveries for the repository named by its
//! slug, so a leaked token cannot be replayed against other projects.

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("namespace and name must not be blank")]
    BlankSlug,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token signature mismatch")]
    InvalidSignature,
}

/// Decoded repository-bound token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedToken {
    /// `namespace/name` of the repository the token is bound to
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub signature: String,
}

/// How a delivery proved its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// The shared secret, valid for every repository
    SharedSecret,
    /// A token bound to one repository
    Repository(String),
}

impl Credential {
    /// Whether the credential covers `project`
    pub fn allows(&self, project: &str) -> bool {
        match self {
            Self::SharedSecret => true,
            Self::Repository(slug) => slug == project,
        }
    }

    /// Repository a bound token is restricted to
    pub fn slug(&self) -> Option<&str> {
        match self {
            Self::SharedSecret => None,
            Self::Repository(slug) => Some(slug),
        }
    }
}

type HmacSha256 = Hmac<Sha256>;

fn keyed_mac(
    secret: &str,
    slug: &str,
    created_at: DateTime<Utc>,
) -> Result<HmacSha256, TokenError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::InvalidSignature)?;
    mac.update(slug.as_bytes());
    mac.update(created_at.timestamp().to_string().as_bytes());
    Ok(mac)
}

/// Hex HMAC-SHA256 binding `slug` and `created_at` to the secret
pub fn signature(
    secret: &str,
    slug: &str,
    created_at: DateTime<Utc>,
) -> Result<String, TokenError> {
    let mac = keyed_mac(secret, slug, created_at)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

/// Issue a token bound to `namespace/name`
pub fn issue_token(
    namespace: &str,
    name: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    let (namespace, name) = (namespace.trim(), name.trim());
    if namespace.is_empty() || name.is_empty() {
        return Err(TokenError::BlankSlug);
    }

    let slug = format!("{}/{}", namespace, name);
    let token = SignedToken {
        signature: signature(secret, &slug, now)?,
        slug,
        created_at: now,
    };
    let json = serde_json::to_vec(&token).map_err(|e| TokenError::Malformed(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decode a token and check its signature
pub fn verify_token(token: &str, secret: &str) -> Result<SignedToken, TokenError> {
    let token = token.trim();
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .or_else(|_| URL_SAFE.decode(token))
        .map_err(|e| TokenError::Malformed(e.to_string()))?;
    let decoded: SignedToken =
        serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(e.to_string()))?;

    let claimed = hex::decode(&decoded.signature).map_err(|_| TokenError::InvalidSignature)?;
    keyed_mac(secret, &decoded.slug, decoded.created_at)?
        .verify_slice(&claimed)
        .map_err(|_| TokenError::InvalidSignature)?;
    Ok(decoded)
}

/// Check the `X-Gitlab-Token` value against the configured secret
///
/// An empty secret never authenticates anything.
pub fn authenticate(header: &str, secret: &str) -> Result<Credential, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::InvalidSignature);
    }
    if constant_time_eq(header, secret) {
        return Ok(Credential::SharedSecret);
    }
    verify_token(header, secret).map(|token| Credential::Repository(token.slug))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "hook-secret";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let token = issue_token("group", "repo", SECRET, now()).unwrap();
        assert!(!token.contains('='));

        let decoded = verify_token(&token, SECRET).unwrap();
        assert_eq!(decoded.slug, "group/repo");
        assert_eq!(decoded.created_at, now());
        assert_eq!(decoded.signature.len(), 64);
    }

    #[test]
    fn test_issue_rejects_blank_slug() {
        assert_eq!(
            issue_token("  ", "repo", SECRET, now()),
            Err(TokenError::BlankSlug)
        );
        assert_eq!(
            issue_token("group", "", SECRET, now()),
            Err(TokenError::BlankSlug)
        );
    }

    #[test]
    fn test_signature_depends_on_every_input() {
        let sign = |secret: &str, slug: &str, at| signature(secret, slug, at).unwrap();
        let base = sign(SECRET, "group/repo", now());
        assert_ne!(base, sign("other", "group/repo", now()));
        assert_ne!(base, sign(SECRET, "group/other", now()));
        let later = now() + chrono::Duration::seconds(1);
        assert_ne!(base, sign(SECRET, "group/repo", later));
    }

    #[test]
    fn test_signature_is_hmac_sha256() {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(b"group/repo");
        mac.update(now().timestamp().to_string().as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        assert_eq!(signature(SECRET, "group/repo", now()).unwrap(), expected);
    }

    #[test]
    fn test_non_hex_signature_is_rejected() {
        let token = issue_token("group", "repo", SECRET, now()).unwrap();
        let mut decoded = verify_token(&token, SECRET).unwrap();
        decoded.signature = "not-hex".to_string();
        let forged = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&decoded).unwrap());

        assert_eq!(
            verify_token(&forged, SECRET),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue_token("group", "repo", SECRET, now()).unwrap();
        assert_eq!(
            verify_token(&token, "other-secret"),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_slug_is_rejected() {
        let token = issue_token("group", "repo", SECRET, now()).unwrap();
        let mut decoded = verify_token(&token, SECRET).unwrap();
        decoded.slug = "group/other".to_string();
        let forged = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&decoded).unwrap());

        assert_eq!(
            verify_token(&forged, SECRET),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(matches!(
            verify_token("%%% not base64 %%%", SECRET),
            Err(TokenError::Malformed(_))
        ));
        let not_json = URL_SAFE_NO_PAD.encode(b"hello");
        assert!(matches!(
            verify_token(&not_json, SECRET),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_padded_token_is_accepted() {
        let token = issue_token("group", "repo", SECRET, now()).unwrap();
        let bytes = URL_SAFE_NO_PAD.decode(&token).unwrap();
        let padded = URL_SAFE.encode(bytes);
        assert!(verify_token(&padded, SECRET).is_ok());
    }

    #[test]
    fn test_authenticate() {
        assert_eq!(authenticate(SECRET, SECRET), Ok(Credential::SharedSecret));

        let token = issue_token("group", "repo", SECRET, now()).unwrap();
        let credential = authenticate(&token, SECRET).unwrap();
        assert!(credential.allows("group/repo"));
        assert!(!credential.allows("group/other"));
        assert!(Credential::SharedSecret.allows("anything/at-all"));

        assert!(authenticate("", "").is_err());
        assert!(authenticate(&token, "").is_err());
    }
}
