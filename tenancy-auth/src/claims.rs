//! JWT claims identifying a tenancy caller
//!
//! Standard RFC 7519 claims plus the profile fields the tenancy service
//! needs: an e-mail address (used as the invitation identifier) and a
//! display name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tenancy_org::Identity;
use uuid::Uuid;

/// Default issuer and audience when none is configured.
pub const DEFAULT_ISSUER: &str = "tenancy";

/// Identity claims.
///
/// # Example
///
/// ```rust
/// use tenancy_auth::IdentityClaims;
/// use uuid::Uuid;
///
/// let user_id = Uuid::now_v7();
/// let claims = IdentityClaims::new(user_id, chrono::Duration::hours(1))
///     .with_email("ada@example.com", true)
///     .with_name("Ada");
///
/// let identity = claims.to_identity(true).unwrap();
/// assert_eq!(identity.user_id, user_id);
/// assert_eq!(identity.identifier.as_deref(), Some("ada@example.com"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityClaims {
    // Standard JWT claims (RFC 7519)
    /// Subject (user ID)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: Vec<String>,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// JWT ID
    pub jti: String,

    // Profile claims
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub email_verified: bool,

    /// Anything else the issuer put in the token
    #[serde(default, flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl IdentityClaims {
    /// Claims for `user_id`, valid from now for `duration`.
    pub fn new(user_id: Uuid, duration: chrono::Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            iss: DEFAULT_ISSUER.to_string(),
            aud: vec![DEFAULT_ISSUER.to_string()],
            exp: (now + duration).timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::now_v7().to_string(),
            email: None,
            name: None,
            email_verified: false,
            custom: HashMap::new(),
        }
    }

    /// Get the user ID as UUID.
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    /// Check if the token is expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Get expiration as DateTime.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }

    pub fn with_email(mut self, email: impl Into<String>, verified: bool) -> Self {
        self.email = Some(email.into());
        self.email_verified = verified;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set issuer and audience.
    pub fn for_issuer(mut self, issuer: impl Into<String>, audience: Vec<String>) -> Self {
        self.iss = issuer.into();
        self.aud = audience;
        self
    }

    /// Caller identity carried by the claims.
    ///
    /// `None` when the subject is not a UUID. With `require_verified_email`
    /// an unverified e-mail is dropped rather than used as the identifier.
    pub fn to_identity(&self, require_verified_email: bool) -> Option<Identity> {
        let mut identity = Identity::new(self.user_id()?);
        if let Some(email) = &self.email {
            if self.email_verified || !require_verified_email {
                identity = identity.with_identifier(email.clone());
            }
        }
        if let Some(name) = &self.name {
            identity = identity.with_name(name.clone());
        }
        Some(identity)
    }
}
