//! Caller identity and profile lookup.
//!
//! Authentication is not performed here. A binding layer supplies an
//! [`IdentityResolver`] that turns a [`RequestContext`] into an [`Identity`],
//! and optionally a [`ProfileResolver`] used to enrich member listings and to
//! find a caller's e-mail when the identity carries none.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-request data handed to the service by the binding layer.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Raw bearer credential, if any
    pub bearer_token: Option<String>,
    /// Propagated into logs
    pub correlation_id: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(token.into()),
            correlation_id: None,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    /// Verified identifier (usually an e-mail address)
    pub identifier: Option<String>,
    pub name: Option<String>,
}

impl Identity {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            identifier: None,
            name: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Resolves the caller of a request; `None` means unauthenticated.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, ctx: &RequestContext) -> Option<Identity>;
}

/// Display profile of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Looks up display profiles.
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    async fn profile(&self, user_id: Uuid) -> Option<Profile>;
}

/// Profile resolver that knows nobody.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProfiles;

#[async_trait]
impl ProfileResolver for NoProfiles {
    async fn profile(&self, _user_id: Uuid) -> Option<Profile> {
        None
    }
}

/// A value paired with the profile of the user it refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithProfile<T> {
    #[serde(flatten)]
    pub item: T,
    pub profile: Option<Profile>,
}
