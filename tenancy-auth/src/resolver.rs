//! Bearer-token identity resolution for the tenancy service.

use crate::jwt::JwtService;
use async_trait::async_trait;
use std::sync::Arc;
use tenancy_org::{Identity, IdentityResolver, RequestContext};
use tracing::{debug, error};

/// Resolves callers from JWT bearer tokens.
///
/// Requests without a token, and tokens that fail validation, resolve to
/// no identity; the service then reports them as not authenticated.
#[derive(Debug, Clone)]
pub struct JwtIdentityResolver {
    jwt: Arc<JwtService>,
}

impl JwtIdentityResolver {
    pub fn new(jwt: Arc<JwtService>) -> Self {
        Self { jwt }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, ctx: &RequestContext) -> Option<Identity> {
        let token = ctx.bearer_token.as_deref()?;
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();

        match self.jwt.authenticate(token) {
            Ok(identity) => Some(identity),
            Err(e) if e.is_server_error() => {
                error!(
                    correlation_id = ?ctx.correlation_id,
                    error = %e,
                    "Token validation failed"
                );
                None
            }
            Err(e) => {
                debug!(
                    correlation_id = ?ctx.correlation_id,
                    code = e.error_code(),
                    "Rejected bearer token"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn resolver() -> JwtIdentityResolver {
        let jwt = JwtService::with_secret("test-secret-key-that-is-long-enough-for-hs256").unwrap();
        JwtIdentityResolver::new(Arc::new(jwt))
    }

    #[tokio::test]
    async fn test_resolves_valid_token() {
        let resolver = resolver();
        let identity = Identity::new(Uuid::now_v7()).with_identifier("ada@example.com");
        let token = resolver.jwt().issue_token(&identity).unwrap();

        let resolved = resolver.resolve(&RequestContext::bearer(token)).await;

        assert_eq!(resolved, Some(identity));
    }

    #[tokio::test]
    async fn test_accepts_authorization_header_form() {
        let resolver = resolver();
        let identity = Identity::new(Uuid::now_v7());
        let token = resolver.jwt().issue_token(&identity).unwrap();

        let resolved = resolver
            .resolve(&RequestContext::bearer(format!("Bearer {token}")))
            .await;

        assert_eq!(resolved.map(|i| i.user_id), Some(identity.user_id));
    }

    #[tokio::test]
    async fn test_missing_or_invalid_token() {
        let resolver = resolver();

        assert!(resolver.resolve(&RequestContext::new()).await.is_none());
        assert!(resolver
            .resolve(&RequestContext::bearer("not-a-jwt"))
            .await
            .is_none());
    }
}
