//! JWT token generation and validation
//!
//! This module provides JWT token operations using the jsonwebtoken crate.
//! It supports RS256, RS384, RS512, ES256, ES384, and the HMAC algorithms.

use crate::claims::DEFAULT_ISSUER;
use crate::error::{AuthError, AuthResult};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[cfg(feature = "jwt")]
use crate::claims::IdentityClaims;
#[cfg(feature = "jwt")]
use tenancy_org::Identity;

#[cfg(feature = "jwt")]
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};

/// JWT configuration for token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC algorithms (HS256, HS384, HS512)
    pub secret: Option<String>,

    /// Private key (PEM) for RSA/EC algorithms
    pub private_key: Option<String>,

    /// Public key (PEM) for RSA/EC algorithms
    pub public_key: Option<String>,

    /// Algorithm to use
    pub algorithm: JwtAlgorithm,

    /// Token issuer
    pub issuer: String,

    /// Token audience
    pub audience: Vec<String>,

    /// Lifetime of issued tokens
    pub token_duration: Duration,

    /// Only a verified e-mail becomes the caller's identifier
    pub require_verified_email: bool,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: None,
            private_key: None,
            public_key: None,
            algorithm: JwtAlgorithm::HS256,
            issuer: DEFAULT_ISSUER.to_string(),
            audience: vec![DEFAULT_ISSUER.to_string()],
            token_duration: Duration::hours(1),
            require_verified_email: true,
        }
    }
}

impl JwtConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `TENANCY_JWT_SECRET` | none |
    /// | `TENANCY_JWT_PRIVATE_KEY` / `TENANCY_JWT_PUBLIC_KEY` | none (PEM) |
    /// | `TENANCY_JWT_ALGORITHM` | `HS256` |
    /// | `TENANCY_JWT_ISSUER` | `tenancy` |
    /// | `TENANCY_JWT_AUDIENCE` | `tenancy` (comma separated) |
    /// | `TENANCY_JWT_TTL_SECONDS` | `3600` |
    /// | `TENANCY_JWT_REQUIRE_VERIFIED_EMAIL` | `true` |
    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.secret = lookup("TENANCY_JWT_SECRET");
        config.private_key = lookup("TENANCY_JWT_PRIVATE_KEY");
        config.public_key = lookup("TENANCY_JWT_PUBLIC_KEY");

        if let Some(value) = lookup("TENANCY_JWT_ALGORITHM") {
            config.algorithm = value.parse()?;
        }
        if let Some(value) = lookup("TENANCY_JWT_ISSUER") {
            config.issuer = value;
        }
        if let Some(value) = lookup("TENANCY_JWT_AUDIENCE") {
            config.audience = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(value) = lookup("TENANCY_JWT_TTL_SECONDS") {
            let seconds: i64 = value.parse().map_err(|_| {
                AuthError::ConfigError(format!("TENANCY_JWT_TTL_SECONDS: not a number: {value}"))
            })?;
            config.token_duration = Duration::seconds(seconds);
        }
        if let Some(value) = lookup("TENANCY_JWT_REQUIRE_VERIFIED_EMAIL") {
            config.require_verified_email = value.parse().map_err(|_| {
                AuthError::ConfigError(format!(
                    "TENANCY_JWT_REQUIRE_VERIFIED_EMAIL: expected true or false, got {value}"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail later at token time.
    pub fn validate(&self) -> AuthResult<()> {
        if self.issuer.is_empty() {
            return Err(AuthError::ConfigError("issuer must not be empty".to_string()));
        }
        if self.audience.is_empty() {
            return Err(AuthError::ConfigError("audience must not be empty".to_string()));
        }
        if self.token_duration <= Duration::zero() {
            return Err(AuthError::ConfigError("token duration must be positive".to_string()));
        }
        Ok(())
    }
}

/// Supported JWT algorithms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,
    /// ECDSA using P-256 and SHA-256
    ES256,
    /// ECDSA using P-384 and SHA-384
    ES384,
}

impl FromStr for JwtAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            "ES256" => Ok(Self::ES256),
            "ES384" => Ok(Self::ES384),
            other => Err(AuthError::ConfigError(format!("unsupported algorithm: {other}"))),
        }
    }
}

impl JwtAlgorithm {
    fn is_hmac(self) -> bool {
        matches!(self, Self::HS256 | Self::HS384 | Self::HS512)
    }

    fn is_rsa(self) -> bool {
        matches!(self, Self::RS256 | Self::RS384 | Self::RS512)
    }
}

#[cfg(feature = "jwt")]
impl From<JwtAlgorithm> for Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        match alg {
            JwtAlgorithm::HS256 => Algorithm::HS256,
            JwtAlgorithm::HS384 => Algorithm::HS384,
            JwtAlgorithm::HS512 => Algorithm::HS512,
            JwtAlgorithm::RS256 => Algorithm::RS256,
            JwtAlgorithm::RS384 => Algorithm::RS384,
            JwtAlgorithm::RS512 => Algorithm::RS512,
            JwtAlgorithm::ES256 => Algorithm::ES256,
            JwtAlgorithm::ES384 => Algorithm::ES384,
        }
    }
}

/// JWT service for token operations.
pub struct JwtService {
    config: JwtConfig,
    #[cfg(feature = "jwt")]
    encoding_key: Option<EncodingKey>,
    #[cfg(feature = "jwt")]
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("config.algorithm", &self.config.algorithm)
            .field("config.issuer", &self.config.issuer)
            .field("config.audience", &self.config.audience)
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(feature = "jwt")]
impl JwtService {
    /// Create a new JWT service with the given configuration.
    ///
    /// A service configured with only a public key can validate tokens but
    /// not issue them.
    pub fn new(config: JwtConfig) -> AuthResult<Self> {
        config.validate()?;
        let encoding_key = Self::create_encoding_key(&config)?;
        let decoding_key = Self::create_decoding_key(&config)?;

        Ok(Self {
            config,
            encoding_key,
            decoding_key,
        })
    }

    /// Create with a simple secret (HS256).
    pub fn with_secret(secret: impl Into<String>) -> AuthResult<Self> {
        let config = JwtConfig {
            secret: Some(secret.into()),
            algorithm: JwtAlgorithm::HS256,
            ..Default::default()
        };
        Self::new(config)
    }

    fn create_encoding_key(config: &JwtConfig) -> AuthResult<Option<EncodingKey>> {
        if config.algorithm.is_hmac() {
            let secret = config
                .secret
                .as_ref()
                .ok_or_else(|| AuthError::ConfigError("Secret required for HMAC".to_string()))?;
            return Ok(Some(EncodingKey::from_secret(secret.as_bytes())));
        }

        let Some(key) = config.private_key.as_ref() else {
            return Ok(None);
        };
        let key = if config.algorithm.is_rsa() {
            EncodingKey::from_rsa_pem(key.as_bytes())
                .map_err(|e| AuthError::ConfigError(format!("Invalid RSA private key: {}", e)))?
        } else {
            EncodingKey::from_ec_pem(key.as_bytes())
                .map_err(|e| AuthError::ConfigError(format!("Invalid EC private key: {}", e)))?
        };
        Ok(Some(key))
    }

    fn create_decoding_key(config: &JwtConfig) -> AuthResult<DecodingKey> {
        if config.algorithm.is_hmac() {
            let secret = config
                .secret
                .as_ref()
                .ok_or_else(|| AuthError::ConfigError("Secret required for HMAC".to_string()))?;
            return Ok(DecodingKey::from_secret(secret.as_bytes()));
        }

        let key = config
            .public_key
            .as_ref()
            .ok_or_else(|| AuthError::ConfigError("Public key required".to_string()))?;
        if config.algorithm.is_rsa() {
            DecodingKey::from_rsa_pem(key.as_bytes())
                .map_err(|e| AuthError::ConfigError(format!("Invalid RSA public key: {}", e)))
        } else {
            DecodingKey::from_ec_pem(key.as_bytes())
                .map_err(|e| AuthError::ConfigError(format!("Invalid EC public key: {}", e)))
        }
    }

    /// Claims for `identity` stamped with this service's issuer, audience
    /// and token duration.
    pub fn claims_for(&self, identity: &Identity) -> IdentityClaims {
        let mut claims = IdentityClaims::new(identity.user_id, self.config.token_duration)
            .for_issuer(self.config.issuer.clone(), self.config.audience.clone());
        if let Some(identifier) = &identity.identifier {
            claims = claims.with_email(identifier.clone(), true);
        }
        if let Some(name) = &identity.name {
            claims = claims.with_name(name.clone());
        }
        claims
    }

    /// Issue a bearer token for `identity`.
    ///
    /// The identifier is recorded as a verified e-mail.
    pub fn issue_token(&self, identity: &Identity) -> AuthResult<String> {
        self.encode_claims(&self.claims_for(identity))
    }

    /// Generate a token from existing claims.
    pub fn encode_claims(&self, claims: &IdentityClaims) -> AuthResult<String> {
        let key = self.encoding_key.as_ref().ok_or_else(|| {
            AuthError::ConfigError("Private key required to issue tokens".to_string())
        })?;
        let header = Header::new(self.config.algorithm.into());
        encode(&header, claims, key)
            .map_err(|e| AuthError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> AuthResult<IdentityClaims> {
        let mut validation = Validation::new(self.config.algorithm.into());
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&self.config.audience);
        validation.validate_nbf = true;

        let token_data: TokenData<IdentityClaims> = decode(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    AuthError::InvalidToken("Malformed token".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AuthError::InvalidToken("Invalid signature".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    AuthError::InvalidToken("Invalid issuer".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    AuthError::InvalidToken("Invalid audience".to_string())
                }
                jsonwebtoken::errors::ErrorKind::ImmatureSignature => {
                    AuthError::InvalidToken("Token not yet valid".to_string())
                }
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        Ok(token_data.claims)
    }

    /// Validate a token and turn it into the caller identity.
    pub fn authenticate(&self, token: &str) -> AuthResult<Identity> {
        let claims = self.validate_token(token)?;
        claims
            .to_identity(self.config.require_verified_email)
            .ok_or_else(|| AuthError::MissingClaim("sub is not a user id".to_string()))
    }

    /// Get the configuration.
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }
}
