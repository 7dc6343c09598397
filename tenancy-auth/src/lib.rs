//! # Tenancy Authentication
//!
//! JWT bearer authentication for the tenancy service.
//!
//! ## Overview
//!
//! The tenancy service never authenticates callers itself; it asks an
//! [`IdentityResolver`](tenancy_org::IdentityResolver). This crate provides
//! one backed by signed JWTs:
//! - **Claims**: standard RFC 7519 claims plus e-mail and display name
//! - **JWT**: token issuing and validation (HMAC, RSA, EC)
//! - **Resolver**: [`JwtIdentityResolver`] plugs the two into the service
//!
//! A verified e-mail claim becomes the caller's identifier, which is what
//! invitations are matched against.
//!
//! ## Features
//!
//! - `jwt` (default): JWT token support using jsonwebtoken
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tenancy_auth::{JwtConfig, JwtIdentityResolver, JwtService};
//! use tenancy_org::{Stores, TenancyConfig, TenancyService};
//! use tenancy_rbac::MemoryPolicyEngine;
//!
//! let jwt = Arc::new(JwtService::new(JwtConfig::from_env().unwrap()).unwrap());
//! let service = TenancyService::new(
//!     Stores::memory(),
//!     Arc::new(MemoryPolicyEngine::new()),
//!     Arc::new(JwtIdentityResolver::new(jwt)),
//!     TenancyConfig::from_env().unwrap(),
//! );
//! ```
//!
//! ## Related Crates
//!
//! - `tenancy-org`: the service this crate authenticates for

pub mod claims;
pub mod error;
#[cfg(feature = "jwt")]
pub mod jwt;
#[cfg(feature = "jwt")]
pub mod resolver;

// Re-export main types
pub use claims::IdentityClaims;
pub use error::{AuthError, AuthResult};

#[cfg(feature = "jwt")]
pub use jwt::{JwtAlgorithm, JwtConfig, JwtService};
#[cfg(feature = "jwt")]
pub use resolver::JwtIdentityResolver;
