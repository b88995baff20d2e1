//! # jwt-timeclaims
//!
//! Sign and verify JSON Web Tokens whose temporal claims can be written the
//! way people think about them: `"exp": "365d"`, `"nbf": "1d"`,
//! `"exp": "31/12/2030"`.  They are normalized to epoch seconds when the
//! token is signed; verification reads the numbers back and checks them
//! before the signature.
//!
//! Cryptography is delegated to [`jsonwebtoken`](https://docs.rs/jsonwebtoken)
//! (and `p521` for ES512) behind the [`JwsEngine`] trait.
//!
//! ## Usage
//!
//! ```rust
//! use jwt_timeclaims::{Algorithm, Jwt, JwtConfig, SignOptions, VerifyOptions};
//!
//! let jwt = Jwt::new(JwtConfig::new().default_algorithm(Algorithm::HS256));
//!
//! let token = jwt
//!     .sign(&SignOptions::new("secret").claim("sub", "user-1").claim("exp", "365d"))
//!     .unwrap();
//!
//! let claims = jwt.verify_claims(&VerifyOptions::new(&token, "secret")).unwrap();
//! assert_eq!(claims.sub.as_deref(), Some("user-1"));
//!
//! // Gate-only form.
//! assert!(jwt.verify(&VerifyOptions::new(token, "secret")));
//! ```
//!
//! ## Temporal claims
//!
//! | Written as                               | Means                                        |
//! |------------------------------------------|----------------------------------------------|
//! | `1700000000`                             | epoch seconds, unchanged                     |
//! | `"1d"`, `"2 days"`, `"1y"`, `"1.5yrs"`   | that long after signing (year = 365.25 days) |
//! | `"1500"`                                 | milliseconds after signing                   |
//! | `"31-12-2030"`, `"31/12/30"`             | midnight UTC on that date                    |
//!
//! `iat` defaults to the signing instant.
//!
//! ## Errors
//!
//! [`Jwt::verify_claims`] tells failures apart with [`JwtError`]:
//! schema problems, an undecodable token, a token outside its
//! `iat`/`nbf`/`exp` window, and a bad signature are all distinct.
//! [`Jwt::verify`] only answers yes or no.
//!
//! ## Environment variables (`JwtConfig::from_env`)
//!
//! This crate does **not** load `.env` files.
//!
//! | Variable          | Default | Notes                                |
//! |-------------------|---------|--------------------------------------|
//! | `JWT_ALGORITHM`   | `RS256` | Default for `header.alg`/`algorithm` |
//! | `JWT_LEEWAY_SECS` | `0`     | Clock-skew tolerance on verification |

pub mod claims;
pub mod coerce;
pub mod config;
pub mod deferred;
pub mod engine;
pub mod error;
pub mod middleware;
pub mod schema;
pub mod temporal;
pub mod token;

pub use claims::{Audience, Claims, DecodedToken, JwtHeader, KeyMaterial, TimeClaim, TokenHeader};
pub use config::{Algorithm, JwtConfig, ALGORITHMS, TEMPORAL_CLAIMS};
pub use engine::{decode, is_token, JsonWebTokenEngine, JwsEngine};
pub use error::{ErrorKind, JwtError};
pub use middleware::{BearerVerifier, OptionalVerifiedClaims, VerifiedClaims};
pub use schema::{SignOptions, ValidationError, VerifyOptions};
pub use temporal::{is_currently_valid, TemporalViolation};
pub use token::{sign, verify, verify_claims, Jwt};
