use axum::extract::FromRequestParts;
use http::request::Parts;

use crate::claims::{Claims, KeyMaterial};
use crate::config::Algorithm;
use crate::error::JwtError;
use crate::schema::VerifyOptions;
use crate::token::Jwt;

/// What [`VerifiedClaims`] checks bearer tokens against.  Register it as an
/// Axum extension.
///
/// ```rust,no_run
/// use axum::{routing::get, Extension, Router};
/// use jwt_timeclaims::{BearerVerifier, Jwt, JwtConfig, VerifiedClaims};
///
/// async fn handler(auth: VerifiedClaims) -> String {
///     format!("sub = {:?}", auth.claims.sub)
/// }
///
/// # fn example(public_pem: String) {
/// let verifier = BearerVerifier::new(Jwt::new(JwtConfig::new()), public_pem);
/// let app: Router = Router::new()
///     .route("/me", get(handler))
///     .layer(Extension(verifier));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BearerVerifier {
    pub jwt: Jwt,
    pub public_key: KeyMaterial,
    /// `None` falls back to the config's default algorithm.
    pub algorithm: Option<Algorithm>,
}

impl BearerVerifier {
    pub fn new(jwt: Jwt, public_key: impl Into<KeyMaterial>) -> Self {
        Self {
            jwt,
            public_key: public_key.into(),
            algorithm: None,
        }
    }

    pub fn algorithm(mut self, v: Algorithm) -> Self {
        self.algorithm = Some(v);
        self
    }

    fn options(&self, token: &str) -> VerifyOptions {
        let options = VerifyOptions::new(token, self.public_key.clone());
        match self.algorithm {
            Some(alg) => options.algorithm(alg),
            None => options,
        }
    }
}

/// Axum extractor: a bearer token that passed full verification.
#[derive(Debug, Clone)]
pub struct VerifiedClaims {
    /// Decoded payload.
    pub claims: Claims,

    /// Raw bearer token (useful for forwarding downstream).
    pub token: String,
}

impl<S> FromRequestParts<S> for VerifiedClaims
where
    S: Send + Sync,
{
    type Rejection = JwtError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer(parts)?;

        let verifier = parts.extensions.get::<BearerVerifier>().ok_or_else(|| {
            JwtError::Config("BearerVerifier not found, add `.layer(Extension(verifier))`".into())
        })?;
        let claims = verifier.jwt.verify_claims(&verifier.options(&token))?;

        Ok(VerifiedClaims { claims, token })
    }
}

/// Like [`VerifiedClaims`] but yields `None` when no `Authorization` header
/// is present.  A present but bad token is still rejected.
#[derive(Debug, Clone)]
pub struct OptionalVerifiedClaims(Option<VerifiedClaims>);

impl OptionalVerifiedClaims {
    pub fn into_inner(self) -> Option<VerifiedClaims> {
        self.0
    }
    pub fn as_ref(&self) -> Option<&VerifiedClaims> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for OptionalVerifiedClaims
where
    S: Send + Sync,
{
    type Rejection = JwtError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if parts.headers.get(http::header::AUTHORIZATION).is_none() {
            return Ok(Self(None));
        }
        VerifiedClaims::from_request_parts(parts, state)
            .await
            .map(|c| Self(Some(c)))
    }
}

fn extract_bearer(parts: &Parts) -> Result<String, JwtError> {
    let header = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .ok_or(JwtError::MissingHeader)?
        .to_str()
        .map_err(|_| JwtError::InvalidHeaderFormat)?;

    header
        .strip_prefix("Bearer ")
        .map(|t| t.to_owned())
        .ok_or(JwtError::InvalidBearerFormat)
}
