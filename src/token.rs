use std::fmt;
use std::sync::Arc;

use crate::claims::{Claims, DecodedToken};
use crate::coerce::{coerce, now_seconds};
use crate::config::JwtConfig;
use crate::engine::{JsonWebTokenEngine, JwsEngine};
use crate::error::JwtError;
use crate::schema::{validate_sign, validate_verify, SignOptions, VerifyOptions};
use crate::temporal;

/// Sign and verify tokens with one configuration and one JWS engine.
///
/// Cheap to clone: the engine is shared behind an `Arc`.
#[derive(Clone)]
pub struct Jwt {
    config: JwtConfig,
    engine: Arc<dyn JwsEngine>,
}

impl fmt::Debug for Jwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwt").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Default for Jwt {
    fn default() -> Self {
        Self::new(JwtConfig::default())
    }
}

impl Jwt {
    /// Use the default `jsonwebtoken`-backed engine.
    pub fn new(config: JwtConfig) -> Self {
        Self::with_engine(config, JsonWebTokenEngine)
    }

    pub fn with_engine(config: JwtConfig, engine: impl JwsEngine + 'static) -> Self {
        Self {
            config,
            engine: Arc::new(engine),
        }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Validate the options, coerce `iat`/`nbf`/`exp` to epoch seconds and
    /// sign.
    ///
    /// Schema problems are reported before anything else happens, and the
    /// engine is only called once the claims have been coerced.
    pub fn sign(&self, options: &SignOptions) -> Result<String, JwtError> {
        let now = now_seconds();

        let request = validate_sign(options, &self.config, now).map_err(|e| {
            tracing::debug!(error = %e, "sign options rejected");
            JwtError::Schema(e)
        })?;
        let claims = coerce(request.claims, now)?;

        let token = self
            .engine
            .sign(&request.header, &claims, &request.private_key)?;
        tracing::debug!(alg = %request.header.alg, exp = ?claims.exp, "token signed");
        Ok(token)
    }

    /// Verify and return the decoded payload.
    ///
    /// Checks run cheapest first: schema, structural decode, then the
    /// `iat`/`nbf`/`exp` window.  The signature is only checked once all of
    /// those pass, so a token outside its validity window is reported as
    /// [`JwtError::Temporal`] whatever its signature.
    pub fn verify_claims(&self, options: &VerifyOptions) -> Result<Claims, JwtError> {
        let request = validate_verify(options, &self.config).map_err(|e| {
            tracing::debug!(error = %e, "verify options rejected");
            JwtError::Schema(e)
        })?;

        let decoded = self.engine.decode(&request.token).ok_or_else(|| {
            tracing::debug!("token is not a compact JWS");
            JwtError::Decode
        })?;

        temporal::check(&decoded.payload, now_seconds(), self.config.leeway).map_err(|v| {
            tracing::debug!(reason = %v, "token outside its validity window");
            JwtError::Temporal(v)
        })?;

        if !self
            .engine
            .verify(&request.token, request.algorithm, &request.public_key)?
        {
            tracing::debug!(alg = %request.algorithm, "signature does not verify");
            return Err(JwtError::SignatureVerification);
        }

        Ok(decoded.payload)
    }

    /// Gate-only verification: every failure is `false`.  Use
    /// [`verify_claims`](Self::verify_claims) to learn why.
    pub fn verify(&self, options: &VerifyOptions) -> bool {
        self.verify_claims(options).is_ok()
    }

    /// Structural decode through this instance's engine.
    pub fn decode(&self, token: &str) -> Option<DecodedToken> {
        self.engine.decode(token)
    }
}

/// Sign with the default engine.
///
/// ```rust,no_run
/// use jwt_timeclaims::{sign, JwtConfig, SignOptions};
///
/// # fn main() -> Result<(), jwt_timeclaims::JwtError> {
/// # let pem = String::new();
/// let token = sign(
///     &SignOptions::new(pem).claim("sub", "user-1").claim("exp", "365d"),
///     &JwtConfig::new(),
/// )?;
/// # Ok(())
/// # }
/// ```
pub fn sign(options: &SignOptions, config: &JwtConfig) -> Result<String, JwtError> {
    Jwt::new(config.clone()).sign(options)
}

/// Verify with the default engine, returning the payload.
pub fn verify_claims(options: &VerifyOptions, config: &JwtConfig) -> Result<Claims, JwtError> {
    Jwt::new(config.clone()).verify_claims(options)
}

/// Verify with the default engine.  Any failure is `false`.
pub fn verify(options: &VerifyOptions, config: &JwtConfig) -> bool {
    verify_claims(options, config).is_ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::claims::{JwtHeader, KeyMaterial};
    use crate::config::Algorithm;
    use crate::error::ErrorKind;
    use crate::temporal::TemporalViolation;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const RSA_PRIVATE: &str = include_str!("../tests/fixtures/rsa_private.pem");
    pub(crate) const RSA_PUBLIC: &str = include_str!("../tests/fixtures/rsa_public.pem");

    /// Wraps the real engine and counts the calls it receives.
    #[derive(Default)]
    pub(crate) struct CountingEngine {
        pub(crate) signs: AtomicUsize,
        pub(crate) verifies: AtomicUsize,
    }

    impl JwsEngine for Arc<CountingEngine> {
        fn sign(&self, header: &JwtHeader, claims: &Claims, key: &KeyMaterial) -> Result<String, JwtError> {
            self.signs.fetch_add(1, Ordering::SeqCst);
            JsonWebTokenEngine.sign(header, claims, key)
        }

        fn verify(&self, token: &str, algorithm: Algorithm, key: &KeyMaterial) -> Result<bool, JwtError> {
            self.verifies.fetch_add(1, Ordering::SeqCst);
            JsonWebTokenEngine.verify(token, algorithm, key)
        }

        fn decode(&self, token: &str) -> Option<DecodedToken> {
            JsonWebTokenEngine.decode(token)
        }
    }

    fn hs256() -> Jwt {
        Jwt::new(JwtConfig::new().default_algorithm(Algorithm::HS256))
    }

    #[test]
    fn roundtrip() {
        let jwt = hs256();
        let token = jwt
            .sign(&SignOptions::new("test-secret").claim("sub", "42").claim("exp", "1d"))
            .unwrap();
        let claims = jwt
            .verify_claims(&VerifyOptions::new(token, "test-secret"))
            .unwrap();
        assert_eq!(claims.subject(), Some("42"));
        assert!(claims.iat.is_some());
        assert_eq!(claims.exp, claims.iat.map(|iat| iat + 86_400));
    }

    #[test]
    fn roundtrip_rs256_by_default() {
        let token = sign(
            &SignOptions::new(RSA_PRIVATE).claim("exp", "365d").claim("sub", "user-1"),
            &JwtConfig::new(),
        )
        .unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert!(verify(&VerifyOptions::new(token, RSA_PUBLIC), &JwtConfig::new()));
    }

    #[test]
    fn wrong_secret_rejected() {
        let jwt = hs256();
        let token = jwt.sign(&SignOptions::new("good")).unwrap();
        let err = jwt.verify_claims(&VerifyOptions::new(token, "bad")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SignatureVerification);
    }

    #[test]
    fn roundtrip_with_extra_claims() {
        #[derive(serde::Deserialize)]
        struct Extra {
            host: String,
            port: u16,
        }

        let jwt = hs256();
        let token = jwt
            .sign(
                &SignOptions::new("s")
                    .claim("host", "box")
                    .claim("port", 3000),
            )
            .unwrap();
        let claims = jwt.verify_claims(&VerifyOptions::new(token, "s")).unwrap();
        let extra: Extra = claims.extra_as().unwrap();
        assert_eq!(extra.host, "box");
        assert_eq!(extra.port, 3000);
    }

    #[test]
    fn schema_errors_never_reach_the_engine() {
        let engine = Arc::new(CountingEngine::default());
        let jwt = Jwt::with_engine(JwtConfig::new(), engine.clone());
        let err = jwt
            .sign(&SignOptions::new("k").header("alg", "none"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(engine.signs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn claim_format_errors_never_reach_the_engine() {
        let engine = Arc::new(CountingEngine::default());
        let jwt = Jwt::with_engine(JwtConfig::new(), engine.clone());
        let err = jwt
            .sign(&SignOptions::new("k").claim("exp", "next week"))
            .unwrap_err();
        assert!(matches!(err, JwtError::ClaimFormat { claim: "exp" }));
        assert_eq!(engine.signs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn not_yet_valid_skips_the_signature_check() {
        let engine = Arc::new(CountingEngine::default());
        let jwt = Jwt::with_engine(JwtConfig::new().default_algorithm(Algorithm::HS256), engine.clone());
        let token = jwt.sign(&SignOptions::new("s").claim("nbf", "1d")).unwrap();

        // Wrong key on purpose: the temporal check must fire first.
        let err = jwt
            .verify_claims(&VerifyOptions::new(token, "not-the-key"))
            .unwrap_err();
        assert!(matches!(err, JwtError::Temporal(TemporalViolation::NotYetValid)));
        assert_eq!(engine.verifies.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn leeway_admits_slightly_early_tokens() {
        let strict = hs256();
        let lenient = Jwt::new(strict.config().clone().leeway(60));
        let nbf = now_seconds() + 30;
        let token = strict.sign(&SignOptions::new("s").claim("nbf", nbf)).unwrap();

        assert!(!strict.verify(&VerifyOptions::new(token.clone(), "s")));
        assert!(lenient.verify(&VerifyOptions::new(token, "s")));
    }

    #[test]
    fn malformed_token_is_a_decode_error() {
        let err = hs256()
            .verify_claims(&VerifyOptions::new("This is invalid", "s"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn unusable_verification_key_is_a_signature_failure() {
        let token = sign(&SignOptions::new(RSA_PRIVATE), &JwtConfig::new()).unwrap();
        let err = verify_claims(&VerifyOptions::new(token, "not a pem"), &JwtConfig::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SignatureVerification);
    }

    #[test]
    fn unusable_signing_key_is_a_key_error() {
        let err = sign(&SignOptions::new("not a pem"), &JwtConfig::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Key);
    }

    #[test]
    fn mistyped_registered_claims_verify() {
        let jwt = hs256();
        let token = jwt
            .sign(&SignOptions::new("s").claim("exp", "1d").claim("role", "admin"))
            .unwrap();
        // Re-sign a payload with a numeric `sub` through the engine directly.
        let mut claims = jwt.decode(&token).unwrap().payload;
        claims.extra.insert("sub".into(), serde_json::json!(42));
        let token = JsonWebTokenEngine
            .sign(&JwtHeader::new(Algorithm::HS256), &claims, &"s".into())
            .unwrap();

        let verified = jwt.verify_claims(&VerifyOptions::new(token, "s")).unwrap();
        assert_eq!(verified.sub, None);
        assert_eq!(verified.extra("sub"), Some(&serde_json::json!(42)));
    }
}
