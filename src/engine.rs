//! The JWS engine boundary: compact-serialization sign, verify and decode.
//!
//! The orchestrators only ever talk to [`JwsEngine`].  The default
//! [`JsonWebTokenEngine`] delegates to `jsonwebtoken` for every algorithm it
//! implements and to `p521` for ES512.

use std::collections::HashSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use p521::ecdsa::{
    Signature as P521Signature, SigningKey as P521SigningKey, VerifyingKey as P521VerifyingKey,
};
use p521::elliptic_curve::sec1::ToEncodedPoint;
use p521::pkcs8::{DecodePrivateKey, DecodePublicKey};
use serde_json::Value;
use signature::{Signer as _, Verifier as _};

use crate::claims::{Claims, DecodedToken, JwtHeader, KeyMaterial, TokenHeader};
use crate::config::{Algorithm, KeyFamily};
use crate::error::JwtError;

/// What the orchestrators need from a JWS implementation.
pub trait JwsEngine: Send + Sync {
    /// Produce a compact token over `claims`.
    fn sign(&self, header: &JwtHeader, claims: &Claims, key: &KeyMaterial) -> Result<String, JwtError>;

    /// Check the signature of `token` as `algorithm` under `key`.  A token
    /// signed with another algorithm, or a key that is not a key for
    /// `algorithm` at all, is `Ok(false)`.  `Err` is left for failures of
    /// the engine itself.
    fn verify(&self, token: &str, algorithm: Algorithm, key: &KeyMaterial) -> Result<bool, JwtError>;

    /// Split and decode without checking anything cryptographic.
    fn decode(&self, token: &str) -> Option<DecodedToken>;
}

/// Default engine backed by `jsonwebtoken` (and `p521` for ES512).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWebTokenEngine;

impl JwsEngine for JsonWebTokenEngine {
    fn sign(&self, header: &JwtHeader, claims: &Claims, key: &KeyMaterial) -> Result<String, JwtError> {
        let Some(alg) = header.alg.to_jsonwebtoken() else {
            return sign_es512(header, claims, key);
        };

        let mut jws_header = Header::new(alg);
        jws_header.typ = Some(header.typ.clone());
        jws_header.kid = header.kid.clone();
        jws_header.cty = header.cty.clone();

        let encoding_key = match header.alg.family() {
            KeyFamily::Hmac => EncodingKey::from_secret(key.as_bytes()),
            KeyFamily::Rsa => EncodingKey::from_rsa_pem(key.as_bytes()).map_err(key_error)?,
            KeyFamily::Ecdsa => EncodingKey::from_ec_pem(key.as_bytes()).map_err(key_error)?,
        };

        jsonwebtoken::encode(&jws_header, claims, &encoding_key)
            .map_err(|e| JwtError::Engine(e.to_string()))
    }

    fn verify(&self, token: &str, algorithm: Algorithm, key: &KeyMaterial) -> Result<bool, JwtError> {
        let Some(parts) = split(token) else {
            return Ok(false);
        };
        let declared = decode_segment::<TokenHeader>(parts.header).and_then(|h| h.alg);
        if declared.as_deref() != Some(algorithm.as_str()) {
            tracing::debug!(expected = %algorithm, found = ?declared, "token algorithm does not match");
            return Ok(false);
        }

        let Some(alg) = algorithm.to_jsonwebtoken() else {
            return verify_es512(&parts, key);
        };

        let decoding_key = match algorithm.family() {
            KeyFamily::Hmac => Ok(DecodingKey::from_secret(key.as_bytes())),
            KeyFamily::Rsa => DecodingKey::from_rsa_pem(key.as_bytes()),
            KeyFamily::Ecdsa => DecodingKey::from_ec_pem(key.as_bytes()),
        };
        let decoding_key = match decoding_key {
            Ok(k) => k,
            Err(e) => {
                tracing::debug!(error = %e, alg = %algorithm, "verification key does not fit the algorithm");
                return Ok(false);
            }
        };

        // Only the signature is checked here; claims are the caller's business.
        let mut validation = Validation::new(alg);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        match jsonwebtoken::decode::<Value>(token, &decoding_key, &validation) {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::debug!(error = %e, "signature rejected");
                Ok(false)
            }
        }
    }

    fn decode(&self, token: &str) -> Option<DecodedToken> {
        let parts = split(token)?;
        Some(DecodedToken {
            header: decode_segment(parts.header)?,
            payload: decode_segment(parts.payload)?,
            signature: parts.signature.to_string(),
        })
    }
}

fn key_error(e: jsonwebtoken::errors::Error) -> JwtError {
    JwtError::Key(e.to_string())
}

struct Parts<'a> {
    header: &'a str,
    payload: &'a str,
    signature: &'a str,
}

impl Parts<'_> {
    fn signing_input(&self) -> String {
        format!("{}.{}", self.header, self.payload)
    }
}

fn is_base64url(segment: &str) -> bool {
    segment
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Exactly three base64url segments; header and payload non-empty.
fn split(token: &str) -> Option<Parts<'_>> {
    let mut iter = token.split('.');
    let header = iter.next()?;
    let payload = iter.next()?;
    let signature = iter.next()?;
    if iter.next().is_some() || header.is_empty() || payload.is_empty() {
        return None;
    }
    if ![header, payload, signature].iter().all(|s| is_base64url(s)) {
        return None;
    }
    Some(Parts {
        header,
        payload,
        signature,
    })
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn sign_es512(header: &JwtHeader, claims: &Claims, key: &KeyMaterial) -> Result<String, JwtError> {
    let signing_key = p521_signing_key(key)?;

    let mut jws_header = serde_json::Map::new();
    jws_header.insert("alg".into(), Algorithm::ES512.as_str().into());
    jws_header.insert("typ".into(), header.typ.clone().into());
    if let Some(kid) = &header.kid {
        jws_header.insert("kid".into(), kid.clone().into());
    }
    if let Some(cty) = &header.cty {
        jws_header.insert("cty".into(), cty.clone().into());
    }

    let signing_input = format!("{}.{}", encode_segment(&jws_header)?, encode_segment(claims)?);

    let signature: P521Signature = signing_key.sign(signing_input.as_bytes());
    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    ))
}

fn verify_es512(parts: &Parts<'_>, key: &KeyMaterial) -> Result<bool, JwtError> {
    let verifying_key = match p521_verifying_key(key) {
        Ok(k) => k,
        Err(e) => {
            tracing::debug!(error = %e, "verification key does not fit ES512");
            return Ok(false);
        }
    };
    let Ok(signature_bytes) = URL_SAFE_NO_PAD.decode(parts.signature) else {
        return Ok(false);
    };
    let Ok(signature) = P521Signature::from_slice(&signature_bytes) else {
        return Ok(false);
    };
    Ok(verifying_key
        .verify(parts.signing_input().as_bytes(), &signature)
        .is_ok())
}

fn pem_text(key: &KeyMaterial) -> Result<&str, JwtError> {
    std::str::from_utf8(key.as_bytes()).map_err(|_| JwtError::Key("PEM key is not UTF-8".into()))
}

fn p521_signing_key(key: &KeyMaterial) -> Result<P521SigningKey, JwtError> {
    let pem = pem_text(key)?;
    let secret = p521::SecretKey::from_pkcs8_pem(pem).map_err(|e| JwtError::Key(format!("p521 private key error: {e}")))?;
    P521SigningKey::from_bytes(&secret.to_bytes())
        .map_err(|e| JwtError::Key(format!("p521 signing key error: {e}")))
}

fn p521_verifying_key(key: &KeyMaterial) -> Result<P521VerifyingKey, JwtError> {
    let public_key = p521::PublicKey::from_public_key_pem(pem_text(key)?)
        .map_err(|e| JwtError::Key(format!("p521 public key error: {e}")))?;
    P521VerifyingKey::from_encoded_point(&public_key.to_encoded_point(false))
        .map_err(|e| JwtError::Key(format!("p521 public key error: {e}")))
}

fn encode_segment<T: serde::Serialize>(value: &T) -> Result<String, JwtError> {
    serde_json::to_vec(value)
        .map(|bytes| URL_SAFE_NO_PAD.encode(bytes))
        .map_err(|e| JwtError::Engine(e.to_string()))
}

/// Split a compact token into header, payload and signature.  `None` for
/// anything that is not three base64url segments with JSON-object header
/// and payload.
pub fn decode(token: &str) -> Option<DecodedToken> {
    JsonWebTokenEngine.decode(token)
}

/// Structural well-formedness only; says nothing about the signature.
pub fn is_token(token: &str) -> bool {
    decode(token).is_some()
}
