use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Algorithm;

/// Private or public key material: PEM text for RSA/EC algorithms, the raw
/// shared secret for HMAC ones.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyMaterial {
    Text(String),
    Binary(Vec<u8>),
}

impl KeyMaterial {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Binary(b) => b,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

// Keys never show up in logs or panic messages.
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "KeyMaterial::Text(<{} bytes>)", s.len()),
            Self::Binary(b) => write!(f, "KeyMaterial::Binary(<{} bytes>)", b.len()),
        }
    }
}

impl From<&str> for KeyMaterial {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for KeyMaterial {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&[u8]> for KeyMaterial {
    fn from(b: &[u8]) -> Self {
        Self::Binary(b.to_vec())
    }
}

impl From<Vec<u8>> for KeyMaterial {
    fn from(b: Vec<u8>) -> Self {
        Self::Binary(b)
    }
}

/// A temporal claim as the caller wrote it: either epoch seconds already,
/// or a date / duration expression still to be coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeClaim {
    Seconds(i64),
    Expr(String),
}

/// Claims that passed structural validation but have not been coerced.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimSet {
    /// Defaulted to the signing instant when the caller leaves it out.
    pub iat: TimeClaim,
    pub nbf: Option<TimeClaim>,
    pub exp: Option<TimeClaim>,
    pub aud: Option<String>,
    pub iss: Option<String>,
    pub jti: Option<String>,
    pub sub: Option<String>,
    pub extra: Map<String, Value>,
}

/// `aud` as found in a token: RFC 7519 allows a single string or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    pub fn contains(&self, aud: &str) -> bool {
        match self {
            Self::Single(a) => a == aud,
            Self::Multiple(all) => all.iter().any(|a| a == aud),
        }
    }
}

/// Canonical JWT payload.  Temporal claims are epoch seconds; any claim
/// outside the registered set lives in `extra` and is flattened into the
/// payload on serialization.
///
/// Deserialization accepts any JSON object.  A registered claim whose value
/// has an unexpected type (`"sub": 42`, `"exp": "soon"`) is left in `extra`
/// under its own name instead of failing the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct Claims {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Caller-defined claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for Claims {
    fn from(mut map: Map<String, Value>) -> Self {
        Self {
            iat: take(&mut map, "iat", numeric_date),
            nbf: take(&mut map, "nbf", numeric_date),
            exp: take(&mut map, "exp", numeric_date),
            aud: take(&mut map, "aud", |v| Audience::deserialize(v).ok()),
            iss: take(&mut map, "iss", string),
            jti: take(&mut map, "jti", string),
            sub: take(&mut map, "sub", string),
            extra: map,
        }
    }
}

impl Claims {
    /// The raw subject string, if any.
    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref()
    }

    /// Look up a caller-defined claim.
    pub fn extra(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// Deserialize the caller-defined claims into a typed struct.
    ///
    /// ```rust
    /// use serde::Deserialize;
    /// use jwt_timeclaims::Claims;
    ///
    /// #[derive(Deserialize)]
    /// struct Extra { port: u16 }
    ///
    /// let mut claims = Claims::default();
    /// claims.extra.insert("port".into(), 3000.into());
    /// assert_eq!(claims.extra_as::<Extra>().unwrap().port, 3000);
    /// ```
    pub fn extra_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.extra.clone()))
    }
}

/// Header of a token being signed, after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtHeader {
    pub alg: Algorithm,
    pub typ: String,
    pub kid: Option<String>,
    pub cty: Option<String>,
}

impl JwtHeader {
    pub fn new(alg: Algorithm) -> Self {
        Self {
            alg,
            typ: "JWT".into(),
            kid: None,
            cty: None,
        }
    }
}

/// Header of a decoded token.  `alg` is whatever the token says; nothing
/// here has been checked against the allow-list.  Like [`Claims`], any JSON
/// object deserializes; fields of an unexpected type stay in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct TokenHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for TokenHeader {
    fn from(mut map: Map<String, Value>) -> Self {
        Self {
            alg: take(&mut map, "alg", string),
            typ: take(&mut map, "typ", string),
            kid: take(&mut map, "kid", string),
            extra: map,
        }
    }
}

/// A compact token split into its parts.  Producing one implies nothing
/// about the signature.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub header: TokenHeader,
    pub payload: Claims,
    /// The third segment, still base64url-encoded.
    pub signature: String,
}

/// Move `name` out of `map` when `read` accepts its value.
fn take<T>(map: &mut Map<String, Value>, name: &str, read: impl Fn(&Value) -> Option<T>) -> Option<T> {
    let value = read(map.get(name)?)?;
    map.remove(name);
    Some(value)
}

fn string(v: &Value) -> Option<String> {
    v.as_str().map(str::to_owned)
}

/// Any JSON number as a NumericDate, flooring fractional seconds.  `None`
/// for anything else, including numbers outside `i64`.
fn numeric_date(v: &Value) -> Option<i64> {
    if let Some(secs) = v.as_i64() {
        return Some(secs);
    }
    if v.is_u64() {
        return None;
    }
    let secs = v.as_f64()?;
    if secs.is_finite() && secs >= i64::MIN as f64 && secs < i64::MAX as f64 {
        Some(secs.floor() as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registered_and_extra_claims_split() {
        let claims: Claims = serde_json::from_value(json!({
            "iat": 1_700_000_000,
            "exp": 1_700_086_400,
            "sub": "user-1",
            "host": "box",
            "port": 3000,
        }))
        .unwrap();

        assert_eq!(claims.iat, Some(1_700_000_000));
        assert_eq!(claims.exp, Some(1_700_086_400));
        assert_eq!(claims.nbf, None);
        assert_eq!(claims.subject(), Some("user-1"));
        assert_eq!(claims.extra("host"), Some(&json!("box")));
        assert_eq!(claims.extra.len(), 2);
    }

    #[test]
    fn none_fields_are_not_serialized() {
        let mut claims = Claims {
            iat: Some(10),
            ..Claims::default()
        };
        claims.extra.insert("role".into(), json!("admin"));
        assert_eq!(
            serde_json::to_value(&claims).unwrap(),
            json!({"iat": 10, "role": "admin"})
        );
    }

    #[test]
    fn fractional_numeric_dates_floor() {
        let claims: Claims = serde_json::from_value(json!({"exp": 1234.9})).unwrap();
        assert_eq!(claims.exp, Some(1234));
    }

    #[test]
    fn mistyped_registered_claims_stay_in_extra() {
        let payload = json!({"exp": "tomorrow", "sub": 42, "iss": "me", "aud": 5});
        let claims: Claims = serde_json::from_value(payload.clone()).unwrap();

        assert_eq!(claims.exp, None);
        assert_eq!(claims.sub, None);
        assert_eq!(claims.aud, None);
        assert_eq!(claims.iss.as_deref(), Some("me"));
        assert_eq!(claims.extra("sub"), Some(&json!(42)));
        assert_eq!(claims.extra("exp"), Some(&json!("tomorrow")));
        // Nothing is lost on the way back out.
        assert_eq!(serde_json::to_value(&claims).unwrap(), payload);
    }

    #[test]
    fn out_of_range_numeric_date_is_not_a_date() {
        let claims: Claims = serde_json::from_value(json!({"exp": 1e300, "nbf": u64::MAX})).unwrap();
        assert_eq!(claims.exp, None);
        assert_eq!(claims.nbf, None);
        assert_eq!(claims.extra.len(), 2);
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(serde_json::from_value::<Claims>(json!([1, 2])).is_err());
        assert!(serde_json::from_value::<TokenHeader>(json!("HS256")).is_err());
    }

    #[test]
    fn header_without_string_alg_still_deserializes() {
        let header: TokenHeader = serde_json::from_value(json!({"alg": 5, "kid": "k1"})).unwrap();
        assert_eq!(header.alg, None);
        assert_eq!(header.kid.as_deref(), Some("k1"));
        assert_eq!(header.extra["alg"], json!(5));
    }

    #[test]
    fn audience_may_be_an_array() {
        let claims: Claims =
            serde_json::from_value(json!({"aud": ["api", "admin"]})).unwrap();
        let aud = claims.aud.unwrap();
        assert!(aud.contains("admin"));
        assert!(!aud.contains("other"));
    }

    #[test]
    fn key_material_debug_hides_contents() {
        let key = KeyMaterial::from("super-secret");
        let shown = format!("{key:?}");
        assert!(!shown.contains("super-secret"));
        assert!(shown.contains("12 bytes"));
    }
}
