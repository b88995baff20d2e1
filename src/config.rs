use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::JwtError;

/// Signing algorithms accepted in `header.alg` and `verify.algorithm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    HS256,
    HS384,
    HS512,
    RS256,
    RS384,
    RS512,
    ES256,
    ES384,
    ES512,
}

/// The fixed allow-list, in the order it is reported in schema errors.
pub const ALGORITHMS: [Algorithm; 9] = [
    Algorithm::HS256,
    Algorithm::HS384,
    Algorithm::HS512,
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::ES512,
];

/// Claims whose values are normalized to epoch seconds at sign time.
pub const TEMPORAL_CLAIMS: [&str; 3] = ["iat", "nbf", "exp"];

/// Key family an algorithm signs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Hmac,
    Rsa,
    Ecdsa,
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
        }
    }

    pub fn family(self) -> KeyFamily {
        match self {
            Self::HS256 | Self::HS384 | Self::HS512 => KeyFamily::Hmac,
            Self::RS256 | Self::RS384 | Self::RS512 => KeyFamily::Rsa,
            Self::ES256 | Self::ES384 | Self::ES512 => KeyFamily::Ecdsa,
        }
    }

    /// The `jsonwebtoken` counterpart.  `None` for ES512, which that crate
    /// does not implement.
    pub(crate) fn to_jsonwebtoken(self) -> Option<jsonwebtoken::Algorithm> {
        use jsonwebtoken::Algorithm as J;
        Some(match self {
            Self::HS256 => J::HS256,
            Self::HS384 => J::HS384,
            Self::HS512 => J::HS512,
            Self::RS256 => J::RS256,
            Self::RS384 => J::RS384,
            Self::RS512 => J::RS512,
            Self::ES256 => J::ES256,
            Self::ES384 => J::ES384,
            Self::ES512 => return None,
        })
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a name is not on the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedAlgorithm(pub String);

impl fmt::Display for UnsupportedAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported algorithm {:?}", self.0)
    }
}

impl std::error::Error for UnsupportedAlgorithm {}

impl FromStr for Algorithm {
    type Err = UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALGORITHMS
            .iter()
            .copied()
            .find(|alg| alg.as_str() == s)
            .ok_or_else(|| UnsupportedAlgorithm(s.to_string()))
    }
}

/// Settings shared by every sign/verify call.
///
/// Build with [`new`](Self::new) (or `Default`) and the chained setters, or
/// with [`from_env`](Self::from_env).  A config is a plain value: clone it or
/// hand out references, it is never mutated behind the caller's back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtConfig {
    /// Used when `header.alg` / `algorithm` is not given.
    pub default_algorithm: Algorithm,
    /// Clock-skew tolerance, in seconds, applied by the temporal check on
    /// verification.  Zero means `iat`/`nbf`/`exp` are compared exactly.
    pub leeway: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl JwtConfig {
    /// RS256 by default, no leeway.
    pub fn new() -> Self {
        Self {
            default_algorithm: Algorithm::RS256,
            leeway: 0,
        }
    }

    /// Build from environment variables already set in the process.
    ///
    /// | Variable          | Default | Notes                                   |
    /// |-------------------|---------|-----------------------------------------|
    /// | `JWT_ALGORITHM`   | `RS256` | One of the nine supported algorithms    |
    /// | `JWT_LEEWAY_SECS` | `0`     | Clock-skew tolerance on verification    |
    pub fn from_env() -> Result<Self, JwtError> {
        let default_algorithm = match std::env::var("JWT_ALGORITHM") {
            Ok(v) if !v.is_empty() => v
                .parse()
                .map_err(|e: UnsupportedAlgorithm| JwtError::Config(e.to_string()))?,
            _ => Algorithm::RS256,
        };

        let leeway = match std::env::var("JWT_LEEWAY_SECS") {
            Ok(v) if !v.is_empty() => v.trim().parse().map_err(|_| {
                JwtError::Config(format!("JWT_LEEWAY_SECS is not a number of seconds: {v:?}"))
            })?,
            _ => 0,
        };

        Ok(Self {
            default_algorithm,
            leeway,
        })
    }

    pub fn default_algorithm(mut self, v: Algorithm) -> Self {
        self.default_algorithm = v;
        self
    }
    pub fn leeway(mut self, v: u64) -> Self {
        self.leeway = v;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_allowed_name_parses_back() {
        for alg in ALGORITHMS {
            assert_eq!(alg.as_str().parse::<Algorithm>(), Ok(alg));
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!("none".parse::<Algorithm>().is_err());
        assert!("PS256".parse::<Algorithm>().is_err());
        assert!("rs256".parse::<Algorithm>().is_err());
    }

    #[test]
    fn only_es512_lacks_a_jsonwebtoken_mapping() {
        let unmapped: Vec<_> = ALGORITHMS
            .iter()
            .filter(|a| a.to_jsonwebtoken().is_none())
            .collect();
        assert_eq!(unmapped, [&Algorithm::ES512]);
    }

    #[test]
    fn defaults() {
        let cfg = JwtConfig::default();
        assert_eq!(cfg.default_algorithm, Algorithm::RS256);
        assert_eq!(cfg.leeway, 0);

        let cfg = JwtConfig::new().default_algorithm(Algorithm::HS512).leeway(5);
        assert_eq!(cfg.default_algorithm, Algorithm::HS512);
        assert_eq!(cfg.leeway, 5);
    }
}
