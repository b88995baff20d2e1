//! Normalization of `iat`/`nbf`/`exp` to epoch seconds.
//!
//! A temporal claim may be given as
//!
//! * epoch seconds (passed through as-is),
//! * a calendar date: `DD-MM-YYYY`, `DD-MM-YY`, `DD/MM/YYYY` or `DD/MM/YY`,
//!   taken as midnight UTC,
//! * a duration from now: `"1d"`, `"365 days"`, `"2y"`, `"1.5yrs"`.  A year
//!   is 365.25 days.  A bare number string is milliseconds.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::claims::{ClaimSet, Claims, TimeClaim};
use crate::error::JwtError;

const MS_PER_DAY: f64 = 86_400_000.0;
const MS_PER_YEAR: f64 = MS_PER_DAY * 365.25;

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2})([-/])(\d{2})([-/])(\d{4}|\d{2})$").expect("date pattern")
});

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^((?:\d+)?\.?\d+) *(days?|d|years?|yrs?|y)?$").expect("duration pattern")
});

/// Seconds since the Unix epoch, read from the system clock.
pub fn now_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Coerce every temporal claim in `claims`, resolving durations against
/// `now` (epoch seconds).  Other claims are moved over untouched.
pub fn coerce(claims: ClaimSet, now: i64) -> Result<Claims, JwtError> {
    let iat = coerce_claim("iat", claims.iat, now)?;
    let nbf = claims
        .nbf
        .map(|v| coerce_claim("nbf", v, now))
        .transpose()?;
    let exp = claims
        .exp
        .map(|v| coerce_claim("exp", v, now))
        .transpose()?;

    Ok(Claims {
        iat: Some(iat),
        nbf,
        exp,
        aud: claims.aud.map(crate::claims::Audience::Single),
        iss: claims.iss,
        jti: claims.jti,
        sub: claims.sub,
        extra: claims.extra,
    })
}

/// Coerce a single claim value.  `name` is only used for the error.
pub fn coerce_claim(name: &'static str, value: TimeClaim, now: i64) -> Result<i64, JwtError> {
    let expr = match value {
        TimeClaim::Seconds(secs) => return Ok(secs),
        TimeClaim::Expr(expr) => expr,
    };

    if let Some(secs) = parse_date(&expr) {
        if secs < 0 {
            return Err(JwtError::ClaimFormat { claim: name });
        }
        return Ok(secs);
    }

    if let Some(secs) = parse_duration(&expr) {
        return now
            .checked_add(secs)
            .ok_or(JwtError::ClaimFormat { claim: name });
    }

    tracing::debug!(claim = name, value = %expr, "temporal claim matches no date or duration");
    Err(JwtError::ClaimFormat { claim: name })
}

/// Midnight UTC of a `DD-MM-YYYY`-style date, in epoch seconds.
pub fn parse_date(s: &str) -> Option<i64> {
    let caps = DATE.captures(s)?;
    if caps[2] != caps[4] {
        return None;
    }
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[3].parse().ok()?;
    let year_digits = &caps[5];
    let mut year: i32 = year_digits.parse().ok()?;
    if year_digits.len() == 2 {
        year += if year <= 68 { 2000 } else { 1900 };
    }

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
}

/// Length of a duration expression in whole seconds.
pub fn parse_duration(s: &str) -> Option<i64> {
    let caps = DURATION.captures(s)?;
    let n: f64 = caps[1].parse().ok()?;
    let unit_ms = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        None => 1.0,
        Some(u) if u.starts_with('d') => MS_PER_DAY,
        Some(_) => MS_PER_YEAR,
    };
    let secs = (n * unit_ms / 1000.0).floor();
    if secs.is_finite() && secs < i64::MAX as f64 {
        Some(secs as i64)
    } else {
        None
    }
}
