use crate::claims::Claims;
use crate::coerce::now_seconds;

/// Which temporal rule a payload broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TemporalViolation {
    #[error("token is issued in the future")]
    IssuedInFuture,
    #[error("token is not yet valid")]
    NotYetValid,
    #[error("token has expired")]
    Expired,
}

/// Check `iat`, `nbf` and `exp` against `now` (epoch seconds).
///
/// `leeway` widens every bound by that many seconds.  `exp` is exclusive: a
/// token stops being valid at the `exp` instant.  Missing claims are not
/// checked.
pub fn check(claims: &Claims, now: i64, leeway: u64) -> Result<(), TemporalViolation> {
    let leeway = i64::try_from(leeway).unwrap_or(i64::MAX);
    let late = now.saturating_add(leeway);
    let early = now.saturating_sub(leeway);

    if matches!(claims.iat, Some(iat) if iat > late) {
        return Err(TemporalViolation::IssuedInFuture);
    }
    if matches!(claims.nbf, Some(nbf) if nbf > late) {
        return Err(TemporalViolation::NotYetValid);
    }
    if matches!(claims.exp, Some(exp) if early >= exp) {
        return Err(TemporalViolation::Expired);
    }
    Ok(())
}

/// `true` if the payload is valid right now, with no leeway.
pub fn is_currently_valid(claims: &Claims) -> bool {
    check(claims, now_seconds(), 0).is_ok()
}
