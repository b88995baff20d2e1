use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::schema::ValidationError;
use crate::temporal::TemporalViolation;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

/// Errors from signing, verifying and bearer extraction.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// The options failed structural validation.  Displays the humanized
    /// field messages.
    #[error("{0}")]
    Schema(ValidationError),

    #[error("Claim {claim} is not a recognized date or duration")]
    ClaimFormat { claim: &'static str },

    #[error("Token cannot be decoded as invalid format")]
    Decode,

    #[error("JWT is not currently valid: {0}")]
    Temporal(TemporalViolation),

    #[error("Token signature cannot be verified")]
    SignatureVerification,

    #[error("Unusable key: {0}")]
    Key(String),

    #[error("Signing engine failed: {0}")]
    Engine(String),

    #[error("Not configured: {0}")]
    Config(String),

    #[error("Missing authorization header")]
    MissingHeader,

    #[error("Invalid authorization header format")]
    InvalidHeaderFormat,

    #[error("Invalid bearer token format")]
    InvalidBearerFormat,
}

/// Fieldless category of a [`JwtError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Schema,
    ClaimFormat,
    Decode,
    Temporal,
    SignatureVerification,
    Key,
    Engine,
    Config,
    Bearer,
}

impl JwtError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema(_) => ErrorKind::Schema,
            Self::ClaimFormat { .. } => ErrorKind::ClaimFormat,
            Self::Decode => ErrorKind::Decode,
            Self::Temporal(_) => ErrorKind::Temporal,
            Self::SignatureVerification => ErrorKind::SignatureVerification,
            Self::Key(_) => ErrorKind::Key,
            Self::Engine(_) => ErrorKind::Engine,
            Self::Config(_) => ErrorKind::Config,
            Self::MissingHeader | Self::InvalidHeaderFormat | Self::InvalidBearerFormat => {
                ErrorKind::Bearer
            }
        }
    }
}

impl From<ValidationError> for JwtError {
    fn from(e: ValidationError) -> Self {
        Self::Schema(e)
    }
}

impl From<TemporalViolation> for JwtError {
    fn from(v: TemporalViolation) -> Self {
        Self::Temporal(v)
    }
}

impl IntoResponse for JwtError {
    fn into_response(self) -> Response {
        // Schema/key failures on the verify side mean the server's verifier
        // is misconfigured, not that the caller sent a bad token.
        let status = match self.kind() {
            ErrorKind::Schema | ErrorKind::Key | ErrorKind::Engine | ErrorKind::Config => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        };

        let body = ErrorBody {
            error: self.to_string(),
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}
