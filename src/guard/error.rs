use thiserror::Error;

/// Internal reasons a credential was refused.
///
/// Every variant collapses to [`super::Decision::Deny`]; the variant only shows
/// up in logs and in direct calls to [`super::Guard::verify_credential`].
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("no credential in cookie or authorization header")]
    MissingCredential,
    #[error("malformed credential")]
    MalformedCredential,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("credential expired")]
    Expired,
    #[error("role not permitted")]
    RoleNotPermitted,
    #[error("verification authority unavailable")]
    AuthorityUnavailable,
    #[error("verification authority rejected credential: {0}")]
    AuthorityRejected(u16),
    #[error("verification authority not configured")]
    AuthorityNotConfigured,
    #[error("invalid credential or role")]
    Invalid,
}

impl From<jsonwebtoken::errors::Error> for GuardError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => Self::MalformedCredential,
            _ => Self::Invalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GuardError;
    use jsonwebtoken::errors::{Error, ErrorKind};

    #[test]
    fn jwt_errors_map_to_guard_errors() {
        assert!(matches!(
            GuardError::from(Error::from(ErrorKind::ExpiredSignature)),
            GuardError::Expired
        ));
        assert!(matches!(
            GuardError::from(Error::from(ErrorKind::InvalidSignature)),
            GuardError::InvalidSignature
        ));
        assert!(matches!(
            GuardError::from(Error::from(ErrorKind::InvalidToken)),
            GuardError::MalformedCredential
        ));
        assert!(matches!(
            GuardError::from(Error::from(ErrorKind::ImmatureSignature)),
            GuardError::Invalid
        ));
    }

    #[test]
    fn authority_rejection_reports_status() {
        assert_eq!(
            GuardError::AuthorityRejected(401).to_string(),
            "verification authority rejected credential: 401"
        );
    }
}
