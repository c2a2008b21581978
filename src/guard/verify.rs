//! Credential verification against the local secret or the remote authority.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};

use super::{
    claims::{Claims, RawClaims},
    error::GuardError,
    remote::RemoteAuthority,
    roles::RoleSet,
};

/// HMAC verification with the shared session secret.
pub(super) struct LocalVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl LocalVerifier {
    pub(super) fn new(secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // `exp` must be strictly in the future.
        validation.leeway = 0;
        validation.reject_tokens_expiring_in_less_than = 1;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }

    fn verify(&self, token: &str) -> Result<RawClaims, GuardError> {
        Ok(decode::<RawClaims>(token, &self.key, &self.validation)?.claims)
    }
}

/// Trust source selected at startup.
pub(super) enum Verifier {
    /// A secret is configured; local results are final.
    Local(LocalVerifier),
    /// No secret; every credential is checked by the remote authority.
    Remote(RemoteAuthority),
    /// Neither a secret nor an authority; everything is refused.
    Unconfigured,
}

impl Verifier {
    pub(super) async fn verify(&self, token: &str, roles: &RoleSet) -> Result<Claims, GuardError> {
        let raw = match self {
            Self::Local(local) => local.verify(token)?,
            Self::Remote(remote) => remote.verify(token).await?,
            Self::Unconfigured => return Err(GuardError::AuthorityNotConfigured),
        };
        raw.authorize(roles)
    }

    pub(super) const fn mode(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Remote(_) => "remote",
            Self::Unconfigured => "unconfigured",
        }
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(remote) => f.debug_tuple("Remote").field(remote).finish(),
            _ => f.write_str(self.mode()),
        }
    }
}
