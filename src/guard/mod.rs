//! Staff session guard.
//!
//! Flow Overview (per request, no state kept between requests):
//! 1. Kill-switch: a disabled guard allows everything.
//! 2. Paths outside the protected prefix are not subject to the guard.
//! 3. The login path and the other bypass paths are always allowed.
//! 4. The credential is read from the session cookie, then the bearer header.
//! 5. The credential is verified locally (secret configured) or by the remote
//!    authority (no secret), and its role must be in the allowed set.
//!
//! Security boundaries: a configured secret is authoritative. A local failure
//! never falls back to the remote authority, so a bad token cannot be passed
//! off as an authority outage. Every failure yields the same [`Decision::Deny`].

mod claims;
mod config;
mod credential;
mod error;
mod middleware;
mod remote;
mod roles;
mod verify;

pub use claims::Claims;
pub use config::{
    DEFAULT_COOKIE_NAME, DEFAULT_FORBIDDEN_PATH, DEFAULT_LOGIN_PATH, DEFAULT_LOGOUT_PATH,
    DEFAULT_PROTECTED_PREFIX, DEFAULT_VERIFY_PATH, DEFAULT_VERIFY_TIMEOUT_MS, GuardConfig,
};
pub use credential::{CredentialSource, extract as extract_credential};
pub use error::GuardError;
pub use middleware::require_staff_session;
pub use remote::RemoteAuthority;
pub use roles::{DEFAULT_ALLOWED_ROLES, RoleSet};

use anyhow::{Result, anyhow};
use axum::http::HeaderMap;
use tracing::{debug, info, instrument, warn};

use self::verify::{LocalVerifier, Verifier};

/// Outcome of [`Guard::authorize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

#[derive(Debug)]
pub struct Guard {
    config: GuardConfig,
    verifier: Verifier,
}

impl Guard {
    /// Build the guard and pick its trust source.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the remote
    /// authority client cannot be built.
    pub fn new(config: GuardConfig) -> Result<Self> {
        config.validate().map_err(|e| anyhow!(e))?;

        let verifier = if let Some(secret) = config.secret() {
            Verifier::Local(LocalVerifier::new(secret))
        } else if let Some(url) = config.authority_url() {
            Verifier::Remote(RemoteAuthority::new(
                url,
                config.verify_path(),
                config.verify_timeout(),
            )?)
        } else {
            Verifier::Unconfigured
        };

        if config.is_disabled() {
            warn!("staff session guard is DISABLED; every request is allowed (development only)");
        } else if matches!(verifier, Verifier::Unconfigured) {
            warn!("no session secret and no verification authority; every protected request will be denied");
        }

        Ok(Self { config, verifier })
    }

    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Trust source in use: `local`, `remote` or `unconfigured`.
    #[must_use]
    pub fn mode(&self) -> &'static str {
        self.verifier.mode()
    }

    /// Decide whether a request for `path` carrying `headers` may proceed.
    #[instrument(skip(self, headers), fields(mode = self.mode()))]
    pub async fn authorize(&self, path: &str, headers: &HeaderMap) -> Decision {
        if self.config.is_disabled()
            || !self.config.is_protected(path)
            || self.config.is_bypass(path)
        {
            return Decision::Allow;
        }

        let Some((token, source)) = credential::extract(headers, self.config.cookie_name()) else {
            info!(cause = %GuardError::MissingCredential, "staff session denied");
            return Decision::Deny;
        };

        match self.verify_credential(&token).await {
            Ok(claims) => {
                debug!(role = %claims.role, ?source, "staff session allowed");
                Decision::Allow
            }
            Err(err) => {
                info!(cause = %err, ?source, "staff session denied");
                Decision::Deny
            }
        }
    }

    /// Verify a bearer credential and return its claims.
    ///
    /// # Errors
    /// Returns the internal cause when the credential is refused.
    pub async fn verify_credential(&self, token: &str) -> Result<Claims, GuardError> {
        if token.is_empty() {
            return Err(GuardError::MissingCredential);
        }
        self.verifier
            .verify(token, self.config.allowed_roles())
            .await
    }
}
