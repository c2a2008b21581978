//! Immutable guard configuration, built once at startup.

use axum::http::uri::PathAndQuery;
use secrecy::SecretString;
use std::time::Duration;

use super::roles::RoleSet;

pub const DEFAULT_COOKIE_NAME: &str = "staff_session";
pub const DEFAULT_PROTECTED_PREFIX: &str = "/staff";
pub const DEFAULT_LOGIN_PATH: &str = "/staff/login";
pub const DEFAULT_LOGOUT_PATH: &str = "/staff/logout";
pub const DEFAULT_FORBIDDEN_PATH: &str = "/forbidden";
pub const DEFAULT_VERIFY_PATH: &str = "/api/auth/verify";
pub const DEFAULT_VERIFY_TIMEOUT_MS: u64 = 1500;

#[derive(Clone, Debug)]
pub struct GuardConfig {
    cookie_name: String,
    protected_prefix: String,
    login_path: String,
    bypass_paths: Vec<String>,
    forbidden_path: String,
    allowed_roles: RoleSet,
    secret: Option<SecretString>,
    authority_url: Option<String>,
    verify_path: String,
    verify_timeout: Duration,
    disabled: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            protected_prefix: DEFAULT_PROTECTED_PREFIX.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            bypass_paths: vec![DEFAULT_LOGOUT_PATH.to_string()],
            forbidden_path: DEFAULT_FORBIDDEN_PATH.to_string(),
            allowed_roles: RoleSet::default(),
            secret: None,
            authority_url: None,
            verify_path: DEFAULT_VERIFY_PATH.to_string(),
            verify_timeout: Duration::from_millis(DEFAULT_VERIFY_TIMEOUT_MS),
            disabled: false,
        }
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: String) -> Self {
        self.cookie_name = name;
        self
    }

    #[must_use]
    pub fn with_protected_prefix(mut self, prefix: String) -> Self {
        self.protected_prefix = normalize_prefix(&prefix);
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: String) -> Self {
        self.login_path = path;
        self
    }

    /// Replace the extra bypass paths (the login path is always bypassed).
    #[must_use]
    pub fn with_bypass_paths(mut self, paths: Vec<String>) -> Self {
        self.bypass_paths = paths;
        self
    }

    #[must_use]
    pub fn with_forbidden_path(mut self, path: String) -> Self {
        self.forbidden_path = path;
        self
    }

    #[must_use]
    pub fn with_allowed_roles(mut self, roles: RoleSet) -> Self {
        self.allowed_roles = roles;
        self
    }

    #[must_use]
    pub fn with_secret(mut self, secret: Option<SecretString>) -> Self {
        self.secret = secret;
        self
    }

    #[must_use]
    pub fn with_authority_url(mut self, url: Option<String>) -> Self {
        self.authority_url = url;
        self
    }

    #[must_use]
    pub fn with_verify_path(mut self, path: String) -> Self {
        self.verify_path = path;
        self
    }

    #[must_use]
    pub fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    /// Development only: every request is allowed.
    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn protected_prefix(&self) -> &str {
        &self.protected_prefix
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn bypass_paths(&self) -> &[String] {
        &self.bypass_paths
    }

    #[must_use]
    pub fn forbidden_path(&self) -> &str {
        &self.forbidden_path
    }

    #[must_use]
    pub fn allowed_roles(&self) -> &RoleSet {
        &self.allowed_roles
    }

    pub(super) fn secret(&self) -> Option<&SecretString> {
        self.secret.as_ref()
    }

    #[must_use]
    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    #[must_use]
    pub fn authority_url(&self) -> Option<&str> {
        self.authority_url.as_deref()
    }

    #[must_use]
    pub fn verify_path(&self) -> &str {
        &self.verify_path
    }

    #[must_use]
    pub fn verify_timeout(&self) -> Duration {
        self.verify_timeout
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// True when `path` equals the protected prefix or sits below it.
    ///
    /// The canonical form of the path is checked too, so `//staff`,
    /// `/%73taff` or `/public/../staff` stay protected.
    #[must_use]
    pub fn is_protected(&self, path: &str) -> bool {
        let prefix = self.protected_prefix.as_str();
        if prefix == "/" {
            return true;
        }
        let under = |p: &str| {
            p.strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        };
        under(path) || under(&canonical_path(path))
    }

    /// Exact match against the login path and the extra bypass paths.
    #[must_use]
    pub fn is_bypass(&self, path: &str) -> bool {
        path == self.login_path || self.bypass_paths.iter().any(|p| p == path)
    }

    /// Check that every configured route is an absolute path.
    ///
    /// # Errors
    /// Returns a message naming the first offending path.
    pub fn validate(&self) -> Result<(), String> {
        let paths = [
            ("protected prefix", self.protected_prefix.as_str()),
            ("login path", self.login_path.as_str()),
            ("forbidden path", self.forbidden_path.as_str()),
            ("verify path", self.verify_path.as_str()),
        ];
        for (name, path) in paths
            .into_iter()
            .chain(self.bypass_paths.iter().map(|p| ("bypass path", p.as_str())))
        {
            if !path.starts_with('/')
                || path.contains(['?', '#', ' '])
                || path.parse::<PathAndQuery>().is_err()
            {
                return Err(format!("invalid {name}: {path:?} must be an absolute path"));
            }
        }
        if self.cookie_name.is_empty() || self.cookie_name.contains([';', '=', ' ']) {
            return Err(format!("invalid cookie name: {:?}", self.cookie_name));
        }
        if self.allowed_roles.is_empty() {
            return Err("allowed roles must not be empty".to_string());
        }
        Ok(())
    }
}

/// Percent-decoded path with empty and dot segments resolved.
fn canonical_path(path: &str) -> String {
    let decoded = urlencoding::decode_binary(path.as_bytes());
    let decoded = String::from_utf8_lossy(&decoded);
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        return "/".to_string();
    }
    segments.iter().fold(String::new(), |mut out, segment| {
        out.push('/');
        out.push_str(segment);
        out
    })
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GuardConfig::new();
        assert_eq!(config.cookie_name(), "staff_session");
        assert_eq!(config.protected_prefix(), "/staff");
        assert_eq!(config.login_path(), "/staff/login");
        assert_eq!(config.bypass_paths(), ["/staff/logout".to_string()]);
        assert_eq!(config.forbidden_path(), "/forbidden");
        assert_eq!(config.verify_path(), "/api/auth/verify");
        assert_eq!(config.verify_timeout(), Duration::from_millis(1500));
        assert!(!config.has_secret());
        assert!(!config.is_disabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn protected_prefix_matches_segments_only() {
        let config = GuardConfig::new();
        assert!(config.is_protected("/staff"));
        assert!(config.is_protected("/staff/"));
        assert!(config.is_protected("/staff/leads/42"));
        assert!(!config.is_protected("/staffing"));
        assert!(!config.is_protected("/"));
        assert!(!config.is_protected("/health"));
    }

    #[test]
    fn protected_prefix_survives_path_tricks() {
        let config = GuardConfig::new();
        for path in [
            "//staff/leads",
            "/%73taff/leads",
            "/%2Fstaff",
            "/public/../staff/leads",
            "/./staff",
            "/staff%2Fleads",
        ] {
            assert!(config.is_protected(path), "{path} must be protected");
        }
        assert!(!config.is_protected("/%73taffing"));
        assert!(!config.is_protected("/public/%2e%2e/assets"));
    }

    #[test]
    fn canonical_path_forms() {
        assert_eq!(canonical_path("/"), "/");
        assert_eq!(canonical_path(""), "/");
        assert_eq!(canonical_path("/a//b/./c/../d/"), "/a/b/d");
        assert_eq!(canonical_path("/../../x"), "/x");
        assert_eq!(canonical_path("/%41%zz%"), "/A%zz%");
    }

    #[test]
    fn protected_prefix_is_normalized() {
        let config = GuardConfig::new().with_protected_prefix("/admin/".to_string());
        assert_eq!(config.protected_prefix(), "/admin");
        assert!(config.is_protected("/admin/users"));

        let config = GuardConfig::new().with_protected_prefix("/".to_string());
        assert!(config.is_protected("/anything"));
    }

    #[test]
    fn bypass_is_exact() {
        let config = GuardConfig::new();
        assert!(config.is_bypass("/staff/login"));
        assert!(config.is_bypass("/staff/logout"));
        assert!(!config.is_bypass("/staff/login/"));
        assert!(!config.is_bypass("/staff/login/extra"));
        assert!(!config.is_bypass("/staff"));
    }

    #[test]
    fn validate_rejects_relative_paths() {
        let config = GuardConfig::new().with_forbidden_path("forbidden".to_string());
        assert!(config.validate().is_err());

        let config = GuardConfig::new().with_bypass_paths(vec!["/ok".into(), "nope".into()]);
        let err = config.validate().err().unwrap_or_default();
        assert!(err.contains("bypass path"));
    }

    #[test]
    fn validate_rejects_unparseable_forbidden_path() {
        for path in ["/deny<ed>", "/den\tied"] {
            let config = GuardConfig::new().with_forbidden_path(path.to_string());
            let err = config.validate().err().unwrap_or_default();
            assert!(err.contains("forbidden path"), "path {path:?}");
        }
        assert!(GuardConfig::new().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_cookie_and_empty_roles() {
        let config = GuardConfig::new().with_cookie_name("a;b".to_string());
        assert!(config.validate().is_err());

        let config = GuardConfig::new().with_allowed_roles(RoleSet::parse(" , "));
        assert!(config.validate().is_err());
    }
}
