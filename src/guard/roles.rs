use std::collections::BTreeSet;
use std::fmt;

use super::error::GuardError;

pub const DEFAULT_ALLOWED_ROLES: &str = "staff,admin,leader";

/// Roles allowed through the guard. Membership is exact and case-sensitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            roles
                .into_iter()
                .map(Into::into)
                .filter(|role| !role.is_empty())
                .collect(),
        )
    }

    /// Parse a comma separated list, ignoring blanks around entries.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(',').map(str::trim))
    }

    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Accept a role claim only when it is present and in the set.
    pub(super) fn admit(&self, role: Option<String>) -> Result<String, GuardError> {
        match role {
            Some(role) if self.contains(&role) => Ok(role),
            _ => Err(GuardError::RoleNotPermitted),
        }
    }
}

impl Default for RoleSet {
    fn default() -> Self {
        Self::parse(DEFAULT_ALLOWED_ROLES)
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.0.iter().map(String::as_str).collect::<Vec<_>>().join(",");
        f.write_str(&joined)
    }
}

#[cfg(test)]
mod tests {
    use super::RoleSet;
    use crate::guard::GuardError;

    #[test]
    fn default_roles() {
        let roles = RoleSet::default();
        assert!(roles.contains("staff"));
        assert!(roles.contains("admin"));
        assert!(roles.contains("leader"));
        assert!(!roles.contains("guest"));
    }

    #[test]
    fn parse_trims_and_skips_blanks() {
        let roles = RoleSet::parse(" staff , ,admin,");
        assert_eq!(roles.to_string(), "admin,staff");
    }

    #[test]
    fn membership_is_case_sensitive() {
        let roles = RoleSet::parse("staff");
        assert!(!roles.contains("Staff"));
        assert!(!roles.contains("STAFF"));
        assert!(!roles.contains(" staff"));
    }

    #[test]
    fn admit_requires_present_member() {
        let roles = RoleSet::parse("staff");
        assert_eq!(roles.admit(Some("staff".to_string())).ok(), Some("staff".to_string()));
        assert!(matches!(
            roles.admit(Some("guest".to_string())),
            Err(GuardError::RoleNotPermitted)
        ));
        assert!(matches!(roles.admit(None), Err(GuardError::RoleNotPermitted)));
    }
}
