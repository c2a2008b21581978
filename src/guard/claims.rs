use serde::{Deserialize, Serialize};

use super::{error::GuardError, roles::RoleSet};

/// Claims of an authorized staff credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Role that passed the allowed-role check.
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiration (unix seconds). Always present for locally verified tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Claims as decoded from a token or an authority response, before the role
/// check.
#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct RawClaims {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
}

impl RawClaims {
    pub(super) fn authorize(self, roles: &RoleSet) -> Result<Claims, GuardError> {
        let role = roles.admit(self.role)?;
        Ok(Claims {
            role,
            sub: self.sub,
            email: self.email,
            exp: self.exp,
            iat: self.iat,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Claims, RawClaims};
    use crate::guard::{GuardError, RoleSet};
    use anyhow::Result;

    #[test]
    fn raw_claims_ignore_unknown_fields() -> Result<()> {
        let raw: RawClaims = serde_json::from_str(
            r#"{"role":"admin","sub":"u-1","name":"Ana","exp":1700000000,"extra":[1,2]}"#,
        )?;
        assert_eq!(raw.role.as_deref(), Some("admin"));
        assert_eq!(raw.sub.as_deref(), Some("u-1"));
        assert_eq!(raw.exp, Some(1_700_000_000));
        Ok(())
    }

    #[test]
    fn authorize_keeps_optional_claims() -> Result<()> {
        let raw = RawClaims {
            role: Some("leader".to_string()),
            email: Some("lead@example.test".to_string()),
            ..RawClaims::default()
        };
        let claims = raw.authorize(&RoleSet::default())?;
        assert_eq!(
            claims,
            Claims {
                role: "leader".to_string(),
                sub: None,
                email: Some("lead@example.test".to_string()),
                exp: None,
                iat: None,
            }
        );
        Ok(())
    }

    #[test]
    fn authorize_rejects_missing_role() {
        let result = RawClaims::default().authorize(&RoleSet::default());
        assert!(matches!(result, Err(GuardError::RoleNotPermitted)));
    }
}
