use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::domain::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Manager,
    Auditor,
}

impl UserRole {
    pub const fn label(self) -> &'static str {
        match self {
            UserRole::Manager => "manager",
            UserRole::Auditor => "auditor",
        }
    }
}

impl FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manager" => Ok(UserRole::Manager),
            "auditor" => Ok(UserRole::Auditor),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown user role '{0}' (expected manager or auditor)")]
pub struct UnknownRole(pub String);

/// Identity every service call acts as. Injected at construction instead of being
/// provisioned on demand, so no request mutates user state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    pub user_id: UserId,
    pub email: String,
    pub role: UserRole,
}

impl ServiceIdentity {
    pub fn manager(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            role: UserRole::Manager,
        }
    }

    pub fn auditor(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            role: UserRole::Auditor,
        }
    }

    pub fn can_manage_attributes(&self) -> bool {
        self.role == UserRole::Manager
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.email, self.role.label())
    }
}
