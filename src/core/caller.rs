use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role tag forwarded by the upstream identity gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Contractor,
    Admin,
    SuperAdmin,
    /// Service-to-service calls on the internal API
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Contractor => "contractor",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
            Self::System => "system",
        }
    }

    pub fn is_admin_tier(&self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// `system` is never accepted from request headers.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "contractor" => Ok(Self::Contractor),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            _ => Err(format!("Unknown role: {}", value)),
        }
    }
}

/// Authenticated caller of an orchestrator operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::new(id, Role::User)
    }

    pub fn contractor(id: impl Into<String>) -> Self {
        Self::new(id, Role::Contractor)
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn system() -> Self {
        Self::new("system", Role::System)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin_tier()
    }
}
