use serde::{Deserialize, Serialize};

/// Account role. Immutable after the identity is created; there is no
/// promotion/demotion flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Coordinator,
    Admin,
}

impl Role {
    /// Canonical home area for the role. Every role has exactly one.
    pub fn home(self) -> &'static str {
        match self {
            Role::Student => "/dashboard",
            Role::Coordinator => "/coordinator",
            Role::Admin => "/admin",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Coordinator => "coordinator",
            Role::Admin => "admin",
        }
    }
}

/// An authenticated user's profile data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: String,
    /// Home department; for coordinators this scopes which students they manage.
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub program: Option<String>,
    /// Institutional identifier; doubles as the login username for students.
    #[serde(default)]
    pub register_no: Option<String>,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_role_has_a_distinct_home() {
        assert_eq!(Role::Student.home(), "/dashboard");
        assert_eq!(Role::Coordinator.home(), "/coordinator");
        assert_eq!(Role::Admin.home(), "/admin");
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Coordinator).unwrap(), "\"coordinator\"");
        let r: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(r, Role::Admin);
    }
}
