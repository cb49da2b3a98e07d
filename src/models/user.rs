// SPDX-License-Identifier: MIT

//! User identity, role, and profile models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application role. Single-valued per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Organizer,
    Admin,
}

impl Role {
    /// Parse a role from its wire form. Returns `None` for anything outside
    /// the allowed set, so callers can reject before touching the provider.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "student" => Some(Role::Student),
            "organizer" => Some(Role::Organizer),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Organizer => "organizer",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata the identity provider stores alongside credentials at sign-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountMetadata {
    pub full_name: String,
    pub user_role: Role,
}

/// Supplementary per-user record, keyed by identity id.
///
/// Stored separately from credentials; on any disagreement with provider
/// metadata the profile is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub user_role: Role,
}

/// Normalized identity: provider account merged with the profile record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_rejects_unknown() {
        assert_eq!(Role::parse("student"), Some(Role::Student));
        assert_eq!(Role::parse("organizer"), Some(Role::Organizer));
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse("Student"), None);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Organizer).unwrap(), "\"organizer\"");
    }
}
