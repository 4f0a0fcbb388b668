use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

/// User roles.
///
/// Stored in the database as the flat display strings below (`users.role` is
/// TEXT), matching the one-role-per-user model. Parsing happens at login and
/// session validation; an unrecognized role string in the database means the
/// user cannot log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Initiator,
    Investigator,
    Reviewer,
    Approver,
    LegalReviewer,
    Actioner,
    Admin,
}

pub const ALL_ROLES: [Role; 7] = [
    Role::Initiator,
    Role::Investigator,
    Role::Reviewer,
    Role::Approver,
    Role::LegalReviewer,
    Role::Actioner,
    Role::Admin,
];

impl Role {
    /// Display string, also the value stored in `users.role`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Initiator => "Initiator",
            Role::Investigator => "Investigator",
            Role::Reviewer => "Reviewer",
            Role::Approver => "Approver",
            Role::LegalReviewer => "Legal Reviewer",
            Role::Actioner => "Actioner",
            Role::Admin => "Admin",
        }
    }

    /// Parses a role from its stored string. Case-insensitive and tolerant of
    /// surrounding whitespace; returns None (with a warning) for anything else.
    pub fn from_string(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "initiator" => Some(Role::Initiator),
            "investigator" => Some(Role::Investigator),
            "reviewer" => Some(Role::Reviewer),
            "approver" => Some(Role::Approver),
            "legal reviewer" => Some(Role::LegalReviewer),
            "actioner" => Some(Role::Actioner),
            "admin" => Some(Role::Admin),
            _ => {
                warn!("Unrecognized role string: '{}'", s);
                None
            }
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_string_roundtrip() {
        for role in ALL_ROLES.iter() {
            assert_eq!(Role::from_string(role.as_str()), Some(*role));
        }
    }

    #[test]
    fn test_from_string_case_insensitive() {
        assert_eq!(Role::from_string("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::from_string("  legal reviewer "), Some(Role::LegalReviewer));
        assert_eq!(Role::from_string("Legal Reviewer"), Some(Role::LegalReviewer));
    }

    #[test]
    fn test_from_string_rejects_unknown() {
        assert_eq!(Role::from_string("Superuser"), None);
        assert_eq!(Role::from_string(""), None);
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(Role::LegalReviewer.to_string(), "Legal Reviewer");
        assert_eq!(Role::Admin.to_string(), "Admin");
    }

    #[test]
    fn test_is_admin() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Reviewer.is_admin());
    }
}
