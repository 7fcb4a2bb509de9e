use serde::{Deserialize, Serialize};

use crate::store::models::UserRole;

/// JWT claims identifying the acting user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActorClaims {
    pub sub: String,
    pub name: String,
    pub role: UserRole,
    pub exp: usize, // Expiration timestamp (standard JWT claim)
    pub iat: usize, // Issued at timestamp (standard JWT claim)
}

/// The user on whose behalf an operation runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    pub user_id: String,
    pub name: String,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            role,
        }
    }

    /// Internal caller used by background jobs
    pub fn system() -> Self {
        Self::new("system", "System", UserRole::Admin)
    }

    /// Admins, designers, support and testers see every team's data
    pub fn is_elevated(&self) -> bool {
        matches!(
            self.role,
            UserRole::Admin | UserRole::Designer | UserRole::Support | UserRole::Tester
        )
    }

    /// Allowed to enroll and withdraw other users
    pub fn is_registrar(&self) -> bool {
        matches!(
            self.role,
            UserRole::Admin | UserRole::Registrar | UserRole::Tester
        )
    }
}

impl From<ActorClaims> for Actor {
    fn from(claims: ActorClaims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
            role: claims.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(UserRole::Admin, true, true)]
    #[case(UserRole::Designer, true, false)]
    #[case(UserRole::Support, true, false)]
    #[case(UserRole::Tester, true, true)]
    #[case(UserRole::Registrar, false, true)]
    #[case(UserRole::Member, false, false)]
    fn test_role_permissions(
        #[case] role: UserRole,
        #[case] elevated: bool,
        #[case] registrar: bool,
    ) {
        let actor = Actor::new("u", "User", role);
        assert_eq!(actor.is_elevated(), elevated);
        assert_eq!(actor.is_registrar(), registrar);
    }

    #[test]
    fn test_claims_serialization() {
        let claims = ActorClaims {
            sub: "user-1".to_string(),
            name: "Alice".to_string(),
            role: UserRole::Support,
            exp: 1234567890,
            iat: 1234567800,
        };

        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains("\"role\":\"Support\""));

        let deserialized: ActorClaims = serde_json::from_str(&json).unwrap();
        assert_eq!(Actor::from(deserialized).user_id, "user-1");
    }
}
