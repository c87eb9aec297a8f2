//! Role-scoped access guard.
//!
//! One `authorize` function evaluated identically on every guarded area,
//! parameterized by the required role. Redirect targets come from
//! `Role::home`, so each role has exactly one canonical home.

use super::principal::Role;
use super::session::SessionState;

/// Outcome of guarding an area against the current session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Render nothing yet; a sign-in attempt is still resolving.
    Pending,
    Allow,
    RedirectToSignIn,
    /// Wrong role for this area; send the user to their own home.
    RedirectToRoleHome(Role),
}

impl Decision {
    /// Redirect target path, when the decision is a redirect.
    pub fn redirect_path(self) -> Option<&'static str> {
        match self {
            Decision::RedirectToSignIn => Some("/login"),
            Decision::RedirectToRoleHome(role) => Some(role.home()),
            Decision::Pending | Decision::Allow => None,
        }
    }
}

/// Decide whether the current session may enter an area requiring `required`.
pub fn authorize(state: &SessionState, required: Role) -> Decision {
    match state {
        SessionState::Loading => Decision::Pending,
        SessionState::Unauthenticated => Decision::RedirectToSignIn,
        SessionState::Authenticated(identity) if identity.role != required => {
            Decision::RedirectToRoleHome(identity.role)
        }
        SessionState::Authenticated(_) => Decision::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    fn identity(role: Role) -> Identity {
        Identity {
            id: "u1".into(),
            email: "u1@example.edu".into(),
            name: "U One".into(),
            department: None,
            program: None,
            register_no: Some("CS101".into()),
            role,
        }
    }

    #[test]
    fn loading_is_pending() {
        assert_eq!(authorize(&SessionState::Loading, Role::Student), Decision::Pending);
    }

    #[test]
    fn unauthenticated_redirects_to_sign_in() {
        let d = authorize(&SessionState::Unauthenticated, Role::Admin);
        assert_eq!(d, Decision::RedirectToSignIn);
        assert_eq!(d.redirect_path(), Some("/login"));
    }

    #[test]
    fn wrong_role_redirects_to_own_home_not_allow() {
        let state = SessionState::Authenticated(identity(Role::Student));
        let d = authorize(&state, Role::Admin);
        assert_eq!(d, Decision::RedirectToRoleHome(Role::Student));
        assert_eq!(d.redirect_path(), Some("/dashboard"));
    }

    #[test]
    fn matching_role_is_allowed() {
        for role in [Role::Student, Role::Coordinator, Role::Admin] {
            let state = SessionState::Authenticated(identity(role));
            assert_eq!(authorize(&state, role), Decision::Allow);
        }
    }
}
