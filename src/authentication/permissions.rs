use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnMarks,
            ActionType::ManageOwnSubscriptions,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnMarks,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageAllRecipes,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,
    ManageOwnRecipes,
    /// Favorite and shopping-cart marks.
    ManageOwnMarks,
    ManageOwnSubscriptions,

    ManageAllRecipes,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        let role = &session.role;

        ACTION_TABLE
            .iter()
            .find_map(|(table_role, actions)| {
                if role != table_role {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: UserRole) -> SessionData {
        SessionData {
            user_id: 1,
            username: "cook".to_string(),
            is_admin: role == UserRole::Admin,
            role,
        }
    }

    #[test]
    fn regular_users_manage_only_their_own_recipes() {
        let session = session(UserRole::User);

        assert!(ActionType::CreateRecipes.authenticate(&session));
        assert!(ActionType::ManageOwnRecipes.authenticate(&session));
        assert!(!ActionType::ManageAllRecipes.authenticate(&session));
    }

    #[test]
    fn admins_manage_all_recipes() {
        let session = session(UserRole::Admin);

        assert!(ActionType::ManageAllRecipes.authenticate(&session));
        assert!(session.authenticate(ActionType::ManageOwnMarks).is_ok());
    }

    #[test]
    fn denied_action_is_a_forbidden_error() {
        let session = session(UserRole::User);

        assert!(session.authenticate(ActionType::ManageAllRecipes).is_err());
    }
}
