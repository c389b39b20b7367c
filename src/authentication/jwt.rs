use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::database::schema::{User, UserRole};
use crate::error::ApiError;

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(user: &User, session_hours: i64) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(session_hours)).timestamp();

        Self {
            user_id: user.id,
            username: user.username.to_owned(),
            role: user.role.to_owned(),
            iat,
            exp,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionData {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.authenticate(self) {
            return Err(ApiError::Forbidden(
                "you don't have permission to perform this action".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Internal(format!("invalid signing key: {e}")))
}

pub fn generate_jwt_session(
    user: &User,
    secret: &str,
    session_hours: i64,
) -> Result<String, ApiError> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(user, session_hours);

    claims
        .sign_with_key(&key)
        .map_err(|e| ApiError::Internal(format!("failed to sign session token: {e}")))
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, ApiError> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token.verify_with_key(&key).map_err(|_| ApiError::Unauthorized)?;

    if session.exp <= Utc::now().timestamp() {
        return Err(ApiError::Unauthorized);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: 7,
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: "Test".to_string(),
            last_name: "Cook".to_string(),
            password: "hash".to_string(),
            role: UserRole::User,
        }
    }

    #[test]
    fn sign_then_verify_roundtrip() {
        let token = generate_jwt_session(&test_user(), "secret", 24).unwrap();
        let session = verify_jwt_session(&token, "secret").unwrap();

        assert_eq!(session.user_id, 7);
        assert_eq!(session.username, "cook");
        assert_eq!(session.role, UserRole::User);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let token = generate_jwt_session(&test_user(), "secret", -1).unwrap();

        assert!(matches!(
            verify_jwt_session(&token, "secret"),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_jwt_session(&test_user(), "secret", 24).unwrap();

        assert!(matches!(
            verify_jwt_session(&token, "other-secret"),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn admin_flag_follows_the_role() {
        let mut user = test_user();
        user.role = UserRole::Admin;

        let token = generate_jwt_session(&user, "secret", 24).unwrap();
        let session = SessionData::from(verify_jwt_session(&token, "secret").unwrap());

        assert!(session.is_admin);
    }
}
