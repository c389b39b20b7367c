use warp::{reject::Rejection, Filter};

use crate::error::ApiError;

use super::jwt::{verify_jwt_session, SessionData};

/// Requires a valid session cookie; rejects with 401 otherwise.
pub fn with_session(
    secret: String,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>("session").and_then(move |token: Option<String>| {
        let secret = secret.clone();
        async move {
            match token {
                Some(token) => verify_jwt_session(&token, &secret)
                    .map(SessionData::from)
                    .map_err(ApiError::reject),
                None => Err(ApiError::Unauthorized.reject()),
            }
        }
    })
}

/// Extracts a session when a valid cookie is present, `None` otherwise.
/// Anonymous requests pass through.
pub fn with_possible_session(
    secret: String,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>("session").and_then(move |token: Option<String>| {
        let secret = secret.clone();
        async move {
            let session = token
                .and_then(|token| verify_jwt_session(&token, &secret).ok())
                .map(SessionData::from);

            Ok::<Option<SessionData>, Rejection>(session)
        }
    })
}
