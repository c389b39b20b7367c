use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::{
    authentication::{cryptography::verify_password, jwt::generate_jwt_session},
    error::ApiError,
    schema::{Id, User, UserRow},
};

pub async fn get_user(id: Id, pool: &Pool<Postgres>) -> Result<Option<User>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn get_user_by_email(
    email: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn get_user_by_username(
    username: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn fetch_users(
    offset: i64,
    limit: i64,
    pool: &Pool<Postgres>,
) -> Result<Vec<UserRow>, ApiError> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "SELECT u.*, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_users_by_ids(
    ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, User>, ApiError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    Ok(users.into_iter().map(|user| (user.id, user)).collect())
}

pub async fn register_user(
    email: &str,
    username: &str,
    first_name: &str,
    last_name: &str,
    password_hash: &str,
    pool: &Pool<Postgres>,
) -> Result<User, ApiError> {
    let user: User = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(email)
    .bind(username)
    .bind(first_name)
    .bind(last_name)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

/// Checks the credentials and mints a signed session token.
pub async fn login_user(
    email: &str,
    password: &str,
    secret: &str,
    session_hours: i64,
    pool: &Pool<Postgres>,
) -> Result<String, ApiError> {
    let user = get_user_by_email(email, pool).await?.ok_or_else(|| {
        ApiError::BadRequest("unable to log in with the provided credentials".to_string())
    })?;

    if !verify_password(password, &user.password)? {
        return Err(ApiError::BadRequest(
            "unable to log in with the provided credentials".to_string(),
        ));
    }

    generate_jwt_session(&user, secret, session_hours)
}
