use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{
    error::ApiError,
    schema::{Id, UserRow},
};

pub async fn subscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    if user_id == author_id {
        return Err(ApiError::BadRequest(
            "cannot subscribe to yourself".to_string(),
        ));
    }

    let result = sqlx::query(
        "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest(
            "already subscribed to this author".to_string(),
        ));
    }

    Ok(())
}

pub async fn unsubscribe(
    user_id: Id,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest(
            "not subscribed to this author".to_string(),
        ));
    }

    Ok(())
}

pub async fn fetch_followed_authors(
    user_id: Id,
    offset: i64,
    limit: i64,
    pool: &Pool<Postgres>,
) -> Result<Vec<UserRow>, ApiError> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.*, COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn is_following(
    user_id: Id,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, ApiError> {
    let row: Option<(Id,)> =
        sqlx::query_as("SELECT author_id FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

/// Which of the listed authors the user follows.
pub async fn following_set(
    user_id: Id,
    author_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, ApiError> {
    if author_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<(Id,)> =
        sqlx::query_as("SELECT author_id FROM follows WHERE user_id = $1 AND author_id = ANY($2)")
            .bind(user_id)
            .bind(author_ids)
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}
