use sqlx::{Pool, Postgres};
use warp::{Rejection, Reply};

use crate::{actions::tags, error::ApiError, schema::Id};

pub async fn list_tags(pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let tags = tags::list_tags(&pool).await?;

    Ok(warp::reply::json(&tags))
}

pub async fn get_tag(id: Id, pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let tag = tags::get_tag(id, &pool).await?.ok_or_else(|| {
        ApiError::NotFound("no tag exists with the specified id".to_string()).reject()
    })?;

    Ok(warp::reply::json(&tag))
}
