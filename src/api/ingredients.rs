use serde::Deserialize;
use sqlx::{Pool, Postgres};
use warp::{Rejection, Reply};

use crate::{actions::ingredients, error::ApiError, schema::Id};

#[derive(Debug, Default, Deserialize)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

pub async fn list_ingredients(
    query: IngredientQuery,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let ingredients = ingredients::search_ingredients(query.name.as_deref(), &pool).await?;

    Ok(warp::reply::json(&ingredients))
}

pub async fn get_ingredient(id: Id, pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let ingredient = ingredients::get_ingredient(id, &pool).await?.ok_or_else(|| {
        ApiError::NotFound("no ingredient exists with the specified id".to_string()).reject()
    })?;

    Ok(warp::reply::json(&ingredient))
}
