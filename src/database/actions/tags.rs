use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::{
    error::ApiError,
    schema::{Id, RecipeTag, Tag},
};

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, ApiError> {
    let tags: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(tags)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, ApiError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

pub async fn count_tags(ids: &[Id], pool: &Pool<Postgres>) -> Result<i64, ApiError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

/// Tags of every listed recipe, grouped by recipe id.
pub async fn list_recipe_tags(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, Vec<Tag>>, ApiError> {
    if recipe_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<RecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    let mut map: HashMap<Id, Vec<Tag>> = HashMap::new();
    for row in rows {
        map.entry(row.recipe_id).or_default().push(Tag {
            id: row.id,
            name: row.name,
            color: row.color,
            slug: row.slug,
        });
    }

    Ok(map)
}
