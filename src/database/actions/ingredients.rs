use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::{
    error::ApiError,
    schema::{Id, Ingredient, RecipeIngredient},
};

/// Lists the catalog, optionally narrowed to names starting with `prefix`.
/// Matching is case-insensitive.
pub async fn search_ingredients(
    prefix: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ApiError> {
    let ingredients: Vec<Ingredient> = match prefix {
        Some(prefix) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name")
                .bind(format!("{prefix}%"))
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(ingredients)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, ApiError> {
    let ingredient: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(ingredient)
}

pub async fn count_ingredients(ids: &[Id], pool: &Pool<Postgres>) -> Result<i64, ApiError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

pub async fn upsert_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, ApiError> {
    let ingredient: Ingredient = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET measurement_unit = EXCLUDED.measurement_unit
        RETURNING *
    ",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_one(pool)
    .await?;

    Ok(ingredient)
}

/// Quantified ingredients of every listed recipe, grouped by recipe id.
pub async fn list_recipe_ingredients(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, Vec<RecipeIngredient>>, ApiError> {
    if recipe_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT ri.recipe_id, ri.ingredient_id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    let mut map: HashMap<Id, Vec<RecipeIngredient>> = HashMap::new();
    for row in rows {
        map.entry(row.recipe_id).or_default().push(row);
    }

    Ok(map)
}
