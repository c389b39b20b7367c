use std::collections::HashSet;

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    authentication::{jwt::SessionData, permissions::ActionType},
    database::actions::{ingredients, tags},
    error::ApiError,
    schema::{Id, Recipe, RecipeRow},
};

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    /// (ingredient id, amount) pairs, already validated for duplicates.
    pub ingredients: Vec<(Id, i32)>,
    pub tags: Vec<Id>,
}

#[derive(Debug, Clone, Default)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    pub cooking_time: Option<i32>,
    pub ingredients: Vec<(Id, i32)>,
    pub tags: Vec<Id>,
}

#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, ApiError> {
    let recipe: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(recipe)
}

/// Fetches a recipe for modification. The caller must hold a session that is
/// either the recipe's author or an administrator.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("no recipe exists with the specified id".to_string()))?;

    if session.authenticate(ActionType::ManageAllRecipes).is_ok()
        || recipe.author_id == session.user_id
    {
        Ok(recipe)
    } else {
        Err(ApiError::Forbidden(
            "you don't have permission to modify this recipe".to_string(),
        ))
    }
}

async fn check_references(
    ingredient_ids: &[Id],
    tag_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let distinct_ingredients: HashSet<Id> = ingredient_ids.iter().copied().collect();
    let distinct_ingredients: Vec<Id> = distinct_ingredients.into_iter().collect();
    if ingredients::count_ingredients(&distinct_ingredients, pool).await?
        != distinct_ingredients.len() as i64
    {
        return Err(ApiError::BadRequest(
            "one or more ingredients do not exist".to_string(),
        ));
    }

    if tags::count_tags(tag_ids, pool).await? != tag_ids.len() as i64 {
        return Err(ApiError::BadRequest(
            "one or more tags do not exist".to_string(),
        ));
    }

    Ok(())
}

pub async fn create_recipe(
    author_id: Id,
    recipe: &NewRecipe,
    pool: &Pool<Postgres>,
) -> Result<Id, ApiError> {
    check_references(
        &recipe.ingredients.iter().map(|(id, _)| *id).collect::<Vec<Id>>(),
        &recipe.tags,
        pool,
    )
    .await?;

    let mut tx = pool.begin().await?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&recipe.name)
    .bind(&recipe.image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::BadRequest(_) => {
            ApiError::BadRequest("you already have a recipe with this name".to_string())
        }
        other => other,
    })?;

    insert_ingredients(id.0, &recipe.ingredients, &mut tx).await?;
    insert_tags(id.0, &recipe.tags, &mut tx).await?;

    tx.commit().await?;

    Ok(id.0)
}

/// Applies a patch to the recipe row and replaces its ingredient and tag sets
/// in one transaction.
pub async fn update_recipe(
    recipe_id: Id,
    patch: &RecipePatch,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    check_references(
        &patch.ingredients.iter().map(|(id, _)| *id).collect::<Vec<Id>>(),
        &patch.tags,
        pool,
    )
    .await?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        "
        UPDATE recipes SET
            name = COALESCE($1, name),
            image = COALESCE($2, image),
            text = COALESCE($3, text),
            cooking_time = COALESCE($4, cooking_time)
        WHERE id = $5
    ",
    )
    .bind(&patch.name)
    .bind(&patch.image)
    .bind(&patch.text)
    .bind(patch.cooking_time)
    .bind(recipe_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::BadRequest(_) => {
            ApiError::BadRequest("you already have a recipe with this name".to_string())
        }
        other => other,
    })?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;
    insert_ingredients(recipe_id, &patch.ingredients, &mut tx).await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;
    insert_tags(recipe_id, &patch.tags, &mut tx).await?;

    tx.commit().await?;

    Ok(())
}

async fn insert_ingredients(
    recipe_id: Id,
    ingredients: &[(Id, i32)],
    tx: &mut sqlx::Transaction<'_, Postgres>,
) -> Result<(), ApiError> {
    if ingredients.is_empty() {
        return Ok(());
    }

    let mut query =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    query.push_values(ingredients, |mut builder, (ingredient_id, amount)| {
        builder
            .push_bind(recipe_id)
            .push_bind(*ingredient_id)
            .push_bind(*amount);
    });

    query.build().execute(&mut **tx).await?;

    Ok(())
}

async fn insert_tags(
    recipe_id: Id,
    tags: &[Id],
    tx: &mut sqlx::Transaction<'_, Postgres>,
) -> Result<(), ApiError> {
    if tags.is_empty() {
        return Ok(());
    }

    let mut query = QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query.push_values(tags, |mut builder, tag_id| {
        builder.push_bind(recipe_id).push_bind(*tag_id);
    });

    query.build().execute(&mut **tx).await?;

    Ok(())
}

pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Newest-first recipe page. Relation filters only apply when a viewer is
/// present, the caller enforces that by passing `viewer = None` for anonymous
/// requests.
pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    offset: i64,
    limit: i64,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeRow>, ApiError> {
    let mut query =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query.push(
            " AND EXISTS (
                SELECT 1 FROM recipe_tags rt
                INNER JOIN tags t ON t.id = rt.tag_id
                WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        );
        query.push_bind(filter.tags.clone());
        query.push("))");
    }

    if let Some(viewer) = viewer {
        if filter.is_favorited {
            query.push(
                " AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
            );
            query.push_bind(viewer);
            query.push(")");
        }
        if filter.is_in_shopping_cart {
            query.push(
                " AND EXISTS (SELECT 1 FROM shopping_carts sc WHERE sc.recipe_id = r.id AND sc.user_id = ",
            );
            query.push_bind(viewer);
            query.push(")");
        }
    }

    query.push(" ORDER BY r.pub_date DESC LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(offset);

    let rows: Vec<RecipeRow> = query.build_query_as().fetch_all(pool).await?;

    Ok(rows)
}

pub async fn list_author_recipes(
    author_id: Id,
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Recipe>, ApiError> {
    let recipes: Vec<Recipe> = match limit {
        Some(limit) => {
            sqlx::query_as(
                "SELECT * FROM recipes WHERE author_id = $1 ORDER BY pub_date DESC LIMIT $2",
            )
            .bind(author_id)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM recipes WHERE author_id = $1 ORDER BY pub_date DESC")
                .bind(author_id)
                .fetch_all(pool)
                .await?
        }
    };

    Ok(recipes)
}

pub async fn count_author_recipes(author_id: Id, pool: &Pool<Postgres>) -> Result<i64, ApiError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

pub async fn add_to_favorites(
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let result = sqlx::query(
        "INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest(
            "recipe is already in favorites".to_string(),
        ));
    }

    Ok(())
}

pub async fn remove_from_favorites(
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest(
            "recipe is not in favorites".to_string(),
        ));
    }

    Ok(())
}

/// Which of the listed recipes the user has favorited.
pub async fn favorited_set(
    user_id: Id,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, ApiError> {
    if recipe_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<(Id,)> =
        sqlx::query_as("SELECT recipe_id FROM favorites WHERE user_id = $1 AND recipe_id = ANY($2)")
            .bind(user_id)
            .bind(recipe_ids)
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}
