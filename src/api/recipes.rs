use sqlx::{Pool, Postgres};
use warp::{http::StatusCode, Rejection, Reply};

use crate::{
    actions::{carts, follows, recipes, users},
    actions::{
        ingredients::list_recipe_ingredients,
        recipes::RecipeFilter,
        tags::list_recipe_tags,
    },
    api::serializers::{MiniRecipe, RecipeDetail, RecipeIngredientOut, RecipePayload, UserProfile},
    database::{
        error::ApiError,
        pagination::{Page, PageQuery},
    },
    jwt::SessionData,
    permissions::ActionType,
    schema::{Id, Recipe},
};

/// Filterable recipe listing parameters. Parsed by hand because `tags` may
/// repeat, which `serde_urlencoded` cannot express.
#[derive(Debug, Default, PartialEq)]
pub struct RecipeListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeListQuery {
    pub fn parse(raw: &str) -> Self {
        let mut query = Self::default();

        for pair in raw.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let Ok(value) = urlencoding::decode(value) else {
                continue;
            };

            match key {
                "page" => query.page = value.parse().ok(),
                "limit" => query.limit = value.parse().ok(),
                "author" => query.author = value.parse().ok(),
                "tags" => query.tags.push(value.into_owned()),
                "is_favorited" => query.is_favorited = parse_bool(&value),
                "is_in_shopping_cart" => query.is_in_shopping_cart = parse_bool(&value),
                _ => {}
            }
        }

        query
    }

    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }

    pub fn filter(&self) -> RecipeFilter {
        RecipeFilter {
            author: self.author,
            tags: self.tags.clone(),
            is_favorited: self.is_favorited,
            is_in_shopping_cart: self.is_in_shopping_cart,
        }
    }

    /// Re-encodes the non-pagination parameters so page links keep the
    /// active filters.
    pub fn filter_params(&self) -> String {
        let mut params: Vec<String> = Vec::new();

        if let Some(author) = self.author {
            params.push(format!("author={author}"));
        }
        for tag in &self.tags {
            params.push(format!("tags={}", urlencoding::encode(tag)));
        }
        if self.is_favorited {
            params.push("is_favorited=1".to_string());
        }
        if self.is_in_shopping_cart {
            params.push("is_in_shopping_cart=1".to_string());
        }

        params.join("&")
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "True" | "TRUE")
}

/// Renders full recipe views, batching the relation lookups so a page costs a
/// fixed number of queries regardless of its length.
async fn build_details(
    recipes: Vec<Recipe>,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, ApiError> {
    let recipe_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let author_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.author_id).collect();

    let mut ingredients = list_recipe_ingredients(&recipe_ids, pool).await?;
    let mut tags = list_recipe_tags(&recipe_ids, pool).await?;
    let authors = users::get_users_by_ids(&author_ids, pool).await?;

    let (favorited, in_cart, following) = match viewer {
        Some(session) => (
            recipes::favorited_set(session.user_id, &recipe_ids, pool).await?,
            carts::in_cart_set(session.user_id, &recipe_ids, pool).await?,
            follows::following_set(session.user_id, &author_ids, pool).await?,
        ),
        None => Default::default(),
    };

    let mut details = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        let author = authors
            .get(&recipe.author_id)
            .ok_or_else(|| ApiError::Internal(format!("recipe {} has no author", recipe.id)))?;

        details.push(RecipeDetail {
            id: recipe.id,
            tags: tags.remove(&recipe.id).unwrap_or_default(),
            author: UserProfile::from_user(author, following.contains(&author.id)),
            ingredients: ingredients
                .remove(&recipe.id)
                .unwrap_or_default()
                .iter()
                .map(RecipeIngredientOut::from)
                .collect(),
            is_favorited: favorited.contains(&recipe.id),
            is_in_shopping_cart: in_cart.contains(&recipe.id),
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        });
    }

    Ok(details)
}

pub async fn list_recipes(
    raw_query: String,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let query = RecipeListQuery::parse(&raw_query);
    let page_query = query.page_query();

    let rows = recipes::fetch_recipes(
        &query.filter(),
        session.as_ref().map(|session| session.user_id),
        page_query.offset(),
        page_query.limit(),
        &pool,
    )
    .await?;
    let count = rows.first().map(|row| row.count).unwrap_or(0);

    let recipes: Vec<Recipe> = rows.into_iter().map(Recipe::from).collect();
    let results = build_details(recipes, session.as_ref(), &pool).await?;

    Ok(warp::reply::json(&Page::from_rows(
        results,
        count,
        &page_query,
        "/api/recipes",
        &query.filter_params(),
    )))
}

pub async fn get_recipe(
    id: Id,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let recipe = recipes::get_recipe(id, &pool).await?.ok_or_else(|| {
        ApiError::NotFound("no recipe exists with the specified id".to_string()).reject()
    })?;

    let mut details = build_details(vec![recipe], session.as_ref(), &pool).await?;
    let detail = details
        .pop()
        .ok_or_else(|| ApiError::Internal("recipe view went missing".to_string()).reject())?;

    Ok(warp::reply::json(&detail))
}

pub async fn create_recipe(
    session: SessionData,
    payload: RecipePayload,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::CreateRecipes)?;

    let new_recipe = payload.into_new_recipe()?;
    let id = recipes::create_recipe(session.user_id, &new_recipe, &pool).await?;

    let recipe = recipes::get_recipe(id, &pool)
        .await?
        .ok_or_else(|| ApiError::Internal("created recipe went missing".to_string()).reject())?;
    let mut details = build_details(vec![recipe], Some(&session), &pool).await?;
    let detail = details
        .pop()
        .ok_or_else(|| ApiError::Internal("recipe view went missing".to_string()).reject())?;

    Ok(warp::reply::with_status(
        warp::reply::json(&detail),
        StatusCode::CREATED,
    ))
}

pub async fn update_recipe(
    id: Id,
    session: SessionData,
    payload: RecipePayload,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let recipe = recipes::get_recipe_mut(id, &session, &pool).await?;

    let patch = payload.into_patch()?;
    recipes::update_recipe(recipe.id, &patch, &pool).await?;

    let recipe = recipes::get_recipe(recipe.id, &pool)
        .await?
        .ok_or_else(|| ApiError::Internal("updated recipe went missing".to_string()).reject())?;
    let mut details = build_details(vec![recipe], Some(&session), &pool).await?;
    let detail = details
        .pop()
        .ok_or_else(|| ApiError::Internal("recipe view went missing".to_string()).reject())?;

    Ok(warp::reply::json(&detail))
}

pub async fn delete_recipe(
    id: Id,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let recipe = recipes::get_recipe_mut(id, &session, &pool).await?;
    recipes::delete_recipe(recipe.id, &pool).await?;

    Ok(warp::reply::with_status(
        warp::reply(),
        StatusCode::NO_CONTENT,
    ))
}

/// Marks reference existing recipes only; a missing recipe is a client error,
/// not a 404.
async fn get_marked_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Recipe, ApiError> {
    recipes::get_recipe(id, pool).await?.ok_or_else(|| {
        ApiError::BadRequest("no recipe exists with the specified id".to_string())
    })
}

pub async fn add_favorite(
    id: Id,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnMarks)?;

    let recipe = get_marked_recipe(id, &pool).await?;
    recipes::add_to_favorites(session.user_id, recipe.id, &pool).await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&MiniRecipe::from(&recipe)),
        StatusCode::CREATED,
    ))
}

pub async fn remove_favorite(
    id: Id,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnMarks)?;

    let recipe = get_marked_recipe(id, &pool).await?;
    recipes::remove_from_favorites(session.user_id, recipe.id, &pool).await?;

    Ok(warp::reply::with_status(
        warp::reply(),
        StatusCode::NO_CONTENT,
    ))
}

pub async fn add_to_cart(
    id: Id,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnMarks)?;

    let recipe = get_marked_recipe(id, &pool).await?;
    carts::add_to_cart(session.user_id, recipe.id, &pool).await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&MiniRecipe::from(&recipe)),
        StatusCode::CREATED,
    ))
}

pub async fn remove_from_cart(
    id: Id,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnMarks)?;

    let recipe = get_marked_recipe(id, &pool).await?;
    carts::remove_from_cart(session.user_id, recipe.id, &pool).await?;

    Ok(warp::reply::with_status(
        warp::reply(),
        StatusCode::NO_CONTENT,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_tags_accumulate() {
        let query = RecipeListQuery::parse("tags=breakfast&tags=dinner&page=2");

        assert_eq!(query.tags, vec!["breakfast", "dinner"]);
        assert_eq!(query.page, Some(2));
        assert_eq!(query.author, None);
    }

    #[test]
    fn boolean_flags_accept_common_spellings() {
        assert!(RecipeListQuery::parse("is_favorited=1").is_favorited);
        assert!(RecipeListQuery::parse("is_favorited=true").is_favorited);
        assert!(RecipeListQuery::parse("is_in_shopping_cart=True").is_in_shopping_cart);
        assert!(!RecipeListQuery::parse("is_favorited=0").is_favorited);
        assert!(!RecipeListQuery::parse("is_favorited=no").is_favorited);
    }

    #[test]
    fn percent_encoded_slugs_are_decoded() {
        let query = RecipeListQuery::parse("tags=late%20night");

        assert_eq!(query.tags, vec!["late night"]);
    }

    #[test]
    fn page_links_retain_the_active_filter() {
        let query = RecipeListQuery::parse("tags=breakfast&is_favorited=1&author=4");
        let page = Page::from_rows(
            vec![0; 6],
            14,
            &query.page_query(),
            "/api/recipes",
            &query.filter_params(),
        );

        assert_eq!(
            page.next.as_deref(),
            Some("/api/recipes?page=2&limit=6&author=4&tags=breakfast&is_favorited=1")
        );
    }

    #[test]
    fn filter_params_re_encode_decoded_slugs() {
        let query = RecipeListQuery::parse("tags=late%20night");

        assert_eq!(query.filter_params(), "tags=late%20night");
    }

    #[test]
    fn empty_and_junk_queries_yield_defaults() {
        assert_eq!(RecipeListQuery::parse(""), RecipeListQuery::default());
        assert_eq!(
            RecipeListQuery::parse("author=abc&page=xyz&flag"),
            RecipeListQuery::default()
        );
    }
}
