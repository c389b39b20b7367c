use std::sync::Arc;

use serde::Deserialize;
use sqlx::{Pool, Postgres};
use warp::{http::StatusCode, Rejection, Reply};

use crate::{
    actions::{follows, recipes, users},
    api::serializers::{
        identity_taken_errors, CreateUserPayload, FollowProfile, LoginPayload, MiniRecipe,
        TokenOut, UserProfile,
    },
    config::Config,
    database::{
        error::ApiError,
        pagination::{Page, PageQuery},
    },
    jwt::SessionData,
    schema::Id,
};

pub async fn create_user(
    payload: CreateUserPayload,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    payload.validate()?;

    let email_taken = users::get_user_by_email(&payload.email, &pool).await?.is_some();
    let username_taken = users::get_user_by_username(&payload.username, &pool)
        .await?
        .is_some();
    identity_taken_errors(email_taken, username_taken)?;

    let password_hash = crate::cryptography::hash_password(&payload.password)?;
    let user = users::register_user(
        &payload.email,
        &payload.username,
        &payload.first_name,
        &payload.last_name,
        &password_hash,
        &pool,
    )
    .await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&UserProfile::from_user(&user, false)),
        StatusCode::CREATED,
    ))
}

pub async fn login(
    payload: LoginPayload,
    config: Arc<Config>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let token = users::login_user(
        &payload.email,
        &payload.password,
        &config.jwt_secret,
        config.session_hours,
        &pool,
    )
    .await?;

    Ok(warp::reply::json(&TokenOut { auth_token: token }))
}

pub async fn me(session: SessionData, pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let user = users::get_user(session.user_id, &pool)
        .await?
        .ok_or_else(|| ApiError::Unauthorized.reject())?;

    Ok(warp::reply::json(&UserProfile::from_user(&user, false)))
}

pub async fn list_users(
    query: PageQuery,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let rows = users::fetch_users(query.offset(), query.limit(), &pool).await?;
    let count = rows.first().map(|row| row.count).unwrap_or(0);

    let following = match &session {
        Some(session) => {
            let ids: Vec<Id> = rows.iter().map(|row| row.id).collect();
            follows::following_set(session.user_id, &ids, &pool).await?
        }
        None => Default::default(),
    };

    let results: Vec<UserProfile> = rows
        .iter()
        .map(|row| UserProfile::from_row(row, following.contains(&row.id)))
        .collect();

    Ok(warp::reply::json(&Page::from_rows(
        results,
        count,
        &query,
        "/api/users",
        "",
    )))
}

pub async fn get_user(
    id: Id,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let user = users::get_user(id, &pool).await?.ok_or_else(|| {
        ApiError::NotFound("no user exists with the specified id".to_string()).reject()
    })?;

    let is_subscribed = match &session {
        Some(session) => follows::is_following(session.user_id, user.id, &pool).await?,
        None => false,
    };

    Ok(warp::reply::json(&UserProfile::from_user(
        &user,
        is_subscribed,
    )))
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SubscriptionsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub recipes_limit: Option<i64>,
}

impl SubscriptionsQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }

    pub fn filter_params(&self) -> String {
        self.recipes_limit
            .map(|limit| format!("recipes_limit={limit}"))
            .unwrap_or_default()
    }
}

/// Nested-recipe cap accepted by the subscribe endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RecipesLimitQuery {
    pub recipes_limit: Option<i64>,
}

async fn follow_profile(
    author: UserProfile,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<FollowProfile, ApiError> {
    let recipes = recipes::list_author_recipes(author.id, recipes_limit, pool).await?;
    let recipes_count = recipes::count_author_recipes(author.id, pool).await?;

    Ok(FollowProfile {
        author,
        recipes: recipes.iter().map(MiniRecipe::from).collect(),
        recipes_count,
    })
}

pub async fn subscriptions(
    query: SubscriptionsQuery,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let page_query = query.page_query();
    let rows = follows::fetch_followed_authors(
        session.user_id,
        page_query.offset(),
        page_query.limit(),
        &pool,
    )
    .await?;
    let count = rows.first().map(|row| row.count).unwrap_or(0);

    let mut results = Vec::with_capacity(rows.len());
    for row in &rows {
        let author = UserProfile::from_row(row, true);
        results.push(follow_profile(author, query.recipes_limit, &pool).await?);
    }

    Ok(warp::reply::json(&Page::from_rows(
        results,
        count,
        &page_query,
        "/api/users/subscriptions",
        &query.filter_params(),
    )))
}

pub async fn subscribe(
    author_id: Id,
    query: RecipesLimitQuery,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(crate::permissions::ActionType::ManageOwnSubscriptions)?;

    let author = users::get_user(author_id, &pool).await?.ok_or_else(|| {
        ApiError::NotFound("no user exists with the specified id".to_string()).reject()
    })?;

    follows::subscribe(session.user_id, author.id, &pool).await?;

    let profile = follow_profile(
        UserProfile::from_user(&author, true),
        query.recipes_limit,
        &pool,
    )
    .await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&profile),
        StatusCode::CREATED,
    ))
}

pub async fn unsubscribe(
    author_id: Id,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(crate::permissions::ActionType::ManageOwnSubscriptions)?;

    let author = users::get_user(author_id, &pool).await?.ok_or_else(|| {
        ApiError::NotFound("no user exists with the specified id".to_string()).reject()
    })?;

    follows::unsubscribe(session.user_id, author.id, &pool).await?;

    Ok(warp::reply::with_status(
        warp::reply(),
        StatusCode::NO_CONTENT,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_page_links_retain_recipes_limit() {
        let query = SubscriptionsQuery {
            page: None,
            limit: None,
            recipes_limit: Some(3),
        };
        let page = Page::from_rows(
            vec![0; 6],
            8,
            &query.page_query(),
            "/api/users/subscriptions",
            &query.filter_params(),
        );

        assert_eq!(
            page.next.as_deref(),
            Some("/api/users/subscriptions?page=2&limit=6&recipes_limit=3")
        );
    }

    #[test]
    fn absent_recipes_limit_adds_no_parameters() {
        assert_eq!(SubscriptionsQuery::default().filter_params(), "");
    }
}
