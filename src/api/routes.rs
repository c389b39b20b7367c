use std::sync::Arc;

use sqlx::{Pool, Postgres};
use warp::{Filter, Rejection, Reply};

use crate::{
    api::{download, ingredients, recipes, tags, users},
    config::Config,
    middleware::{with_possible_session, with_session},
    schema::Id,
};

fn with_pool(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (Pool<Postgres>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || pool.clone())
}

fn with_config(
    config: Arc<Config>,
) -> impl Filter<Extract = (Arc<Config>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || config.clone())
}

/// `warp::query::raw` rejects requests without a query string; listings treat
/// that as an empty filter instead.
fn raw_query() -> impl Filter<Extract = (String,), Error = Rejection> + Copy {
    warp::query::raw().or_else(|_| async { Ok::<(String,), Rejection>((String::new(),)) })
}

pub fn routes(
    pool: Pool<Postgres>,
    config: Arc<Config>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let secret = config.jwt_secret.clone();

    let create_user = warp::path!("api" / "users")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(users::create_user);

    let list_users = warp::path!("api" / "users")
        .and(warp::get())
        .and(warp::query())
        .and(with_possible_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(users::list_users);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(users::me);

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(warp::query())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(users::subscriptions);

    let get_user = warp::path!("api" / "users" / Id)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(users::get_user);

    let subscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::post())
        .and(warp::query())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(users::subscribe);

    let unsubscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(users::unsubscribe);

    let login = warp::path!("api" / "auth" / "token" / "login")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_config(config))
        .and(with_pool(pool.clone()))
        .and_then(users::login);

    let list_tags = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(tags::list_tags);

    let get_tag = warp::path!("api" / "tags" / Id)
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(tags::get_tag);

    let list_ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(warp::query())
        .and(with_pool(pool.clone()))
        .and_then(ingredients::list_ingredients);

    let get_ingredient = warp::path!("api" / "ingredients" / Id)
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(ingredients::get_ingredient);

    let list_recipes = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(raw_query())
        .and(with_possible_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(recipes::list_recipes);

    let create_recipe = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(recipes::create_recipe);

    let download_shopping_cart = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(download::download_shopping_cart);

    let get_recipe = warp::path!("api" / "recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(recipes::get_recipe);

    let update_recipe = warp::path!("api" / "recipes" / Id)
        .and(warp::patch())
        .and(with_session(secret.clone()))
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(recipes::update_recipe);

    let delete_recipe = warp::path!("api" / "recipes" / Id)
        .and(warp::delete())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(recipes::delete_recipe);

    let add_favorite = warp::path!("api" / "recipes" / Id / "favorite")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(recipes::add_favorite);

    let remove_favorite = warp::path!("api" / "recipes" / Id / "favorite")
        .and(warp::delete())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(recipes::remove_favorite);

    let add_to_cart = warp::path!("api" / "recipes" / Id / "shopping_cart")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_pool(pool.clone()))
        .and_then(recipes::add_to_cart);

    let remove_from_cart = warp::path!("api" / "recipes" / Id / "shopping_cart")
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_pool(pool))
        .and_then(recipes::remove_from_cart);

    create_user
        .or(list_users)
        .or(me)
        .or(subscriptions)
        .or(subscribe)
        .or(unsubscribe)
        .or(get_user)
        .or(login)
        .or(list_tags)
        .or(get_tag)
        .or(list_ingredients)
        .or(get_ingredient)
        .or(download_shopping_cart)
        .or(list_recipes)
        .or(create_recipe)
        .or(add_favorite)
        .or(remove_favorite)
        .or(add_to_cart)
        .or(remove_from_cart)
        .or(get_recipe)
        .or(update_recipe)
        .or(delete_recipe)
        .with(warp::trace::request())
}
