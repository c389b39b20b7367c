use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Id = i32;

#[derive(Clone, Debug, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: UserRole,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct UserRow {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: UserRole,

    pub count: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// One recipe-tag association joined with the tag it points at.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeTag {
    pub recipe_id: Id,
    pub id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeRow {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,

    pub count: i64,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            name: row.name,
            image: row.image,
            text: row.text,
            cooking_time: row.cooking_time,
            pub_date: row.pub_date,
        }
    }
}

/// Quantified (recipe, ingredient) association joined with its catalog row.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeIngredient {
    pub recipe_id: Id,
    pub ingredient_id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Flat cart row fed to the shopping-list aggregator.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct CartIngredient {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}
