use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    actions::recipes::{NewRecipe, RecipePatch},
    constants::{MAX_LENGTH_EMAIL, MAX_LENGTH_NAME, MAX_LENGTH_TITLE},
    error::{ApiError, ValidationErrors},
    schema::{Id, Recipe, RecipeIngredient, Tag, User, UserRow},
};

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserProfile {
    pub fn from_user(user: &User, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            email: user.email.to_owned(),
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            is_subscribed,
        }
    }

    pub fn from_row(row: &UserRow, is_subscribed: bool) -> Self {
        Self {
            id: row.id,
            email: row.email.to_owned(),
            username: row.username.to_owned(),
            first_name: row.first_name.to_owned(),
            last_name: row.last_name.to_owned(),
            is_subscribed,
        }
    }
}

/// Compact recipe rendering used by marks and subscription listings.
#[derive(Debug, Serialize)]
pub struct MiniRecipe {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&Recipe> for MiniRecipe {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.to_owned(),
            image: recipe.image.to_owned(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FollowProfile {
    #[serde(flatten)]
    pub author: UserProfile,
    pub recipes: Vec<MiniRecipe>,
    pub recipes_count: i64,
}

#[derive(Debug, Serialize)]
pub struct RecipeIngredientOut {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<&RecipeIngredient> for RecipeIngredientOut {
    fn from(row: &RecipeIngredient) -> Self {
        Self {
            id: row.ingredient_id,
            name: row.name.to_owned(),
            measurement_unit: row.measurement_unit.to_owned(),
            amount: row.amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredientOut>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserPayload {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl CreateUserPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::new();

        if self.email.trim().is_empty() {
            errors.add("email", "email is required");
        } else if !self.email.contains('@') {
            errors.add("email", "enter a valid email address");
        } else if self.email.chars().count() > MAX_LENGTH_EMAIL {
            errors.add(
                "email",
                format!("email must be at most {MAX_LENGTH_EMAIL} characters"),
            );
        }

        if self.username.trim().is_empty() {
            errors.add("username", "username is required");
        } else {
            if self.username.chars().count() > MAX_LENGTH_NAME {
                errors.add(
                    "username",
                    format!("username must be at most {MAX_LENGTH_NAME} characters"),
                );
            }
            if !self
                .username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
            {
                errors.add(
                    "username",
                    "username may only contain letters, digits and @ . + - _",
                );
            }
        }

        require_text(&mut errors, "first_name", Some(&self.first_name), MAX_LENGTH_NAME);
        require_text(&mut errors, "last_name", Some(&self.last_name), MAX_LENGTH_NAME);

        if self.password.is_empty() {
            errors.add("password", "password is required");
        }

        errors.into_result()
    }
}

/// Field-scoped errors for identity collisions found at registration.
pub fn identity_taken_errors(email_taken: bool, username_taken: bool) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::new();

    if email_taken {
        errors.add("email", "a user with this email already exists");
    }
    if username_taken {
        errors.add("username", "a user with this username already exists");
    }

    errors.into_result()
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenOut {
    pub auth_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmountPayload {
    pub id: Id,
    pub amount: i64,
}

/// Incoming recipe body. Every field is optional at the serde level so that
/// violations can be collected per field instead of failing deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct RecipePayload {
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    pub cooking_time: Option<i64>,
    pub ingredients: Option<Vec<IngredientAmountPayload>>,
    pub tags: Option<Vec<Id>>,
}

impl RecipePayload {
    /// Validates a creation body. All fields are required.
    pub fn into_new_recipe(self) -> Result<NewRecipe, ApiError> {
        let mut errors = ValidationErrors::new();

        require_text(&mut errors, "name", self.name.as_deref(), MAX_LENGTH_TITLE);
        require_text(&mut errors, "text", self.text.as_deref(), usize::MAX);
        if self.image.as_deref().map_or(true, |image| image.is_empty()) {
            errors.add("image", "an image must be supplied");
        }

        validate_cooking_time(&mut errors, self.cooking_time, true);
        let ingredients = validate_ingredients(&mut errors, self.ingredients.as_deref());
        let tags = validate_tags(&mut errors, self.tags.as_deref());

        errors.into_result()?;

        Ok(NewRecipe {
            name: self.name.unwrap_or_default(),
            text: self.text.unwrap_or_default(),
            image: self.image.unwrap_or_default(),
            cooking_time: self.cooking_time.unwrap_or_default() as i32,
            ingredients,
            tags,
        })
    }

    /// Validates an update body. Metadata fields may be omitted to keep their
    /// current values, but ingredients and tags must always be sent in full.
    pub fn into_patch(self) -> Result<RecipePatch, ApiError> {
        let mut errors = ValidationErrors::new();

        if let Some(name) = self.name.as_deref() {
            require_text(&mut errors, "name", Some(name), MAX_LENGTH_TITLE);
        }
        if let Some(text) = self.text.as_deref() {
            require_text(&mut errors, "text", Some(text), usize::MAX);
        }
        if let Some(image) = self.image.as_deref() {
            if image.is_empty() {
                errors.add("image", "an image must be supplied");
            }
        }

        validate_cooking_time(&mut errors, self.cooking_time, false);
        let ingredients = validate_ingredients(&mut errors, self.ingredients.as_deref());
        let tags = validate_tags(&mut errors, self.tags.as_deref());

        errors.into_result()?;

        Ok(RecipePatch {
            name: self.name,
            text: self.text,
            image: self.image,
            cooking_time: self.cooking_time.map(|value| value as i32),
            ingredients,
            tags,
        })
    }
}

fn require_text(errors: &mut ValidationErrors, field: &str, value: Option<&str>, max: usize) {
    match value {
        None => errors.add(field, format!("{field} is required")),
        Some(value) if value.trim().is_empty() => {
            errors.add(field, format!("{field} must not be empty"))
        }
        Some(value) if value.chars().count() > max => {
            errors.add(field, format!("{field} must be at most {max} characters"))
        }
        _ => {}
    }
}

fn validate_cooking_time(errors: &mut ValidationErrors, value: Option<i64>, required: bool) {
    match value {
        None if required => errors.add("cooking_time", "cooking time is required"),
        Some(value) if value < 1 => {
            errors.add("cooking_time", "cooking time must be at least 1 minute")
        }
        Some(value) if value > i64::from(i32::MAX) => {
            errors.add("cooking_time", "cooking time is out of range")
        }
        _ => {}
    }
}

fn validate_ingredients(
    errors: &mut ValidationErrors,
    value: Option<&[IngredientAmountPayload]>,
) -> Vec<(Id, i32)> {
    let Some(items) = value else {
        errors.add("ingredients", "at least one ingredient is required");
        return Vec::new();
    };

    if items.is_empty() {
        errors.add("ingredients", "at least one ingredient is required");
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id) {
            errors.add(
                "ingredients",
                format!("ingredient {} is listed more than once", item.id),
            );
        }
        if item.amount < 1 {
            errors.add(
                "ingredients",
                format!("amount for ingredient {} must be at least 1", item.id),
            );
        } else if item.amount > i64::from(i32::MAX) {
            errors.add(
                "ingredients",
                format!("amount for ingredient {} is out of range", item.id),
            );
        } else {
            out.push((item.id, item.amount as i32));
        }
    }

    out
}

fn validate_tags(errors: &mut ValidationErrors, value: Option<&[Id]>) -> Vec<Id> {
    let Some(tags) = value else {
        errors.add("tags", "at least one tag is required");
        return Vec::new();
    };

    if tags.is_empty() {
        errors.add("tags", "at least one tag is required");
        return Vec::new();
    }

    let mut seen = HashSet::new();
    for tag in tags {
        if !seen.insert(*tag) {
            errors.add("tags", format!("tag {tag} is listed more than once"));
        }
    }

    tags.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_payload() -> RecipePayload {
        RecipePayload {
            name: Some("Pancakes".to_string()),
            text: Some("Mix and fry.".to_string()),
            image: Some("data:image/png;base64,iVBORw0KGgo=".to_string()),
            cooking_time: Some(15),
            ingredients: Some(vec![
                IngredientAmountPayload { id: 1, amount: 200 },
                IngredientAmountPayload { id: 2, amount: 2 },
            ]),
            tags: Some(vec![1, 2]),
        }
    }

    fn validation_fields(error: ApiError) -> Vec<String> {
        match error {
            ApiError::Validation(errors) => {
                let json = serde_json::to_value(&errors).unwrap();
                json.as_object().unwrap().keys().cloned().collect()
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn complete_payload_becomes_a_new_recipe() {
        let recipe = full_payload().into_new_recipe().unwrap();

        assert_eq!(recipe.name, "Pancakes");
        assert_eq!(recipe.cooking_time, 15);
        assert_eq!(recipe.ingredients, vec![(1, 200), (2, 2)]);
        assert_eq!(recipe.tags, vec![1, 2]);
    }

    #[test]
    fn zero_cooking_time_is_named_in_the_error() {
        let mut payload = full_payload();
        payload.cooking_time = Some(0);

        let fields = validation_fields(payload.into_new_recipe().unwrap_err());
        assert_eq!(fields, vec!["cooking_time"]);
    }

    #[test]
    fn missing_image_is_rejected_on_create() {
        let mut payload = full_payload();
        payload.image = None;

        let fields = validation_fields(payload.into_new_recipe().unwrap_err());
        assert_eq!(fields, vec!["image"]);
    }

    #[test]
    fn duplicate_ingredients_and_tags_are_rejected() {
        let mut payload = full_payload();
        payload.ingredients = Some(vec![
            IngredientAmountPayload { id: 1, amount: 200 },
            IngredientAmountPayload { id: 1, amount: 300 },
        ]);
        payload.tags = Some(vec![2, 2]);

        let fields = validation_fields(payload.into_new_recipe().unwrap_err());
        assert_eq!(fields, vec!["ingredients", "tags"]);
    }

    #[test]
    fn every_violation_is_reported_at_once() {
        let payload = RecipePayload {
            cooking_time: Some(0),
            ..RecipePayload::default()
        };

        let fields = validation_fields(payload.into_new_recipe().unwrap_err());
        assert_eq!(
            fields,
            vec!["cooking_time", "image", "ingredients", "name", "tags", "text"]
        );
    }

    #[test]
    fn patch_allows_missing_metadata_but_not_missing_relations() {
        let payload = RecipePayload {
            ingredients: Some(vec![IngredientAmountPayload { id: 3, amount: 1 }]),
            tags: Some(vec![1]),
            ..RecipePayload::default()
        };
        let patch = payload.into_patch().unwrap();
        assert_eq!(patch.name, None);
        assert_eq!(patch.ingredients, vec![(3, 1)]);

        let payload = RecipePayload {
            name: Some("Renamed".to_string()),
            ..RecipePayload::default()
        };
        let fields = validation_fields(payload.into_patch().unwrap_err());
        assert_eq!(fields, vec!["ingredients", "tags"]);
    }

    #[test]
    fn taken_identities_report_as_field_errors() {
        assert!(identity_taken_errors(false, false).is_ok());

        let fields = validation_fields(identity_taken_errors(true, true).unwrap_err());
        assert_eq!(fields, vec!["email", "username"]);

        let fields = validation_fields(identity_taken_errors(false, true).unwrap_err());
        assert_eq!(fields, vec!["username"]);
    }

    #[test]
    fn user_payload_checks_email_and_username() {
        let payload = CreateUserPayload {
            email: "not-an-email".to_string(),
            username: "space cadet".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            password: "pw".to_string(),
        };

        let fields = validation_fields(payload.validate().unwrap_err());
        assert_eq!(fields, vec!["email", "username"]);
    }
}
