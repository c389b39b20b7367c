use std::collections::{BTreeMap, HashSet};

use sqlx::{Pool, Postgres};

use crate::{
    error::ApiError,
    schema::{CartIngredient, Id},
};

pub async fn add_to_cart(
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let result = sqlx::query(
        "INSERT INTO shopping_carts (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest(
            "recipe is already in the shopping cart".to_string(),
        ));
    }

    Ok(())
}

pub async fn remove_from_cart(
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM shopping_carts WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest(
            "recipe is not in the shopping cart".to_string(),
        ));
    }

    Ok(())
}

/// Which of the listed recipes are in the user's cart.
pub async fn in_cart_set(
    user_id: Id,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, ApiError> {
    if recipe_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<(Id,)> = sqlx::query_as(
        "SELECT recipe_id FROM shopping_carts WHERE user_id = $1 AND recipe_id = ANY($2)",
    )
    .bind(user_id)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Every quantified ingredient of every recipe in the user's cart, one row
/// per (recipe, ingredient) pair. Summing happens in [`sum_ingredients`].
pub async fn cart_ingredients(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartIngredient>, ApiError> {
    let rows: Vec<CartIngredient> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, ri.amount
        FROM shopping_carts sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// Sums amounts over (name, unit) so an ingredient shared by several cart
/// recipes appears once. Items come out in alphabetical order.
pub fn sum_ingredients(rows: Vec<CartIngredient>) -> Vec<ShoppingListItem> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for row in rows {
        *totals
            .entry((row.name, row.measurement_unit))
            .or_default() += i64::from(row.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), total)| ShoppingListItem {
            name,
            measurement_unit,
            total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: i32) -> CartIngredient {
        CartIngredient {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn shared_ingredients_are_summed() {
        let items = sum_ingredients(vec![row("flour", "g", 200), row("flour", "g", 300)]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "flour");
        assert_eq!(items[0].total, 500);
    }

    #[test]
    fn different_units_stay_separate() {
        let items = sum_ingredients(vec![row("milk", "ml", 200), row("milk", "g", 50)]);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].measurement_unit, "g");
        assert_eq!(items[1].measurement_unit, "ml");
    }

    #[test]
    fn items_come_out_alphabetically() {
        let items = sum_ingredients(vec![
            row("salt", "g", 5),
            row("butter", "g", 100),
            row("flour", "g", 200),
        ]);

        let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["butter", "flour", "salt"]);
    }

    #[test]
    fn empty_cart_sums_to_nothing() {
        assert!(sum_ingredients(Vec::new()).is_empty());
    }
}
