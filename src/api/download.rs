use sqlx::{Pool, Postgres};
use warp::{Rejection, Reply};

use crate::{
    actions::carts::{self, ShoppingListItem},
    constants::{SHOPPING_LIST_FILENAME, SHOPPING_LIST_FOOTER, SHOPPING_LIST_HEADER},
    error::ApiError,
    jwt::SessionData,
    schema::CartIngredient,
};

/// Aggregates and renders the cart rows. An empty cart is a not-found
/// condition, never an empty document.
pub fn shopping_list_body(username: &str, rows: Vec<CartIngredient>) -> Result<String, ApiError> {
    if rows.is_empty() {
        return Err(ApiError::NotFound("shopping cart is empty".to_string()));
    }

    let items = carts::sum_ingredients(rows);

    Ok(render_shopping_list(username, &items))
}

pub fn render_shopping_list(username: &str, items: &[ShoppingListItem]) -> String {
    let mut lines = vec![
        SHOPPING_LIST_HEADER.to_string(),
        format!("Shopping list for {username}:\n"),
    ];

    for item in items {
        lines.push(format!(
            "{} ({}) --> {}",
            item.name, item.measurement_unit, item.total
        ));
    }

    lines.push(format!("\n{SHOPPING_LIST_FOOTER}"));

    lines.join("\n")
}

pub async fn download_shopping_cart(
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let rows = carts::cart_ingredients(session.user_id, &pool).await?;
    let body = shopping_list_body(&session.username, rows)?;

    Ok(warp::reply::with_header(
        warp::reply::with_header(body, "content-type", "text/plain; charset=utf-8"),
        "content-disposition",
        format!("attachment; filename={SHOPPING_LIST_FILENAME}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, unit: &str, total: i64) -> ShoppingListItem {
        ShoppingListItem {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total,
        }
    }

    #[test]
    fn lines_follow_the_arrow_format() {
        let text = render_shopping_list("cook", &[item("flour", "g", 500)]);

        assert!(text.contains("flour (g) --> 500"));
    }

    #[test]
    fn header_and_footer_wrap_the_list() {
        let text = render_shopping_list("cook", &[item("salt", "g", 5)]);

        assert!(text.starts_with(SHOPPING_LIST_HEADER));
        assert!(text.ends_with(SHOPPING_LIST_FOOTER));
        assert!(text.contains("Shopping list for cook:"));
    }

    #[test]
    fn empty_cart_is_not_found_rather_than_empty_text() {
        assert!(matches!(
            shopping_list_body("cook", Vec::new()),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn carted_rows_become_a_document() {
        let rows = vec![CartIngredient {
            name: "flour".to_string(),
            measurement_unit: "g".to_string(),
            amount: 500,
        }];

        let body = shopping_list_body("cook", rows).unwrap();
        assert!(body.contains("flour (g) --> 500"));
    }

    #[test]
    fn one_line_per_item() {
        let text = render_shopping_list(
            "cook",
            &[item("butter", "g", 100), item("milk", "ml", 250)],
        );

        assert!(text.contains("butter (g) --> 100\nmilk (ml) --> 250"));
    }
}
