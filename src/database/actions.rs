pub mod carts;
pub mod follows;
pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod users;
