mod database {
    pub mod actions;
    pub mod error;
    pub mod pagination;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod api {
    pub mod download;
    pub mod ingredients;
    pub mod recipes;
    pub mod rejections;
    pub mod routes;
    pub mod serializers;
    pub mod tags;
    pub mod users;
}
mod config;
mod constants;

pub use authentication::*;
pub use config::*;
pub use constants::*;
pub use database::*;
