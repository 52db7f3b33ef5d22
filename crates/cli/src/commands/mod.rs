pub mod health;
pub mod models;
pub mod predict;
pub mod schema;
