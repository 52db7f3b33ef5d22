//! Health risk prediction server: HTML form, JSON API, health and metrics

pub mod api;
pub mod config;
pub mod render;
