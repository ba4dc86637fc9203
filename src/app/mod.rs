pub mod cache_store;
pub mod config;
pub mod converter;
pub mod fetch;
pub mod routes;
