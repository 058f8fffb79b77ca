// Library exports for linkstash
// The binary and the integration tests both build on these modules

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;
pub mod state;
