// Library exports for the ZIN gateway
// The binary and the integration tests both build on these modules

pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;
pub mod state;
