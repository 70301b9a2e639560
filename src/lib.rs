// Library exports for ABtracker
// The binary and the integration tests both build on these modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod storage;
pub mod store;
pub mod tally;
pub mod view;
