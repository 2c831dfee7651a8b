pub mod api;
pub mod auth;
pub mod bucketer;
pub mod classifier;
pub mod config;
pub mod formatter;
pub mod mapper;
pub mod models;
pub mod refresh;
pub mod session;
pub mod store;
#[cfg(test)]
pub mod testing;
pub mod time;
