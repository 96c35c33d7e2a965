pub mod error;
pub mod models;
pub mod services;
pub mod sql_http;
