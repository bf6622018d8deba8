pub mod application;
pub mod config;
pub mod logging;
pub mod models;
