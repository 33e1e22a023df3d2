// src/lib.rs
pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pages;
pub mod poll;
pub mod render;
pub mod routes;

pub use catalog::PollCatalog;
pub use config::Config;
pub use db::{PgWarehouse, Warehouse};
pub use error::PollError;
pub use poll::PollService;
pub use routes::create_routes;
