// Library exports for testing and reuse

pub mod app;
pub mod config;
pub mod csrf;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;

pub use app::{build_app, AppState};
