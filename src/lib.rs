// src/lib.rs

pub mod activity;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod state;
pub mod users;

// Export commonly used items
pub use config::CONFIG;
pub use state::AppState;
