pub mod config;
pub mod db;
pub mod models;
pub mod monitor;
pub mod services;
pub mod state;
pub mod utils;

pub use state::AppState;
