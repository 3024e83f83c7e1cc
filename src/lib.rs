pub mod app_state;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use app_state::AppState;
pub use error::{AppError, AppResult};
