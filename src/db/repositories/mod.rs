pub mod plan_repository;
pub mod settings_repository;
pub mod user_data_repository;
