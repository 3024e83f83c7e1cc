pub mod plan;
pub mod schedule;
pub mod settings;
pub mod user;
pub mod work_item;
