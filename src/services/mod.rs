pub mod conflict_checker;
pub mod plan_consolidator;
pub mod planning_service;
pub mod recurring_blocks;
pub mod schedule_optimizer;
pub mod schedule_utils;
pub mod settings_service;
pub mod user_data_service;
pub mod work_queue;
