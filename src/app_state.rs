use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::db::DbPool;
use crate::error::AppResult;
use crate::services::planning_service::PlanningService;
use crate::services::settings_service::SettingsService;
use crate::services::user_data_service::UserDataService;
use crate::utils::logger::{self, LogOptions};

const DATABASE_FILE: &str = "smart-schedule.sqlite";
const LOG_DIR: &str = "logs";

/// Wires the services together over one database.
#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    user_data_service: Arc<UserDataService>,
    settings_service: Arc<SettingsService>,
    planning_service: Arc<PlanningService>,
}

impl AppState {
    pub fn new(db_pool: DbPool) -> Self {
        let user_data_service = Arc::new(UserDataService::new(db_pool.clone()));
        let settings_service = Arc::new(SettingsService::new(db_pool.clone()));
        let planning_service = Arc::new(PlanningService::new(
            Arc::clone(&user_data_service),
            Arc::clone(&settings_service),
        ));

        Self {
            db_pool,
            user_data_service,
            settings_service,
            planning_service,
        }
    }

    /// Sets up logging under `data_dir/logs` and opens the database in `data_dir`.
    pub fn open(data_dir: &Path) -> AppResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        logger::init_logging(&LogOptions::in_dir(data_dir.join(LOG_DIR)))?;

        let pool = DbPool::new(data_dir.join(DATABASE_FILE))?;
        info!(target: "app::state", data_dir = %data_dir.display(), "application state ready");
        Ok(Self::new(pool))
    }

    pub fn db(&self) -> &DbPool {
        &self.db_pool
    }

    pub fn user_data(&self) -> Arc<UserDataService> {
        Arc::clone(&self.user_data_service)
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn planning(&self) -> Arc<PlanningService> {
        Arc::clone(&self.planning_service)
    }
}
