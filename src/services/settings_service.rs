use std::sync::RwLock;

use serde_json::json;
use tracing::{info, warn};

use crate::db::repositories::settings_repository::SettingsRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::{PlannerConfig, MAX_HORIZON_LIMIT_DAYS};
use crate::services::schedule_utils::OperatingZone;

const KEY_PLANNER_CONFIG: &str = "planner_config";

/// Persists the planner tunables as one JSON document and caches the last value read.
pub struct SettingsService {
    db: DbPool,
    cache: RwLock<Option<PlannerConfig>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            cache: RwLock::new(None),
        }
    }

    pub fn get(&self) -> AppResult<PlannerConfig> {
        if let Ok(guard) = self.cache.read() {
            if let Some(config) = guard.as_ref() {
                return Ok(config.clone());
            }
        }

        let config = self.load_from_db()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(config.clone());
        }
        Ok(config)
    }

    pub fn update(&self, config: PlannerConfig) -> AppResult<PlannerConfig> {
        validate(&config)?;

        let payload = serde_json::to_string(&config)?;
        self.db
            .with_connection(|conn| SettingsRepository::upsert(conn, KEY_PLANNER_CONFIG, &payload))?;
        info!(target: "app::settings", timezone = %config.timezone, "planner config updated");

        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(config.clone());
        }
        Ok(config)
    }

    /// Drops the stored document so the built-in defaults apply again.
    pub fn reset(&self) -> AppResult<PlannerConfig> {
        self.db
            .with_connection(|conn| SettingsRepository::delete(conn, KEY_PLANNER_CONFIG))?;

        let config = PlannerConfig::default();
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(config.clone());
        }
        Ok(config)
    }

    fn load_from_db(&self) -> AppResult<PlannerConfig> {
        let row = self
            .db
            .with_connection(|conn| SettingsRepository::get(conn, KEY_PLANNER_CONFIG))?;

        let Some(row) = row else {
            return Ok(PlannerConfig::default());
        };

        match serde_json::from_str::<PlannerConfig>(&row.value) {
            Ok(config) => Ok(config),
            Err(err) => {
                warn!(
                    target: "app::settings",
                    error = %err,
                    updated_at = %row.updated_at,
                    "stored planner config unreadable, using defaults"
                );
                Ok(PlannerConfig::default())
            }
        }
    }
}

fn validate(config: &PlannerConfig) -> AppResult<()> {
    OperatingZone::parse(&config.timezone)?;

    if !(1..=MAX_HORIZON_LIMIT_DAYS).contains(&config.max_horizon_days) {
        return Err(AppError::validation_with_details(
            "maxHorizonDays is out of range",
            json!({ "maxHorizonDays": config.max_horizon_days, "limit": MAX_HORIZON_LIMIT_DAYS }),
        ));
    }

    let day_range = 0..=config.max_horizon_days;
    if !day_range.contains(&config.horizon_floor_days)
        || !day_range.contains(&config.active_context_days)
    {
        return Err(AppError::validation_with_details(
            "day counts must be between 0 and maxHorizonDays",
            json!({
                "horizonFloorDays": config.horizon_floor_days,
                "activeContextDays": config.active_context_days,
                "maxHorizonDays": config.max_horizon_days,
            }),
        ));
    }

    let bad_session = config
        .session_hours
        .iter()
        .find(|(_, hours)| !hours.is_finite() || **hours < 0.0)
        .map(|(label, _)| label.clone());
    if let Some(label) = bad_session {
        return Err(AppError::validation_with_details(
            "session hours must be finite and non-negative",
            json!({ "itemType": label }),
        ));
    }

    if !config.default_session_hours.is_finite() || config.default_session_hours < 0.0 {
        return Err(AppError::validation(
            "defaultSessionHours must be finite and non-negative",
        ));
    }

    Ok(())
}
