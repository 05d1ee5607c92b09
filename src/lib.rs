pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod storage;

pub use db::DbPool;

use config::Config;
use storage::PlanStore;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub plans: PlanStore,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let plans = PlanStore::new(config.server.data_dir.join("plans"));
        Self { config, db, plans }
    }
}
