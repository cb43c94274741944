use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::db::DatabaseProxy;
use crate::services::ai_provider::AiProvider;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    db_proxy: Option<Arc<DatabaseProxy>>,
    ai_provider: Arc<AiProvider>,
}

impl AppState {
    pub fn new(db_proxy: Option<Arc<DatabaseProxy>>) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            db_proxy,
            ai_provider: Arc::new(AiProvider::from_env()),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn db_proxy(&self) -> Option<Arc<DatabaseProxy>> {
        self.db_proxy.clone()
    }

    pub fn ai_provider(&self) -> Arc<AiProvider> {
        Arc::clone(&self.ai_provider)
    }
}
