use std::sync::Arc;

use tokio::sync::Mutex;

use aquarisk_compute::RiskContext;

use crate::live::LiveSimulator;

pub struct AppState {
    /// Table and models, read-only for the process lifetime.
    pub risk: Arc<RiskContext>,
    pub live: Mutex<LiveSimulator>,
}

impl AppState {
    pub fn new(risk: RiskContext, live: LiveSimulator) -> Self {
        Self {
            risk: Arc::new(risk),
            live: Mutex::new(live),
        }
    }
}
