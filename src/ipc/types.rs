use crate::config::EngineConfig;
use crate::hours::HourTable;
use crate::store::TermStore;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: EngineConfig,
    pub hours: HourTable,
    pub store: TermStore,
}

impl AppState {
    pub fn new(config: EngineConfig, hours: HourTable) -> Self {
        Self {
            config,
            hours,
            store: TermStore::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(EngineConfig::default(), HourTable::default())
    }
}
