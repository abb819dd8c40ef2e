use potwheel_core::OwnerId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub default_owner: Option<OwnerId>,
    pub verbose: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("potwheel"),
            default_owner: None,
            verbose: false,
        }
    }
}

impl CliConfig {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("potwheel.db")
    }

    pub fn game_config_path(&self) -> PathBuf {
        self.data_dir.join("potwheel.json")
    }
}
