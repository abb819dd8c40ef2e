use crate::error::{PotwheelError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub starting_round_id: u64,
    pub settle_delay: Duration,
    pub spin_duration: Duration,
    pub spin_policy: SpinPolicy,
    pub stars_per_unit: u64,
}

/// Cosmetic full turns added before the wheel stops on the winner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinPolicy {
    pub min_full_spins: u32,
    pub extra_spin_range: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_round_id: 360893,
            settle_delay: Duration::from_secs(3),
            spin_duration: Duration::from_millis(4500),
            spin_policy: SpinPolicy {
                min_full_spins: 5,
                extra_spin_range: 3,
            },
            stars_per_unit: 100,
        }
    }
}

impl GameConfig {
    /// Config without presentation delays, for scripted rounds and tests
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            spin_duration: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Load a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: GameConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stars_per_unit == 0 {
            return Err(PotwheelError::config("Stars per unit must be greater than 0"));
        }

        if self.spin_policy.extra_spin_range == 0 {
            return Err(PotwheelError::config(
                "Extra spin range must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.starting_round_id, 360893);
        assert_eq!(config.settle_delay, Duration::from_secs(3));
    }

    #[test]
    fn test_zero_stars_per_unit_rejected() {
        let config = GameConfig {
            stars_per_unit: 0,
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(PotwheelError::Config(_))));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp_dir = tempdir().unwrap();
        let config = GameConfig::load(&temp_dir.path().join("potwheel.json")).unwrap();
        assert_eq!(config.stars_per_unit, 100);
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("potwheel.json");
        std::fs::write(&path, r#"{"starting_round_id": 7}"#).unwrap();

        let config = GameConfig::load(&path).unwrap();
        assert_eq!(config.starting_round_id, 7);
        assert_eq!(config.spin_policy.min_full_spins, 5);
    }
}
