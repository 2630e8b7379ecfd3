use crate::activity::SortOrder;
use serde::Deserialize;
use std::path::PathBuf;

/// Complete chronicle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChronicleConfig {
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub activity: ActivityConfig,
}

/// Identity assignment configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Stamp identifiers onto entity files instead of keeping them in
    /// memory (NPC, Location and Faction ids are stamped regardless).
    #[serde(default = "default_persistent_ids")]
    pub persistent_ids: bool,
}

fn default_persistent_ids() -> bool {
    false
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            persistent_ids: default_persistent_ids(),
        }
    }
}

/// Activity log configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityConfig {
    /// Events fetched per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Default sort direction for the log view
    #[serde(default = "default_sort_order")]
    pub sort_order: SortOrder,
    /// Activity log database location
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

fn default_page_size() -> usize {
    50
}

fn default_sort_order() -> SortOrder {
    SortOrder::Desc
}

fn default_database() -> PathBuf {
    PathBuf::from("campaign.db")
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            sort_order: default_sort_order(),
            database: default_database(),
        }
    }
}

impl Default for ChronicleConfig {
    fn default() -> Self {
        Self {
            identity: IdentityConfig::default(),
            activity: ActivityConfig::default(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> anyhow::Result<ChronicleConfig> {
    let contents = std::fs::read_to_string(path)?;
    let config: ChronicleConfig = toml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChronicleConfig::default();
        assert_eq!(config.identity.persistent_ids, false);
        assert_eq!(config.activity.page_size, 50);
        assert_eq!(config.activity.sort_order, SortOrder::Desc);
        assert_eq!(config.activity.database, PathBuf::from("campaign.db"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [identity]
            persistent_ids = true

            [activity]
            page_size = 25
            sort_order = "asc"
            database = "/tmp/campaign.db"
        "#;

        let config: ChronicleConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.identity.persistent_ids, true);
        assert_eq!(config.activity.page_size, 25);
        assert_eq!(config.activity.sort_order, SortOrder::Asc);
        assert_eq!(config.activity.database, PathBuf::from("/tmp/campaign.db"));
    }

    #[test]
    fn test_partial_config() {
        // Missing sections use defaults
        let toml = r#"
            [activity]
            page_size = 100
        "#;

        let config: ChronicleConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.activity.page_size, 100);
        assert_eq!(config.identity.persistent_ids, false); // Default
        assert_eq!(config.activity.sort_order, SortOrder::Desc); // Default
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chronicle.toml");
        std::fs::write(&path, "[identity]\npersistent_ids = true\n").unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert!(config.identity.persistent_ids);
    }
}
