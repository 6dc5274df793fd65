use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::database::Database;

const SETTINGS_KEY: &str = "app_settings";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub sidebar_collapsed: bool,
    /// Reopened when no collection is given on the command line.
    pub last_collection: Option<String>,
    /// Server session owning the stored conversations.
    pub session_id: Option<String>,
}

pub struct SettingsService;

impl SettingsService {
    pub async fn load(db: &Database) -> AppSettings {
        match db.get_setting(SETTINGS_KEY).await {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable settings: {}", e);
                AppSettings::default()
            }),
            Ok(None) => AppSettings::default(),
            Err(e) => {
                tracing::warn!("Failed to read settings: {}", e);
                AppSettings::default()
            }
        }
    }

    pub async fn save(db: &Database, settings: &AppSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        db.set_setting(SETTINGS_KEY, &json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let db = Database::new_in_memory().unwrap();
        assert_eq!(SettingsService::load(&db).await, AppSettings::default());
    }

    #[tokio::test]
    async fn test_round_trip() {
        let db = Database::new_in_memory().unwrap();
        let settings = AppSettings {
            sidebar_collapsed: true,
            last_collection: Some("geology".to_string()),
            session_id: Some("4b0c6f9e".to_string()),
        };
        SettingsService::save(&db, &settings).await.unwrap();
        assert_eq!(SettingsService::load(&db).await, settings);
    }

    #[tokio::test]
    async fn test_older_settings_fill_defaults() {
        let db = Database::new_in_memory().unwrap();
        db.set_setting(SETTINGS_KEY, r#"{"sidebar_collapsed":true}"#).await.unwrap();
        let settings = SettingsService::load(&db).await;
        assert!(settings.sidebar_collapsed);
        assert_eq!(settings.last_collection, None);
        assert_eq!(settings.session_id, None);
    }
}
