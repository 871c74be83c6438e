use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::models::UserProfile;

/// Errors that can occur when reading or writing users
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt user database: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Persistence for user profiles
///
/// The daily run only lists users; the settings endpoints use `find_user` and `update_user`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserProfile>, StoreError>;

    async fn find_user(&self, email: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Replace the stored profile with the same id
    async fn update_user(&self, user: &UserProfile) -> Result<(), StoreError>;
}

/// On-disk layout of the user database
///
/// Unknown top-level keys are kept so that other tools sharing the file keep their data.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Database {
    #[serde(default)]
    users: Vec<UserProfile>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// User store backed by a single JSON file
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty database
    async fn load(&self) -> Result<Database, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Database::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a temp file next to the target, then rename over it
    async fn save(&self, db: &Database) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(db)?;
        let tmp = self.path.with_extension("json.tmp");

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for JsonFileStore {
    async fn list_users(&self) -> Result<Vec<UserProfile>, StoreError> {
        let db = self.load().await?;
        tracing::debug!("Loaded {} users from {}", db.users.len(), self.path.display());
        Ok(db.users)
    }

    async fn find_user(&self, email: &str) -> Result<Option<UserProfile>, StoreError> {
        let db = self.load().await?;
        Ok(db.users.into_iter().find(|u| u.email == email))
    }

    async fn update_user(&self, user: &UserProfile) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut db = self.load().await?;

        let slot = db
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user.id)))?;
        *slot = user.clone();

        self.save(&db).await?;
        tracing::debug!("Updated user {}", user.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Coordinates, PreferenceRule};

    const DB: &str = r#"{
        "users": [
            {
                "id": "u1",
                "email": "alice@example.com",
                "emailNotifications": true,
                "notificationPreferences": [
                    {"categories": ["Kraj A Dotace"], "center": {"latitude": 50.2, "longitude": 15.8}, "radiusKm": 25}
                ]
            },
            {"id": "u2", "email": "bob@example.com"}
        ],
        "categorizedInfo": []
    }"#;

    async fn store_with(contents: &str) -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        tokio::fs::write(&path, contents).await.unwrap();
        (dir, JsonFileStore::new(path))
    }

    #[tokio::test]
    async fn test_list_users() {
        let (_dir, store) = store_with(DB).await;

        let users = store.list_users().await.unwrap();

        assert_eq!(users.len(), 2);
        assert!(users[0].wants_email_alerts());
        assert_eq!(users[0].notification_preferences[0].categories.len(), 1);
        assert!(!users[1].wants_email_alerts());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("missing.json"));

        assert!(store.list_users().await.unwrap().is_empty());
        assert!(store.find_user("x@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let (_dir, store) = store_with("{not json").await;
        assert!(matches!(store.list_users().await, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_update_user_keeps_other_data() {
        let (_dir, store) = store_with(DB).await;

        let mut bob = store.find_user("bob@example.com").await.unwrap().unwrap();
        bob.email_notifications = true;
        bob.notification_preferences = vec![PreferenceRule::new(
            [Category::Health],
            Coordinates::new(50.5, 15.9),
            10.0,
        )];
        store.update_user(&bob).await.unwrap();

        let reloaded = store.find_user("bob@example.com").await.unwrap().unwrap();
        assert!(reloaded.wants_email_alerts());

        let raw: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(store.path()).await.unwrap()).unwrap();
        assert!(raw.get("categorizedInfo").is_some());
    }

    #[tokio::test]
    async fn test_update_unknown_user() {
        let (_dir, store) = store_with(DB).await;
        let mut ghost = store.find_user("bob@example.com").await.unwrap().unwrap();
        ghost.id = "nobody".to_string();

        assert!(matches!(store.update_user(&ghost).await, Err(StoreError::NotFound(_))));
    }
}
