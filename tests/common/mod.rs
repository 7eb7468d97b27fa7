#![allow(dead_code)]

use std::path::PathBuf;

use social_storage::db::User;
use social_storage::storage::NewUser;
use social_storage::{DatabaseConfig, DatabaseProxy, SocialStorage};
use tracing_subscriber::EnvFilter;

/// A throwaway SQLite file bound to its own proxy. Files are removed on drop.
pub struct TestDb {
    pub proxy: DatabaseProxy,
    pub storage: SocialStorage<User>,
    path: PathBuf,
}

impl TestDb {
    pub async fn new(prefix: &str) -> Self {
        init_tracing();

        let db_path = std::env::temp_dir().join(format!(
            "test_{prefix}_{}.sqlite",
            uuid::Uuid::new_v4().simple()
        ));
        let config = DatabaseConfig {
            url: format!("sqlite:{}", db_path.to_str().unwrap()),
            ..DatabaseConfig::default()
        };

        let proxy = DatabaseProxy::new();
        proxy.bind_config(&config).await.unwrap();
        let storage = SocialStorage::new(proxy.clone());

        Self {
            proxy,
            storage,
            path: db_path,
        }
    }

    pub async fn user(&self, username: &str, password: Option<&str>) -> User {
        self.storage
            .user
            .create_user(
                NewUser::new()
                    .username(username)
                    .set(
                        social_storage::db::UserColumn::Email,
                        format!("{username}@example.com"),
                    )
                    .set(social_storage::db::UserColumn::Password, password),
            )
            .await
            .unwrap()
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        self.proxy.unbind();
        let base = self.path.to_string_lossy().to_string();
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{base}{suffix}"));
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
