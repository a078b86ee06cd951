use anyhow::{Context, Result};
use lotto645::config::Config;
use lotto645::database::SqliteStore;
use lotto645::service::LottoService;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::use_cases::SharedService;

/// Opens the store (creating tables on first use) and wraps it in a service
/// shared by every use case.
pub fn shared_service(config: &Config) -> Result<SharedService> {
    let store = SqliteStore::open(&config.database_url)
        .with_context(|| format!("opening database {}", config.database_url))?;
    Ok(Arc::new(Mutex::new(LottoService::new(store, config.clone()))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lotto645::history::HistoryStore;

    #[tokio::test]
    async fn opens_database_under_missing_directory() {
        let dir = std::env::temp_dir().join(format!("lotto-mcp-{}", std::process::id()));
        let path = dir.join("nested").join("lotto.db");
        let config = Config {
            database_url: path.to_string_lossy().into_owned(),
            ..Config::default()
        };

        let service = shared_service(&config).unwrap();
        assert!(service.lock().await.store().all().unwrap().is_empty());
        assert!(path.exists());

        std::fs::remove_dir_all(dir).unwrap();
    }
}
