use std::sync::Arc;

use anyhow::Context;

use crate::config::{AppConfig, StoreKind};
use crate::store::{BlogStore, MemoryStore, PgStore};
use crate::views::Views;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BlogStore>,
    pub views: Arc<Views>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn BlogStore> = match config.store {
            StoreKind::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is not set")?;
                let pg = PgStore::connect(url, config.max_connections).await?;
                if let Err(e) = pg.migrate().await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(pg)
            }
            StoreKind::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let views = Arc::new(Views::new().context("compile templates")?);
        Ok(Self::from_parts(store, views, Arc::new(config)))
    }

    pub fn from_parts(store: Arc<dyn BlogStore>, views: Arc<Views>, config: Arc<AppConfig>) -> Self {
        Self {
            store,
            views,
            config,
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        let config = AppConfig {
            store: StoreKind::Memory,
            database_url: None,
            max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
        };
        let views = Views::new().expect("templates compile");
        Self::from_parts(Arc::new(MemoryStore::new()), Arc::new(views), Arc::new(config))
    }
}
