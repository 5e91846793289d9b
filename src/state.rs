use anyhow::Context;
use std::sync::Arc;

use scolarite_config::{CorsConfig, DocumentConfig, EmailConfig, JwtConfig};
use scolarite_db::init_db_pool;

use crate::modules::documents::DocumentService;
use crate::store::{PgStore, RequestStore};
use crate::utils::notifier::{EmailNotifier, Notifier};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RequestStore>,
    pub documents: DocumentService,
    pub notifier: Arc<dyn Notifier>,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RequestStore>,
        documents: DocumentService,
        notifier: Arc<dyn Notifier>,
        jwt_config: JwtConfig,
    ) -> Self {
        Self {
            store,
            documents,
            notifier,
            jwt_config,
            cors_config: CorsConfig::default(),
        }
    }
}

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let pool = init_db_pool()
        .await
        .context("Failed to connect to database")?;

    Ok(AppState {
        store: Arc::new(PgStore::new(pool)),
        documents: DocumentService::from_config(DocumentConfig::from_env()),
        notifier: Arc::new(EmailNotifier::new(EmailConfig::from_env())),
        jwt_config: JwtConfig::from_env(),
        cors_config: CorsConfig::from_env(),
    })
}
