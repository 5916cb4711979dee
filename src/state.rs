use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, SeaOrmAuthService, TokenService};

/// Process-wide state built once at startup. The configuration is immutable
/// after construction; everything that needs it gets it by injection.
pub struct SharedState {
    pub config: Config,

    pub store: Store,

    pub tokens: Arc<TokenService>,

    pub auth: Arc<dyn AuthService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_url,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let tokens = Arc::new(TokenService::new(
            config.auth.secret_key.clone(),
            config.auth.token_ttl_minutes,
        ));

        let auth = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            tokens.clone(),
            config.auth.admin_register_secret.clone(),
        )) as Arc<dyn AuthService>;

        Ok(Self {
            config,
            store,
            tokens,
            auth,
        })
    }
}
