use anyhow::Result;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::handlers::AppState;
use crate::api::routes::create_router;
use crate::clients::{DirectoryClient, IdentityClient, Notifier};
use crate::config::AppConfig;
use crate::database;
use crate::services::sweeper::SweeperService;

pub struct ServerService {
    port: u16,
    config: AppConfig,
}

impl ServerService {
    pub fn new(port: u16, config: AppConfig) -> Self {
        Self { port, config }
    }

    pub async fn run(&self) -> Result<()> {
        let db_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "courtside.db".to_string());

        let pool = database::create_pool(&db_path)?;
        let notifier = Notifier::new(&self.config.collaborators)?;

        let state = Arc::new(AppState {
            pool: pool.clone(),
            config: self.config.clone(),
            identity: IdentityClient::new(&self.config.collaborators)?,
            directory: DirectoryClient::new(&self.config.collaborators)?,
            notifier: notifier.clone(),
        });

        let sweeper = SweeperService::new(self.config.clone());
        tokio::spawn(async move {
            sweeper.run_loop(pool, notifier).await;
        });

        let app = create_router(state).layer(CorsLayer::permissive());

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
