//! Web server for Droplink.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::code::CodeGenerator;
use crate::config::Config;
use crate::file::FileStorage;
use crate::share::{ExpirySweeper, ShareService};
use crate::{Database, DropError, Result};

use super::handlers::AppState;
use super::router::{
    create_health_router, create_router, create_static_router, create_swagger_router,
};

/// Web server for the share API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Full configuration.
    config: Config,
}

impl WebServer {
    /// Create a new web server from configuration and an open database.
    pub fn new(config: Config, db: Database) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| DropError::Config(format!("Invalid server address: {}", e)))?;

        let db = Arc::new(db);

        let storage = FileStorage::new(&config.storage.path)?;
        tracing::info!("File storage initialized at: {}", config.storage.path);

        let shares = ShareService::new(
            db.clone(),
            CodeGenerator::new(config.links.code_length),
            config.links.ttl(),
            &config.links.base_url,
        );

        let app_state = AppState::new(
            db,
            storage,
            shares,
            config.storage.max_upload_size_bytes(),
        );

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            config,
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn build_router(&self) -> axum::Router {
        let mut router = create_router(self.app_state.clone(), &self.config.web)
            .merge(create_health_router())
            .merge(create_swagger_router());

        if self.config.web.serve_static {
            if let Some(static_router) = create_static_router(&self.config.web.static_path) {
                router = router.merge(static_router);
            }
        }

        router.layer(CompressionLayer::new())
    }

    /// Start the expiry sweeper background task.
    fn start_sweeper(&self) {
        let sweeper = ExpirySweeper::new(
            self.app_state.db.clone(),
            self.app_state.storage.clone(),
        );
        let interval = self.config.sweep.interval();
        sweeper.spawn(interval);
        tracing::info!(
            interval_minutes = self.config.sweep.interval_minutes,
            "Expiry sweeper started"
        );
    }

    /// Run the web server.
    pub async fn run(self) -> std::result::Result<(), std::io::Error> {
        let router = self.build_router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        // Start the sweeper only after a successful bind
        self.start_sweeper();

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    /// Run the server in the background and return the bound address.
    ///
    /// Useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::result::Result<SocketAddr, std::io::Error> {
        let router = self.build_router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        self.start_sweeper();

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
