//! partyd - party character sheet server daemon
//!
//! Keeps tabletop RPG character sheets, rolls dice for them and hosts a
//! realtime chat room for the party.

pub mod api;
pub mod character;
pub mod config;
pub mod db;
pub mod dice;
pub mod images;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use api::{AppState, ChatRooms};
use character::CharacterService;
pub use config::{Config, ImageConfig};
use db::Database;
use dice::{OsSource, RandomSource, SeededSource};
use images::ImageClient;
use store::SqliteCharacterStore;

/// The partyd server instance
pub struct Server {
    config: Config,
    db: Arc<Database>,
    state: AppState,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a new server instance
    pub async fn new(config: Config) -> Result<Self> {
        let db = Arc::new(Database::new(config.db_path.as_deref()).await?);
        let store = Arc::new(SqliteCharacterStore::new(db.pool().clone()));

        let dice: Box<dyn RandomSource> = match config.dice_seed {
            Some(seed) => {
                info!("Using seeded dice ({})", seed);
                Box::new(SeededSource::new(seed))
            }
            None => Box::new(OsSource),
        };

        let portraits = ImageClient::new(&config.images)?;
        if !portraits.is_configured() {
            info!("No image API key set; portraits disabled");
        }

        let state = AppState {
            db: db.clone(),
            characters: Arc::new(CharacterService::new(store, dice)),
            portraits: Arc::new(portraits),
            rooms: Arc::new(ChatRooms::new()),
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            db,
            state,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Get the database handle
    pub fn db(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Build the router
    fn router(&self) -> Router {
        api::router(self.state.clone())
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("partyd listening on {}", local_addr);

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        info!("partyd shutdown complete");
        Ok(())
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
