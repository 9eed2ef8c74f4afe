use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::http::connection::{Connection, ConnectionSettings};
use crate::service::App;

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;
    info!("Listening on {}", cfg.listen_addr);

    match &cfg.directory {
        Some(dir) => info!("Serving files from {}", dir.display()),
        None => warn!("No directory configured; file routes answer 404 on read and 500 on write"),
    }

    let app = Arc::new(App::from_config(cfg));
    serve(listener, app, ConnectionSettings::from_config(cfg), cfg.max_connections).await
}

/// Accepts connections forever, one task each.
///
/// With `max_connections` set, accepting waits while that many connections
/// are being served. Otherwise the number of tasks is unbounded.
pub async fn serve(
    listener: TcpListener,
    app: Arc<App>,
    settings: ConnectionSettings,
    max_connections: Option<usize>,
) -> anyhow::Result<()> {
    let slots = max_connections.map(|n| Arc::new(Semaphore::new(n)));

    loop {
        let permit = match &slots {
            Some(slots) => Some(slots.clone().acquire_owned().await?),
            None => None,
        };

        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let app = app.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let mut conn = Connection::new(socket, app, settings);
            match conn.run().await {
                Ok(()) => debug!(peer = %peer, served = conn.served(), "Connection closed"),
                Err(e) => error!("Connection error from {}: {}", peer, e),
            }
        });
    }
}
