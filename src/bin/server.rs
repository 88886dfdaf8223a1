use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use metrics_hub::{
    api::{self, AppState},
    audit,
    config::{Config, ServerArgs},
    storage::{self, Repository, Snapshotter},
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("metrics_hub", LevelFilter::DEBUG),
        ("server", LevelFilter::DEBUG),
        ("tower_http", LevelFilter::INFO),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();

    let args = ServerArgs::parse();
    trace!("started with args: {args:?}");
    let config = Config::from_args(args);

    let repository = storage::build_repository(&config).await?;

    let snapshotter = config
        .file_storage_path
        .as_deref()
        .filter(|path| !path.is_empty())
        .map(|path| {
            Arc::new(Snapshotter::new(
                repository.clone(),
                path,
                config.store_interval,
            ))
        });

    if config.restore {
        if let Some(snapshotter) = &snapshotter {
            snapshotter.restore().await;
        }
    }

    let audit = audit::build_audit_log(&config).map(Arc::new);
    let state = AppState::new(repository.clone(), snapshotter.clone(), audit);
    let app = api::router(state);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let snapshot_task = snapshotter.clone().map(|snapshotter| {
        tokio::spawn(async move { snapshotter.run(shutdown_rx).await })
    });

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("running server on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("received shutdown signal, shutting down");

    let _ = shutdown_tx.send(true);
    if let Some(task) = snapshot_task {
        let _ = task.await;
    }

    // Final flush regardless of the periodic schedule, so writes made since
    // the last tick are not lost.
    if let Some(snapshotter) = &snapshotter {
        if let Err(e) = snapshotter.flush().await {
            error!("final snapshot failed: {e}");
        }
    }

    repository.close().await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("unable to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("unable to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
