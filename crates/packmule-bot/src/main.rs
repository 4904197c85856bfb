//! Packmule: a Nostr-driven remote control for an aria2 download daemon.
//!
//! Senders authenticate once with a shared unlock code over NIP-04 encrypted
//! direct messages, then drive downloads with a small command vocabulary.
//! Two HTTP listeners run alongside: a status dashboard and a file server
//! for the download directory.

mod config;
mod dispatcher;
mod stats;
mod web;

use std::sync::{Arc, Mutex};
use std::time::Instant;

use aria2_client::{Aria2Client, DownloadManager};
use packmule_core::{format, AuthStore, ReplayCache};
use packmule_nostr::{
    ConnectionSupervisor, PublishGateway, RelayPool, SecureChannel, SupervisorConfig, ToBech32,
};
use tokio::sync::watch;
use torrent_index::{TorrentIndex, TorrentioClient};
use tracing::{info, warn};

use crate::config::Config;
use crate::dispatcher::{BotHandler, CommandDispatcher};
use crate::stats::StatsBroadcaster;
use crate::web::DashboardState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let started_at = Instant::now();

    let pubkey = config.keys.public_key();
    let pubkey_hex = pubkey.to_hex();
    let npub = pubkey.to_bech32().unwrap_or_else(|_| pubkey_hex.clone());
    info!(pubkey = %format::short(&pubkey_hex), npub = %npub, "bot identity");
    info!(relays = ?config.relays, "relay set");
    info!(unlock_code = %config.unlock_code, "unlock code");
    info!(save_dir = %config.save_dir.display(), "download directory");

    let auth = Arc::new(Mutex::new(AuthStore::new(config.unlock_code.clone())));
    let replay = Arc::new(Mutex::new(ReplayCache::default()));
    let channel = SecureChannel::new(config.keys.clone());

    let downloads: Arc<dyn DownloadManager> = Arc::new(Aria2Client::new(
        &config.aria2_endpoint,
        &config.save_dir,
    )?);
    let index: Arc<dyn TorrentIndex> = Arc::new(TorrentioClient::new()?);

    let pool = RelayPool::connect(config.keys.clone(), config.relays.clone()).await?;
    let gateway = PublishGateway::new(pool.clone());

    let dispatcher = Arc::new(CommandDispatcher::new(
        downloads.clone(),
        index,
        auth.clone(),
        config.save_dir.clone(),
        config.file_addr.port(),
    ));
    let handler = Arc::new(BotHandler::new(
        dispatcher,
        channel.clone(),
        gateway.clone(),
    ));

    // One watch channel fans the shutdown signal out to every task.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let dashboard_state = DashboardState {
        downloads: downloads.clone(),
        auth: auth.clone(),
        pubkey: pubkey_hex,
        npub,
        save_dir: config.save_dir.clone(),
        file_port: config.file_addr.port(),
        unlock_code: config.unlock_code.clone(),
        started_at,
    };
    let dashboard = web::dashboard_router(dashboard_state, "public".into());
    let files = web::file_router(config.save_dir.clone());

    info!(addr = %config.dashboard_addr, "status dashboard listening");
    let dashboard_shutdown = wait_for_shutdown(shutdown_rx.clone());
    let dashboard_addr = config.dashboard_addr;
    tokio::spawn(async move {
        if let Err(err) = web::serve(dashboard_addr, dashboard, dashboard_shutdown).await {
            warn!(error = %err, "status dashboard stopped");
        }
    });
    info!(addr = %config.file_addr, "file server listening");
    let files_shutdown = wait_for_shutdown(shutdown_rx.clone());
    let file_addr = config.file_addr;
    tokio::spawn(async move {
        if let Err(err) = web::serve(file_addr, files, files_shutdown).await {
            warn!(error = %err, "file server stopped");
        }
    });

    let broadcaster = StatsBroadcaster::new(
        downloads,
        gateway,
        channel.clone(),
        auth.clone(),
        config.save_dir.clone(),
        config.stats_interval,
        started_at,
    );
    tokio::spawn(broadcaster.run(wait_for_shutdown(shutdown_rx.clone())));

    let supervisor = ConnectionSupervisor::new(
        pool.clone(),
        channel,
        replay.clone(),
        auth,
        handler,
        SupervisorConfig {
            event_window: config.event_window,
            ..SupervisorConfig::default()
        },
    );
    info!("packmule running, send the bot a direct message");
    supervisor.run(wait_for_shutdown(shutdown_rx)).await?;

    // Teardown order mirrors startup in reverse; every step is best-effort.
    pool.shutdown().await;
    match replay.lock() {
        Ok(mut cache) => cache.clear(),
        Err(poisoned) => poisoned.into_inner().clear(),
    }
    info!("packmule stopped");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Resolves on SIGINT, SIGTERM, or SIGHUP.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                return tokio::signal::ctrl_c().await.unwrap_or(());
            }
        };
        let mut hup = match signal(SignalKind::hangup()) {
            Ok(hup) => hup,
            Err(err) => {
                warn!(error = %err, "failed to install SIGHUP handler");
                return tokio::signal::ctrl_c().await.unwrap_or(());
            }
        };
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    warn!(error = %err, "ctrl-c listener failed");
                }
            }
            _ = term.recv() => {}
            _ = hup.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "ctrl-c listener failed");
        }
    }
}
