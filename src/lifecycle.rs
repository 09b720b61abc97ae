//! Run modes: front-end + bridge (default) or bridge only.

use anyhow::Result;
use std::path::PathBuf;
use std::process::ExitStatus;
use tokio::net::TcpListener;

use crate::bridge::BridgeServer;
use crate::config::BridgeConfig;
use crate::launcher::{self, Frontend};

/// What happened during a front-end run.
#[derive(Debug)]
pub struct LaunchOutcome {
    pub frontend: PathBuf,
    pub frontend_status: ExitStatus,
    /// false when another instance already held the listening port
    pub served: bool,
}

/// Candidate list from config, or the built-in probe order.
pub fn frontend_candidates(cfg: &BridgeConfig) -> Vec<PathBuf> {
    match &cfg.frontend_candidates {
        Some(list) => list.clone(),
        None => {
            let (exe_dir, cwd) = launcher::probe_roots();
            launcher::default_candidates(&exe_dir, &cwd, &cfg.frontend_name)
        }
    }
}

/// Discover and start the front-end, serve the bridge while it runs (unless
/// the port is taken), and return once the front-end exits.
///
/// Discovery happens before anything binds, so a missing front-end leaves
/// the port untouched.
pub async fn run_with_frontend(cfg: &BridgeConfig, server: BridgeServer) -> Result<LaunchOutcome> {
    let candidates = frontend_candidates(cfg);
    let exe = launcher::discover(&candidates)?;
    tracing::info!("Launching frontend: {}", exe.display());
    let frontend = Frontend::launch(&exe)?;

    let server_task = match launcher::try_bind(&cfg.listen_addr).await {
        Some(listener) => Some(tokio::spawn(async move {
            if let Err(e) = server.serve(listener, std::future::pending()).await {
                tracing::error!("HTTP server error: {}", e);
            }
        })),
        None => None,
    };
    let served = server_task.is_some();

    // 프론트엔드 종료 = 프로세스 종료
    let waited = frontend.wait().await;
    if let Some(task) = server_task {
        task.abort();
    }
    let frontend_status = waited?;

    Ok(LaunchOutcome {
        frontend: exe,
        frontend_status,
        served,
    })
}

/// Bridge only. Bind failure is fatal here since there is no front-end to
/// keep the process alive for.
pub async fn run_standalone(cfg: &BridgeConfig, server: BridgeServer) -> Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", cfg.listen_addr, e))?;
    server.serve(listener, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
