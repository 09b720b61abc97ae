use metys_bridge::bridge::BridgeServer;
use metys_bridge::config::BridgeConfig;
use metys_bridge::lifecycle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    tracing::info!("MetysAI bridge starting");

    let mut cfg = BridgeConfig::load()?;
    if std::env::args().skip(1).any(|arg| arg == "--standalone") {
        cfg.standalone = true;
    }

    let server = BridgeServer::from_config(&cfg)?;

    if cfg.standalone {
        tracing::info!("Standalone mode: serving on {} without frontend", cfg.listen_addr);
        if let Err(e) = lifecycle::run_standalone(&cfg, server).await {
            tracing::error!("{:#}", e);
            std::process::exit(1);
        }
    } else {
        match lifecycle::run_with_frontend(&cfg, server).await {
            Ok(outcome) => {
                if !outcome.served {
                    tracing::info!("Bridge requests were handled by another instance");
                }
            }
            Err(e) => {
                // 프론트엔드를 찾지 못하면 부분 기동 없이 즉시 종료
                tracing::error!("{:#}", e);
                std::process::exit(1);
            }
        }
    }

    tracing::info!("MetysAI bridge shutting down");
    Ok(())
}
