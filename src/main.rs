use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use llm_queue::{
    config::Config,
    llm::HttpVectorService,
    queue::JobQueue,
    routes::create_router,
    utils::init_logger,
    AppState,
};

/// In-process LLM job queue with an HTTP front end
#[derive(Debug, Parser)]
#[command(name = "llm-queue", version, about)]
struct Cli {
    /// Number of queue workers (overrides LLM_QUEUE_WORKERS)
    #[arg(short, long)]
    workers: Option<usize>,

    /// HTTP port (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(workers) = cli.workers {
        config.queue.worker_count = workers;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    info!("Configuration loaded: {:?}", config);

    let service = HttpVectorService::from_config(&config.llm)?;
    let queue = JobQueue::new(config.queue.clone(), Arc::new(service))?;
    queue.start().await;
    info!("LLM service URL: {}", config.llm.url);

    let state = AppState { queue: queue.clone(), config: config.clone() };
    let app = create_router(state);

    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down gracefully...");
        })
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    queue.shutdown().await;

    Ok(())
}
