// Infrastructure: Server setup and configuration
// Single Responsibility: Manage server lifecycle and configuration

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

use crate::application::mappers::adequacy::adequacy_solver_server::AdequacySolverServer;
use crate::application::GrpcAdequacyService;
use crate::optimizer::{LpOptimizer, OptimizerConfig};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: SocketAddr,
    pub optimizer: OptimizerConfig,
    /// Required from clients when set.
    pub token: Option<String>,
}

impl ServerConfig {
    pub fn new(address: SocketAddr, optimizer: OptimizerConfig) -> Self {
        Self {
            address,
            optimizer,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

fn build_service(config: &ServerConfig) -> Result<GrpcAdequacyService, Box<dyn std::error::Error + Send + Sync>> {
    let optimizer = LpOptimizer::new(config.optimizer.clone())?;
    let workers = match config.optimizer.workers {
        0 => num_cpus::get(),
        n => n,
    };
    tracing::info!(
        backend = %config.optimizer.solver.backend,
        workers,
        auth = config.token.is_some(),
        "adequacy server ready"
    );
    Ok(GrpcAdequacyService::new(Arc::new(optimizer), config.token.clone(), workers))
}

pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let service = build_service(&config)?;
    tracing::info!(address = %config.address, "listening");

    Server::builder()
        .add_service(AdequacySolverServer::new(service))
        .serve(config.address)
        .await?;

    Ok(())
}

/// Serve on an already bound listener, e.g. an ephemeral loopback port.
pub async fn serve_with_listener(
    config: ServerConfig,
    listener: TcpListener,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let service = build_service(&config)?;
    tracing::info!(address = ?listener.local_addr().ok(), "listening");

    Server::builder()
        .add_service(AdequacySolverServer::new(service))
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await?;

    Ok(())
}
