use std::sync::Arc;
use tonic::{Request, Response, Status};

use super::mappers::{self, adequacy};
use crate::domain::AdequacyError;
use crate::optimizer::Optimizer;

/// gRPC service implementation
pub struct GrpcAdequacyService {
    optimizer: Arc<dyn Optimizer>,
    token: Option<String>,
    workers: usize,
}

impl GrpcAdequacyService {
    pub fn new(optimizer: Arc<dyn Optimizer>, token: Option<String>, workers: usize) -> Self {
        Self {
            optimizer,
            token,
            workers,
        }
    }

    fn authorize(&self, token: &str) -> Result<(), Status> {
        match &self.token {
            Some(expected) if expected != token => {
                Err(Status::permission_denied("wrong access token"))
            }
            _ => Ok(()),
        }
    }
}

#[tonic::async_trait]
impl adequacy::adequacy_solver_server::AdequacySolver for GrpcAdequacyService {
    async fn solve_study(
        &self,
        request: Request<adequacy::SolveRequest>,
    ) -> Result<Response<adequacy::SolveResponse>, Status> {
        let request = request.into_inner();
        self.authorize(&request.token)?;

        let proto_study = request
            .study
            .ok_or_else(|| Status::invalid_argument("missing study"))?;
        let study = mappers::proto_to_domain_study(proto_study).map_err(|e| *e)?;
        tracing::info!(
            nb_scn = study.nb_scn,
            horizon = study.horizon,
            networks = study.networks.len(),
            "remote study received"
        );

        // The solve blocks on its own worker pool
        let optimizer = Arc::clone(&self.optimizer);
        let outcome = tokio::task::spawn_blocking(move || optimizer.solve(&study))
            .await
            .map_err(|e| Status::internal(format!("solve task failed: {}", e)))?;

        use adequacy::solve_response::Outcome;
        let outcome = match outcome {
            Ok(result) => Outcome::Result(mappers::domain_to_proto_result(&result)),
            Err(AdequacyError::ScenariosFailed(failures)) => {
                tracing::warn!(failed = failures.0.len(), "remote study has failed scenarios");
                Outcome::Failure(mappers::domain_to_proto_failures(&failures.0))
            }
            Err(AdequacyError::Model(e)) => return Err(Status::invalid_argument(e.to_string())),
            Err(e) => return Err(Status::internal(e.to_string())),
        };

        Ok(Response::new(adequacy::SolveResponse {
            outcome: Some(outcome),
        }))
    }

    async fn get_server_info(
        &self,
        _request: Request<adequacy::Empty>,
    ) -> Result<Response<adequacy::ServerInfo>, Status> {
        Ok(Response::new(adequacy::ServerInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            backend: self.optimizer.name(),
            workers: self.workers as u32,
        }))
    }
}
