//! Client side of the remote optimizer.

use super::mappers::{self, adequacy};
use crate::domain::{AdequacyError, ModelError, ScenarioFailures, Study, StudyResult};
use crate::optimizer::Optimizer;
use adequacy::adequacy_solver_client::AdequacySolverClient;
use adequacy::solve_response::Outcome;
use tonic::Code;

/// Sends studies to an `adequacy serve` instance.
#[derive(Debug, Clone)]
pub struct RemoteOptimizer {
    url: String,
    token: String,
}

impl RemoteOptimizer {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn solve_async(&self, study: &Study) -> Result<StudyResult, AdequacyError> {
        let mut client = AdequacySolverClient::connect(self.url.clone())
            .await
            .map_err(|e| AdequacyError::Remote(format!("cannot reach {}: {}", self.url, e)))?;

        let request = adequacy::SolveRequest {
            study: Some(mappers::domain_to_proto_study(study)),
            token: self.token.clone(),
        };

        let response = client.solve_study(request).await.map_err(|status| match status.code() {
            Code::InvalidArgument => AdequacyError::Model(ModelError::Rejected(status.message().to_string())),
            Code::PermissionDenied => AdequacyError::Remote(format!("access denied: {}", status.message())),
            _ => AdequacyError::Remote(format!("{:?}: {}", status.code(), status.message())),
        })?;

        match response.into_inner().outcome {
            Some(Outcome::Result(result)) => mappers::proto_to_domain_result(result)
                .map_err(|status| AdequacyError::Remote(format!("malformed result: {}", status.message()))),
            Some(Outcome::Failure(report)) => Err(AdequacyError::ScenariosFailed(ScenarioFailures(
                mappers::proto_to_domain_failures(report),
            ))),
            None => Err(AdequacyError::Remote("empty response".to_string())),
        }
    }

    pub async fn server_info(&self) -> Result<adequacy::ServerInfo, AdequacyError> {
        let mut client = AdequacySolverClient::connect(self.url.clone())
            .await
            .map_err(|e| AdequacyError::Remote(format!("cannot reach {}: {}", self.url, e)))?;
        client
            .get_server_info(adequacy::Empty {})
            .await
            .map(|r| r.into_inner())
            .map_err(|status| AdequacyError::Remote(status.message().to_string()))
    }
}

impl Optimizer for RemoteOptimizer {
    /// Blocking solve on a private runtime. Must not be called from inside
    /// an async context; use [`RemoteOptimizer::solve_async`] there.
    fn solve(&self, study: &Study) -> Result<StudyResult, AdequacyError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AdequacyError::Remote(format!("cannot start runtime: {}", e)))?;
        runtime.block_on(self.solve_async(study))
    }

    fn name(&self) -> String {
        format!("remote ({})", self.url)
    }
}
