use crate::domain::{
    models::SolverConfig,
    solver_service::{LpError, Result, SolverService},
    value_objects::SolverBackend,
};
use crate::solver::{GoodLpEngine, GoodLpSolver};
use std::sync::Arc;

/// Factory for creating solver instances based on configuration
pub struct SolverFactory;

impl SolverFactory {
    /// Create the solver selected by `config`. Fails for a backend that is
    /// not compiled into this build.
    pub fn create(config: &SolverConfig) -> Result<Arc<dyn SolverService>> {
        match config.backend {
            SolverBackend::Auto | SolverBackend::Clarabel => Ok(Arc::new(GoodLpSolver::new(
                GoodLpEngine::Clarabel,
                config.clone(),
            ))),
            #[cfg(feature = "cbc")]
            SolverBackend::CoinCbc => Ok(Arc::new(GoodLpSolver::new(
                GoodLpEngine::CoinCbc,
                config.clone(),
            ))),
            #[cfg(feature = "highs")]
            SolverBackend::Highs => Ok(Arc::new(crate::solver::HighsSolver::new(config.clone()))),
            #[allow(unreachable_patterns)]
            other => Err(LpError::SolverNotAvailable(format!(
                "{} support is not compiled into this build",
                other
            ))),
        }
    }

    /// Get the default solver (Clarabel)
    pub fn default_solver() -> Arc<dyn SolverService> {
        Arc::new(GoodLpSolver::clarabel())
    }
}
