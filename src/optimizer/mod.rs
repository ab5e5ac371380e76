//! Adequacy engine: study in, per-scenario minimal-cost dispatch out.

pub mod assembler;
pub mod binder;
pub mod builders;
pub mod scenario;
pub mod scheduler;

use crate::domain::{AdequacyError, SolverConfig, SolverService, Study, StudyResult};
use crate::solver::SolverFactory;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

pub use assembler::OutputMapper;
pub use scenario::{EntityKey, EntityKind, ScenarioSolution, ScenarioSolver, ScenarioState};
pub use scheduler::ScenarioScheduler;

/// Anything able to turn a study into a result.
pub trait Optimizer: Send + Sync {
    fn solve(&self, study: &Study) -> Result<StudyResult, AdequacyError>;

    fn name(&self) -> String;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub solver: SolverConfig,
    /// Concurrent scenario solves. `0` uses every available core.
    pub workers: usize,
}

/// Local optimizer: one LP per scenario on an in-process solver.
pub struct LpOptimizer {
    config: OptimizerConfig,
    solver: Arc<dyn SolverService>,
}

impl LpOptimizer {
    pub fn new(config: OptimizerConfig) -> Result<Self, AdequacyError> {
        let solver = SolverFactory::create(&config.solver)?;
        Ok(Self { config, solver })
    }

    pub fn with_solver(config: OptimizerConfig, solver: Arc<dyn SolverService>) -> Self {
        Self { config, solver }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

impl Default for LpOptimizer {
    fn default() -> Self {
        Self::with_solver(OptimizerConfig::default(), SolverFactory::default_solver())
    }
}

impl Optimizer for LpOptimizer {
    fn solve(&self, study: &Study) -> Result<StudyResult, AdequacyError> {
        study.validate()?;

        let scheduler = ScenarioScheduler::new(self.config.workers, Arc::clone(&self.solver));
        tracing::info!(
            nb_scn = study.nb_scn,
            horizon = study.horizon,
            networks = study.networks.len(),
            converters = study.converters.len(),
            workers = scheduler.workers(),
            solver = self.solver.name(),
            "solving study"
        );

        let start = Instant::now();
        let solutions = scheduler.run(study)?;

        let result = assembler::assemble(study, &solutions)?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            mapper_ms = result.benchmark.mapper_ms,
            "study solved"
        );
        Ok(result)
    }

    fn name(&self) -> String {
        format!("lp ({})", self.solver.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelError, SolverBackend};

    #[test]
    fn invalid_study_is_rejected_before_scheduling() {
        let err = LpOptimizer::default().solve(&Study::new(0, 1)).unwrap_err();
        assert!(matches!(
            err,
            AdequacyError::Model(ModelError::EmptyStudy { horizon: 0, nb_scn: 1 })
        ));
    }

    #[test]
    fn config_defaults_to_auto_backend_and_all_cores() {
        let config: OptimizerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.solver.backend, SolverBackend::Auto);
        assert_eq!(config.workers, 0);
        assert_eq!(LpOptimizer::new(config).unwrap().name(), "lp (Clarabel)");
    }
}
