//! Fans scenarios out to a bounded worker pool and merges them back by index.

use crate::domain::{AdequacyError, ScenarioError, ScenarioFailures, SolverService, Study};
use crate::optimizer::scenario::{ScenarioSolution, ScenarioSolver};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::sync::Arc;

pub struct ScenarioScheduler {
    workers: usize,
    solver: Arc<dyn SolverService>,
}

impl ScenarioScheduler {
    /// `workers == 0` sizes the pool to the available cores.
    pub fn new(workers: usize, solver: Arc<dyn SolverService>) -> Self {
        let workers = if workers == 0 { num_cpus::get() } else { workers };
        Self { workers, solver }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Build and solve every scenario of `study`. Every scenario runs to
    /// completion; failures are collected in scenario order.
    pub fn run(&self, study: &Study) -> Result<Vec<ScenarioSolution>, AdequacyError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers.min(study.nb_scn.max(1)))
            .thread_name(|i| format!("adequacy-worker-{}", i))
            .build()
            .map_err(|e| AdequacyError::WorkerPool(e.to_string()))?;

        let mut slots: Vec<Option<Result<ScenarioSolution, ScenarioError>>> =
            (0..study.nb_scn).map(|_| None).collect();

        let solver = self.solver.as_ref();
        let built: Result<(), crate::domain::ModelError> = pool.install(|| {
            slots
                .par_iter_mut()
                .enumerate()
                .try_for_each(|(scenario, slot)| {
                    let span = tracing::info_span!("scenario", scenario);
                    let _enter = span.enter();
                    let problem = ScenarioSolver::new(study, scenario).build()?;
                    *slot = Some(problem.solve(solver));
                    Ok(())
                })
        });
        built?;

        let mut solutions = Vec::with_capacity(study.nb_scn);
        let mut failures = Vec::new();
        for slot in slots {
            match slot {
                Some(Ok(solution)) => solutions.push(solution),
                Some(Err(err)) => {
                    tracing::warn!(scenario = err.scenario(), error = %err, "scenario failed");
                    failures.push(err);
                }
                None => {
                    return Err(AdequacyError::WorkerPool(
                        "a scenario slot was left empty".to_string(),
                    ))
                }
            }
        }

        if failures.is_empty() {
            Ok(solutions)
        } else {
            failures.sort_by_key(|e| e.scenario());
            Err(AdequacyError::ScenariosFailed(ScenarioFailures(failures)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::solver_service::Result as LpResult;
    use crate::domain::{
        Consumption, LinearProblem, Network, Node, Solution, SolutionStatus, TimeSeries,
    };

    /// Optimal for every problem whose first balance row has a positive load,
    /// infeasible otherwise.
    struct ByLoad;

    impl SolverService for ByLoad {
        fn solve(&self, problem: &LinearProblem) -> LpResult<Solution> {
            if problem.constraints[0].bound > 0.0 {
                let values = vec![0.0; problem.num_variables()];
                Ok(Solution::optimal(problem.constraints[0].bound, values))
            } else {
                Ok(Solution::new(SolutionStatus::Infeasible, "no load"))
            }
        }

        fn name(&self) -> &str {
            "by-load"
        }
    }

    fn study(loads: Vec<f64>) -> Study {
        let nb_scn = loads.len();
        let quantity = TimeSeries::from_flat(nb_scn, 1, loads).unwrap();
        Study::new(1, nb_scn).with_network(
            "n",
            Network::new().with_node(
                "a",
                Node::new().with_consumption(Consumption::new("load", 10.0, quantity)),
            ),
        )
    }

    #[test]
    fn results_come_back_in_scenario_order() {
        let scheduler = ScenarioScheduler::new(3, Arc::new(ByLoad));
        let loads: Vec<f64> = (1..=8).map(f64::from).collect();

        let solutions = scheduler.run(&study(loads.clone())).unwrap();

        let objectives: Vec<f64> = solutions.iter().map(|s| s.objective).collect();
        assert_eq!(objectives, loads);
        assert!(solutions.iter().enumerate().all(|(i, s)| s.scenario == i));
    }

    #[test]
    fn every_failure_is_reported_sorted() {
        let scheduler = ScenarioScheduler::new(2, Arc::new(ByLoad));

        let err = scheduler.run(&study(vec![0.0, 5.0, 0.0, 0.0])).unwrap_err();

        let failed: Vec<usize> = err.failures().iter().map(|e| e.scenario()).collect();
        assert_eq!(failed, vec![0, 2, 3]);
    }

    #[test]
    fn zero_workers_means_available_cores() {
        let scheduler = ScenarioScheduler::new(0, Arc::new(ByLoad));
        assert_eq!(scheduler.workers(), num_cpus::get());
    }
}
