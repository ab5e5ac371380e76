// HiGHS adapter
// Feeds the sparse domain LP to a HiGHS row problem. Only built with `highs`.

use crate::domain::{
    models::{LinearProblem, Solution as DomainSolution, SolverConfig, SolverStatistics},
    solver_service::{LpError, Result, SolverService},
    value_objects::{ConstraintType, SolutionStatus as DomainSolutionStatus},
};
use highs::{HighsModelStatus, RowProblem, Sense};
use std::time::Instant;

pub struct HighsSolver {
    config: SolverConfig,
}

impl HighsSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl Default for HighsSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl SolverService for HighsSolver {
    fn solve(&self, problem: &LinearProblem) -> Result<DomainSolution> {
        self.validate(problem)?;

        let start_time = Instant::now();

        // RowProblem: columns first, then rows
        let mut pb = RowProblem::default();
        let cols: Vec<_> = problem
            .variables
            .iter()
            .zip(&problem.objective)
            .map(|(var, &cost)| {
                let upper = var.upper_bound.unwrap_or(f64::INFINITY);
                pb.add_column(cost, var.lower_bound..upper)
            })
            .collect();

        for constraint in &problem.constraints {
            let terms: Vec<_> = constraint
                .terms
                .iter()
                .filter(|(_, coeff)| *coeff != 0.0)
                .map(|&(var, coeff)| (cols[var.index()], coeff))
                .collect();

            match constraint.constraint_type {
                ConstraintType::LessThanOrEqual => {
                    pb.add_row(..=constraint.bound, &terms);
                }
                ConstraintType::Equal => {
                    pb.add_row(constraint.bound..=constraint.bound, &terms);
                }
                ConstraintType::GreaterThanOrEqual => {
                    pb.add_row(constraint.bound.., &terms);
                }
            }
        }

        let mut model = pb.optimise(Sense::Minimise);
        if !self.config.verbose {
            model.make_quiet();
        }
        if let Some(seconds) = self.config.time_limit {
            model.set_option("time_limit", seconds);
        }

        let solved = model.solve();

        let statistics = SolverStatistics {
            solve_time_ms: start_time.elapsed().as_secs_f64() * 1000.0,
            num_variables: problem.num_variables() as u32,
            num_constraints: problem.num_constraints() as u32,
        };

        match solved.status() {
            HighsModelStatus::Optimal => {
                let variable_values = solved.get_solution().columns().to_vec();
                let objective = problem.evaluate(&variable_values);

                let mut solution = DomainSolution::optimal(objective, variable_values);
                solution.statistics = statistics;
                solution.message = format!("Optimal solution found for '{}'", problem.name);
                Ok(solution)
            }
            HighsModelStatus::Infeasible => Ok(DomainSolution::new(
                DomainSolutionStatus::Infeasible,
                "Problem is infeasible: no solution satisfies all constraints",
            )
            .with_statistics(statistics)),
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                Ok(DomainSolution::new(
                    DomainSolutionStatus::Unbounded,
                    "Problem is unbounded: objective can be improved infinitely",
                )
                .with_statistics(statistics))
            }
            HighsModelStatus::ReachedTimeLimit => Ok(DomainSolution::new(
                DomainSolutionStatus::TimeLimit,
                "Time limit reached before an optimal solution was proven",
            )
            .with_statistics(statistics)),
            status => Err(LpError::ExecutionFailed(format!(
                "HiGHS solver returned status: {:?}",
                status
            ))),
        }
    }

    fn name(&self) -> &str {
        "HiGHS"
    }
}
