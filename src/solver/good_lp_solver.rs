// good_lp solver adapter
// Translates the domain LP into a good_lp model and back. Clarabel is always
// available, CBC only with the `cbc` feature.

use crate::domain::{
    models::{LinearProblem, Solution as DomainSolution, SolverConfig, SolverStatistics},
    solver_service::{LpError, Result, SolverService},
    value_objects::{ConstraintType, SolutionStatus as DomainSolutionStatus},
};
use good_lp::{
    solvers::clarabel::clarabel, variable, Constraint as GoodLpConstraint, Expression,
    ProblemVariables, ResolutionError, Solution as GoodLpSolutionTrait, SolverModel,
    Variable as GoodLpVariable,
};
use std::time::Instant;

/// Engines reachable through good_lp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoodLpEngine {
    Clarabel,
    #[cfg(feature = "cbc")]
    CoinCbc,
}

pub struct GoodLpSolver {
    engine: GoodLpEngine,
    config: SolverConfig,
}

impl GoodLpSolver {
    pub fn new(engine: GoodLpEngine, config: SolverConfig) -> Self {
        if engine == GoodLpEngine::Clarabel && config.time_limit.is_some() {
            tracing::warn!("time limit is not supported by Clarabel and will be ignored");
        }
        Self { engine, config }
    }

    pub fn clarabel() -> Self {
        Self::new(GoodLpEngine::Clarabel, SolverConfig::default())
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

/// good_lp side of a problem, before an engine is chosen.
struct Translated {
    vars: ProblemVariables,
    columns: Vec<GoodLpVariable>,
    objective: Expression,
    rows: Vec<GoodLpConstraint>,
}

fn translate(problem: &LinearProblem) -> Translated {
    let mut vars = ProblemVariables::new();
    let columns: Vec<GoodLpVariable> = problem
        .variables
        .iter()
        .map(|v| {
            let def = variable().min(v.lower_bound);
            match v.upper_bound {
                Some(upper) => vars.add(def.max(upper)),
                None => vars.add(def),
            }
        })
        .collect();

    let mut objective: Expression = 0.into();
    for (i, &coeff) in problem.objective.iter().enumerate() {
        if coeff != 0.0 {
            objective += coeff * columns[i];
        }
    }

    let rows = problem
        .constraints
        .iter()
        .map(|constraint| {
            let mut lhs: Expression = 0.into();
            for &(var, coeff) in &constraint.terms {
                if coeff != 0.0 {
                    lhs += coeff * columns[var.index()];
                }
            }
            match constraint.constraint_type {
                ConstraintType::LessThanOrEqual => lhs.leq(constraint.bound),
                ConstraintType::Equal => lhs.eq(constraint.bound),
                ConstraintType::GreaterThanOrEqual => lhs.geq(constraint.bound),
            }
        })
        .collect();

    Translated {
        vars,
        columns,
        objective,
        rows,
    }
}

/// Copy every column value out, so nothing of the native model survives.
fn column_values<S: GoodLpSolutionTrait>(sol: &S, columns: &[GoodLpVariable]) -> Vec<f64> {
    columns.iter().map(|&var| sol.value(var)).collect()
}

fn collect(
    outcome: std::result::Result<Vec<f64>, ResolutionError>,
    problem: &LinearProblem,
    statistics: SolverStatistics,
) -> Result<DomainSolution> {
    match outcome {
        Ok(variable_values) => {
            let objective = problem.evaluate(&variable_values);

            let mut solution = DomainSolution::optimal(objective, variable_values);
            solution.statistics = statistics;
            solution.message = format!("Optimal solution found for '{}'", problem.name);
            Ok(solution)
        }
        Err(ResolutionError::Infeasible) => Ok(DomainSolution::new(
            DomainSolutionStatus::Infeasible,
            "Problem is infeasible: no solution satisfies all constraints",
        )
        .with_statistics(statistics)),
        Err(ResolutionError::Unbounded) => Ok(DomainSolution::new(
            DomainSolutionStatus::Unbounded,
            "Problem is unbounded: objective can be improved infinitely",
        )
        .with_statistics(statistics)),
        Err(e) => Err(LpError::ExecutionFailed(format!("{:?}", e))),
    }
}

impl SolverService for GoodLpSolver {
    fn solve(&self, problem: &LinearProblem) -> Result<DomainSolution> {
        self.validate(problem)?;

        let start_time = Instant::now();
        let Translated {
            vars,
            columns,
            objective,
            rows,
        } = translate(problem);

        let outcome = match self.engine {
            GoodLpEngine::Clarabel => {
                let mut model = vars.minimise(objective).using(clarabel);
                for row in rows {
                    model = model.with(row);
                }
                model.solve().map(|sol| column_values(&sol, &columns))
            }
            #[cfg(feature = "cbc")]
            GoodLpEngine::CoinCbc => {
                let mut model = vars
                    .minimise(objective)
                    .using(good_lp::solvers::coin_cbc::coin_cbc);
                if let Some(seconds) = self.config.time_limit {
                    model.set_parameter("seconds", &seconds.to_string());
                }
                if !self.config.verbose {
                    model.set_parameter("log", "0");
                }
                for row in rows {
                    model = model.with(row);
                }
                model.solve().map(|sol| column_values(&sol, &columns))
            }
        };

        let statistics = SolverStatistics {
            solve_time_ms: start_time.elapsed().as_secs_f64() * 1000.0,
            num_variables: problem.num_variables() as u32,
            num_constraints: problem.num_constraints() as u32,
        };

        collect(outcome, problem, statistics)
    }

    fn name(&self) -> &str {
        match self.engine {
            GoodLpEngine::Clarabel => "Clarabel",
            #[cfg(feature = "cbc")]
            GoodLpEngine::CoinCbc => "COIN-OR CBC",
        }
    }
}
