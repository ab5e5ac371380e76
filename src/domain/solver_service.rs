// Domain service interface for solving linear problems
// Defines the contract that any solver implementation must follow (Dependency Inversion Principle)

use super::models::{LinearProblem, Solution};

/// Error types for the solver boundary
#[derive(Debug, thiserror::Error)]
pub enum LpError {
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    #[error("Solver not available: {0}")]
    SolverNotAvailable(String),

    #[error("Solver execution failed: {0}")]
    ExecutionFailed(String),
}

pub type Result<T> = std::result::Result<T, LpError>;

/// Domain service interface for LP solvers
///
/// Implementations own every solver-native object they create. Nothing but the
/// returned [`Solution`] outlives a call to [`SolverService::solve`], which is
/// what makes a single service instance safe to share between scenario workers.
pub trait SolverService: Send + Sync {
    /// Minimise the problem objective
    fn solve(&self, problem: &LinearProblem) -> Result<Solution>;

    /// Validate a problem without solving it
    fn validate(&self, problem: &LinearProblem) -> Result<()> {
        let mut errors = Vec::new();
        let num_vars = problem.num_variables();

        if problem.objective.len() != num_vars {
            errors.push(format!(
                "Objective has {} coefficients but problem has {} variables",
                problem.objective.len(),
                num_vars
            ));
        }

        if problem.objective.iter().any(|c| !c.is_finite()) {
            errors.push("Objective has non-finite coefficients".to_string());
        }

        for (i, constraint) in problem.constraints.iter().enumerate() {
            if !constraint.bound.is_finite() {
                errors.push(format!("Constraint {} '{}' has a non-finite bound", i, constraint.name));
            }
            for (var, coefficient) in &constraint.terms {
                if var.index() >= num_vars {
                    errors.push(format!(
                        "Constraint {} '{}' references unknown variable {}",
                        i,
                        constraint.name,
                        var.index()
                    ));
                }
                if !coefficient.is_finite() {
                    errors.push(format!(
                        "Constraint {} '{}' has a non-finite coefficient",
                        i, constraint.name
                    ));
                }
            }
        }

        for (i, var) in problem.variables.iter().enumerate() {
            if let Some(upper) = var.upper_bound {
                if var.lower_bound > upper {
                    errors.push(format!(
                        "Variable {} '{}' has lower bound ({}) > upper bound ({})",
                        i, var.name, var.lower_bound, upper
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LpError::InvalidProblem(errors.join("; ")))
        }
    }

    /// Get the name of this solver backend
    fn name(&self) -> &str;
}
