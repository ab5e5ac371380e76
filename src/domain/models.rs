use super::value_objects::{ConstraintType, SolutionStatus, SolverBackend};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a decision variable inside a [`LinearProblem`].
///
/// Only meaningful for the problem that issued it. It is a plain index, so it
/// can be copied, hashed and sent across threads without touching any solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Index of a constraint row inside a [`LinearProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(usize);

impl RowId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Continuous decision variable in an optimization problem
#[derive(Debug, Clone)]
pub struct Variable {
    pub lower_bound: f64,
    pub upper_bound: Option<f64>,
    pub name: String,
}

impl Variable {
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            lower_bound: 0.0,
            upper_bound: None,
            name: name.into(),
        }
    }

    pub fn with_bounds(mut self, lower: f64, upper: Option<f64>) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }
}

/// Linear constraint row, stored sparsely as (variable, coefficient) pairs
#[derive(Debug, Clone)]
pub struct Constraint {
    pub constraint_type: ConstraintType,
    pub terms: Vec<(VarId, f64)>,
    pub bound: f64,
    pub name: String,
}

impl Constraint {
    pub fn new(constraint_type: ConstraintType, bound: f64) -> Self {
        Self {
            constraint_type,
            terms: Vec::new(),
            bound,
            name: String::new(),
        }
    }

    pub fn equal(bound: f64) -> Self {
        Self::new(ConstraintType::Equal, bound)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_term(mut self, var: VarId, coefficient: f64) -> Self {
        self.set_coefficient(var, coefficient);
        self
    }

    /// Set the coefficient of `var`, replacing any previous one.
    pub fn set_coefficient(&mut self, var: VarId, coefficient: f64) {
        match self.terms.iter_mut().find(|(v, _)| *v == var) {
            Some(term) => term.1 = coefficient,
            None => self.terms.push((var, coefficient)),
        }
    }

    pub fn coefficient(&self, var: VarId) -> Option<f64> {
        self.terms
            .iter()
            .find(|(v, _)| *v == var)
            .map(|(_, coefficient)| *coefficient)
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }
}

/// Configuration for the solver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub backend: SolverBackend,
    /// Seconds, passed through to backends that support it.
    pub time_limit: Option<f64>,
    pub verbose: bool,
}

/// Minimisation LP: variables, rows and a dense objective.
///
/// Problems are cheap value types. The engine builds one per scenario and
/// hands it to a [`SolverService`](super::SolverService) which translates it
/// into its native representation for the duration of a single solve.
#[derive(Debug, Clone, Default)]
pub struct LinearProblem {
    pub name: String,
    pub variables: Vec<Variable>,
    pub constraints: Vec<Constraint>,
    pub objective: Vec<f64>,
}

impl LinearProblem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_variable(&mut self, variable: Variable) -> VarId {
        self.variables.push(variable);
        self.objective.push(0.0);
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> RowId {
        self.constraints.push(constraint);
        RowId(self.constraints.len() - 1)
    }

    pub fn set_coefficient(&mut self, row: RowId, var: VarId, coefficient: f64) {
        self.constraints[row.0].set_coefficient(var, coefficient);
    }

    pub fn set_objective_coefficient(&mut self, var: VarId, coefficient: f64) {
        self.objective[var.0] = coefficient;
    }

    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var.0]
    }

    pub fn constraint(&self, row: RowId) -> &Constraint {
        &self.constraints[row.0]
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Objective value of an assignment, one value per variable.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .zip(values)
            .map(|(coefficient, value)| coefficient * value)
            .sum()
    }
}

fn lp_name(name: &str, fallback: &str, index: usize) -> String {
    if name.is_empty() {
        return format!("{}{}", fallback, index);
    }
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// CPLEX LP text export, used for debugging dumps.
impl fmt::Display for LinearProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .variables
            .iter()
            .enumerate()
            .map(|(i, v)| lp_name(&v.name, "x", i))
            .collect();

        writeln!(f, "\\ {}", self.name)?;
        writeln!(f, "Minimize")?;
        write!(f, " obj:")?;
        for (i, &coefficient) in self.objective.iter().enumerate() {
            if coefficient != 0.0 {
                write!(f, " {:+} {}", coefficient, names[i])?;
            }
        }
        writeln!(f)?;

        writeln!(f, "Subject To")?;
        for (i, constraint) in self.constraints.iter().enumerate() {
            write!(f, " {}:", lp_name(&constraint.name, "c", i))?;
            for (var, coefficient) in &constraint.terms {
                write!(f, " {:+} {}", coefficient, names[var.0])?;
            }
            writeln!(
                f,
                " {} {}",
                constraint.constraint_type.symbol(),
                constraint.bound
            )?;
        }

        writeln!(f, "Bounds")?;
        for (i, variable) in self.variables.iter().enumerate() {
            match variable.upper_bound {
                Some(upper) => writeln!(f, " {} <= {} <= {}", variable.lower_bound, names[i], upper)?,
                None => writeln!(f, " {} >= {}", names[i], variable.lower_bound)?,
            }
        }
        writeln!(f, "End")
    }
}

/// Statistics about the solve process
#[derive(Debug, Clone, Default)]
pub struct SolverStatistics {
    pub solve_time_ms: f64,
    pub num_variables: u32,
    pub num_constraints: u32,
}

/// Solution to a linear problem.
///
/// Pure numeric values: one entry per declared variable, indexed by [`VarId`].
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: SolutionStatus,
    pub optimal_value: Option<f64>,
    pub variable_values: Vec<f64>,
    pub message: String,
    pub statistics: SolverStatistics,
}

impl Solution {
    pub fn new(status: SolutionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            optimal_value: None,
            variable_values: Vec::new(),
            message: message.into(),
            statistics: SolverStatistics::default(),
        }
    }

    pub fn optimal(value: f64, variable_values: Vec<f64>) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            optimal_value: Some(value),
            variable_values,
            message: "Optimal solution found".to_string(),
            statistics: SolverStatistics::default(),
        }
    }

    pub fn with_statistics(mut self, statistics: SolverStatistics) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.variable_values.get(var.0).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_coefficient_overwrites_instead_of_adding() {
        let mut problem = LinearProblem::new("p");
        let x = problem.add_variable(Variable::continuous("x"));
        let row = problem.add_constraint(Constraint::equal(3.0));

        problem.set_coefficient(row, x, 1.0);
        problem.set_coefficient(row, x, 1.0);

        assert_eq!(problem.constraint(row).num_terms(), 1);
        assert_eq!(problem.constraint(row).coefficient(x), Some(1.0));
    }

    #[test]
    fn new_variables_start_with_zero_cost() {
        let mut problem = LinearProblem::new("p");
        let x = problem.add_variable(Variable::continuous("x"));
        let y = problem.add_variable(Variable::continuous("y").with_bounds(0.0, Some(4.0)));
        problem.set_objective_coefficient(y, 2.5);

        assert_eq!(problem.objective, vec![0.0, 2.5]);
        assert_eq!(x.index(), 0);
        assert_eq!(problem.evaluate(&[10.0, 2.0]), 5.0);
    }

    #[test]
    fn lp_export_lists_rows_and_bounds() {
        let mut problem = LinearProblem::new("demo");
        let x = problem.add_variable(
            Variable::continuous("prod gas on a").with_bounds(0.0, Some(10.0)),
        );
        problem.set_objective_coefficient(x, 3.0);
        problem.add_constraint(Constraint::equal(5.0).with_name("balance a").with_term(x, 1.0));

        let text = problem.to_string();
        assert!(text.contains("Minimize"));
        assert!(text.contains("+3 prod_gas_on_a"));
        assert!(text.contains("balance_a: +1 prod_gas_on_a = 5"));
        assert!(text.contains("0 <= prod_gas_on_a <= 10"));
    }
}
