//! Error taxonomy of the adequacy engine.
//!
//! [`ModelError`] is raised before anything is solved. [`ScenarioError`] is
//! raised per scenario and collected. [`AdequacyError`] is what a study-level
//! solve returns.

use super::solver_service::LpError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Malformed study. Fatal and scenario independent.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("study must have a positive horizon and scenario count (horizon={horizon}, nb_scn={nb_scn})")]
    EmptyStudy { horizon: usize, nb_scn: usize },

    #[error("{entity}: expected shape {expected:?}, found {found:?}")]
    ShapeMismatch {
        entity: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("time series row {scenario} has {found} values, expected {expected}")]
    RaggedSeries {
        scenario: usize,
        expected: usize,
        found: usize,
    },

    #[error("no value at scenario {scenario}, t={t} in series of shape {shape:?}")]
    OutOfRange {
        scenario: usize,
        t: usize,
        shape: (usize, usize),
    },

    #[error("{entity}: {field} must be finite and non-negative, got {value}")]
    Negative {
        entity: String,
        field: &'static str,
        value: f64,
    },

    #[error("{kind} name '{name}' is not unique on {scope}")]
    DuplicateName {
        kind: &'static str,
        name: String,
        scope: String,
    },

    #[error("{context} references unknown node '{network}/{node}'")]
    UnknownNode {
        context: String,
        network: String,
        node: String,
    },

    #[error("{network}/{node} has a link to itself")]
    SelfLink { network: String, node: String },

    #[error("storage {entity}: efficiency must be in ]0, 1], got {value}")]
    InvalidEfficiency { entity: String, value: f64 },

    #[error("converter {converter}: ratio for source '{network}/{node}' must be positive, got {value}")]
    InvalidRatio {
        converter: String,
        network: String,
        node: String,
        value: f64,
    },

    #[error("study rejected: {0}")]
    Rejected(String),
}

/// Per-scenario failure. Never retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum ScenarioError {
    #[error("scenario {scenario}: adequacy problem is infeasible")]
    AdequacyInfeasible { scenario: usize },

    #[error("scenario {scenario}: solver error: {message}")]
    SolverError { scenario: usize, message: String },
}

impl ScenarioError {
    pub fn scenario(&self) -> usize {
        match self {
            ScenarioError::AdequacyInfeasible { scenario }
            | ScenarioError::SolverError { scenario, .. } => *scenario,
        }
    }
}

/// Failed scenarios of a study, in scenario order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioFailures(pub Vec<ScenarioError>);

impl fmt::Display for ScenarioFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indices: Vec<String> = self.0.iter().map(|e| e.scenario().to_string()).collect();
        write!(f, "{} scenario(s) failed [{}]", self.0.len(), indices.join(", "))?;
        for failure in &self.0 {
            write!(f, "; {}", failure)?;
        }
        Ok(())
    }
}

/// Study-level outcome of a failed solve.
#[derive(Debug, thiserror::Error)]
pub enum AdequacyError {
    #[error("invalid study: {0}")]
    Model(#[from] ModelError),

    #[error("solver setup failed: {0}")]
    Solver(#[from] LpError),

    #[error("{0}")]
    ScenariosFailed(ScenarioFailures),

    #[error("worker pool: {0}")]
    WorkerPool(String),

    #[error("remote optimizer: {0}")]
    Remote(String),
}

impl AdequacyError {
    /// Failed scenarios, empty unless this is [`AdequacyError::ScenariosFailed`].
    pub fn failures(&self) -> &[ScenarioError] {
        match self {
            AdequacyError::ScenariosFailed(failures) => &failures.0,
            _ => &[],
        }
    }
}
