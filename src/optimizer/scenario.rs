//! One scenario, one LP: build it, solve it, extract numbers.
//!
//! ```text
//! UNSOLVED --build()--> BUILT --solve()--> SOLVED | INFEASIBLE | ERROR
//! ```
//! A failed scenario is never retried.

use crate::domain::{
    LinearProblem, ModelError, ScenarioError, SolutionStatus, SolverService, Study, VarId,
};
use crate::optimizer::binder::{BoundConverter, BoundNode, InputMapper};
use crate::optimizer::builders::{
    AdequacyBuilder, ConverterMixBuilder, ObjectiveBuilder, StorageBuilder,
};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Unsolved,
    Built,
    Solved,
    Infeasible,
    Error,
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioState::Unsolved => "UNSOLVED",
            ScenarioState::Built => "BUILT",
            ScenarioState::Solved => "SOLVED",
            ScenarioState::Infeasible => "INFEASIBLE",
            ScenarioState::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Which decision variable of an entity a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    /// Lost of load of a consumption.
    Consumption,
    Production,
    Link,
    StorageCapacity,
    StorageFlowIn,
    StorageFlowOut,
    /// `node` is the source network/node, `name` the converter.
    ConverterSource,
    ConverterDest,
}

/// Addresses one entity variable family across time steps. Consumption,
/// production and storage entries are keyed by entity name, links by
/// destination node, converters by converter name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub network: String,
    pub node: String,
    pub name: String,
}

impl EntityKey {
    pub fn new(kind: EntityKind, network: &str, node: &str, name: &str) -> Self {
        Self {
            kind,
            network: network.to_string(),
            node: node.to_string(),
            name: name.to_string(),
        }
    }
}

/// Numeric outcome of a solved scenario. Holds no solver state.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSolution {
    pub scenario: usize,
    pub objective: f64,
    pub values: BTreeMap<EntityKey, Vec<f64>>,
    pub modeler_ms: f64,
    pub solver_ms: f64,
}

impl ScenarioSolution {
    pub fn value(&self, key: &EntityKey, t: usize) -> Option<f64> {
        self.values.get(key).and_then(|v| v.get(t)).copied()
    }
}

/// A fully built scenario problem, with the variable of every entity and
/// time step.
#[derive(Debug)]
pub struct BuiltScenario {
    pub scenario: usize,
    pub horizon: usize,
    pub problem: LinearProblem,
    bindings: Vec<(EntityKey, usize, VarId)>,
    pub modeler_ms: f64,
}

pub struct ScenarioSolver<'a> {
    study: &'a Study,
    scenario: usize,
}

impl<'a> ScenarioSolver<'a> {
    pub fn new(study: &'a Study, scenario: usize) -> Self {
        Self { study, scenario }
    }

    pub fn state(&self) -> ScenarioState {
        ScenarioState::Unsolved
    }

    /// Bind every entity at every time step and feed all four builders.
    pub fn build(self) -> Result<BuiltScenario, ModelError> {
        let start = Instant::now();
        let study = self.study;
        let mapper = InputMapper::new(study, self.scenario);
        let mut problem = LinearProblem::new(format!("adequacy scn={}", self.scenario));
        let mut bindings = Vec::new();

        let mut objective = ObjectiveBuilder::new();
        let mut balance = AdequacyBuilder::new();
        let mut storage = StorageBuilder::new();
        let mut mix = ConverterMixBuilder::new();

        for t in 0..study.horizon {
            for (network, net) in &study.networks {
                for (name, node) in &net.nodes {
                    let bound = mapper.get_node(&mut problem, network, name, node, t)?;
                    record_node(&mut bindings, &bound, t);
                    objective.add_node(&bound);
                    balance.add_node(&mut problem, &bound, t);
                    storage.add_node(&mut problem, &bound, t);
                }
            }
            for (name, converter) in &study.converters {
                let bound = mapper.get_converter(&mut problem, name, converter, t)?;
                record_converter(&mut bindings, &bound, t);
                objective.add_converter(&bound);
                balance.add_converter(&bound, t);
                mix.add_converter(&mut problem, &bound, t);
            }
        }

        objective.build(&mut problem);
        balance.build(&mut problem)?;

        let modeler_ms = start.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(
            scenario = self.scenario,
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            modeler_ms,
            "scenario {} -> {}",
            ScenarioState::Unsolved,
            ScenarioState::Built
        );
        tracing::trace!(scenario = self.scenario, "\n{}", problem);

        Ok(BuiltScenario {
            scenario: self.scenario,
            horizon: study.horizon,
            problem,
            bindings,
            modeler_ms,
        })
    }
}

fn record_node(bindings: &mut Vec<(EntityKey, usize, VarId)>, node: &BoundNode, t: usize) {
    let key = |kind, name: &str| EntityKey::new(kind, &node.network, &node.name, name);
    for cons in &node.consumptions {
        bindings.push((key(EntityKind::Consumption, &cons.name), t, cons.lost_of_load));
    }
    for prod in &node.productions {
        bindings.push((key(EntityKind::Production, &prod.name), t, prod.variable));
    }
    for s in &node.storages {
        bindings.push((key(EntityKind::StorageCapacity, &s.name), t, s.capacity));
        bindings.push((key(EntityKind::StorageFlowIn, &s.name), t, s.flow_in));
        bindings.push((key(EntityKind::StorageFlowOut, &s.name), t, s.flow_out));
    }
    for link in &node.links {
        bindings.push((key(EntityKind::Link, &link.dest), t, link.variable));
    }
}

fn record_converter(bindings: &mut Vec<(EntityKey, usize, VarId)>, conv: &BoundConverter, t: usize) {
    for src in &conv.sources {
        bindings.push((
            EntityKey::new(EntityKind::ConverterSource, &src.network, &src.node, &conv.name),
            t,
            src.variable,
        ));
    }
    bindings.push((
        EntityKey::new(EntityKind::ConverterDest, &conv.dest_network, &conv.dest_node, &conv.name),
        t,
        conv.dest,
    ));
}

impl BuiltScenario {
    pub fn state(&self) -> ScenarioState {
        ScenarioState::Built
    }

    /// Solve and copy every bound value out. The problem is dropped with
    /// `self`, whatever the outcome.
    pub fn solve(self, solver: &dyn SolverService) -> Result<ScenarioSolution, ScenarioError> {
        let scenario = self.scenario;
        let start = Instant::now();
        let solution = solver
            .solve(&self.problem)
            .map_err(|e| fail(scenario, e.to_string()))?;
        let solver_ms = start.elapsed().as_secs_f64() * 1000.0;

        match solution.status {
            SolutionStatus::Optimal => {}
            SolutionStatus::Infeasible => {
                tracing::debug!(scenario, "scenario {} -> {}", ScenarioState::Built, ScenarioState::Infeasible);
                return Err(ScenarioError::AdequacyInfeasible { scenario });
            }
            status => return Err(fail(scenario, format!("{}: {}", status, solution.message))),
        }

        let expected = self.problem.num_variables();
        if solution.variable_values.len() != expected {
            return Err(fail(
                scenario,
                format!(
                    "{} returned {} values for {} variables",
                    solver.name(),
                    solution.variable_values.len(),
                    expected
                ),
            ));
        }

        let mut values: BTreeMap<EntityKey, Vec<f64>> = BTreeMap::new();
        for (key, t, var) in self.bindings {
            values.entry(key).or_insert_with(|| vec![0.0; self.horizon])[t] = solution.value(var);
        }

        let objective = solution
            .optimal_value
            .unwrap_or_else(|| self.problem.evaluate(&solution.variable_values));
        tracing::debug!(
            scenario,
            objective,
            solver_ms,
            "scenario {} -> {}",
            ScenarioState::Built,
            ScenarioState::Solved
        );

        Ok(ScenarioSolution {
            scenario,
            objective,
            values,
            modeler_ms: self.modeler_ms,
            solver_ms,
        })
    }
}

fn fail(scenario: usize, message: String) -> ScenarioError {
    tracing::debug!(scenario, %message, "scenario {} -> {}", ScenarioState::Built, ScenarioState::Error);
    ScenarioError::SolverError { scenario, message }
}
