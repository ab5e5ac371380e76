//! Variable binding: one LP decision variable per entity and time step.

use crate::domain::{Converter, LinearProblem, ModelError, Node, Study, VarId, Variable};

/// Consumption with its lost-of-load variable, bounded by the forced quantity.
#[derive(Debug, Clone)]
pub struct BoundConsumption {
    pub name: String,
    pub cost: f64,
    pub quantity: f64,
    pub lost_of_load: VarId,
}

#[derive(Debug, Clone)]
pub struct BoundProduction {
    pub name: String,
    pub cost: f64,
    pub quantity: f64,
    pub variable: VarId,
}

#[derive(Debug, Clone)]
pub struct BoundLink {
    pub src: String,
    pub dest: String,
    pub cost: f64,
    pub quantity: f64,
    pub variable: VarId,
}

#[derive(Debug, Clone)]
pub struct BoundStorage {
    pub name: String,
    pub capacity_max: f64,
    pub capacity_initial: f64,
    pub cost: f64,
    pub efficiency: f64,
    pub capacity: VarId,
    pub flow_in: VarId,
    pub flow_out: VarId,
}

/// Every bound entity of one node at one time step.
#[derive(Debug, Clone)]
pub struct BoundNode {
    pub network: String,
    pub name: String,
    pub consumptions: Vec<BoundConsumption>,
    pub productions: Vec<BoundProduction>,
    pub storages: Vec<BoundStorage>,
    pub links: Vec<BoundLink>,
}

#[derive(Debug, Clone)]
pub struct BoundConverterSource {
    pub network: String,
    pub node: String,
    pub ratio: f64,
    pub variable: VarId,
}

#[derive(Debug, Clone)]
pub struct BoundConverter {
    pub name: String,
    pub cost: f64,
    pub max: f64,
    pub sources: Vec<BoundConverterSource>,
    pub dest_network: String,
    pub dest_node: String,
    pub dest: VarId,
}

/// Binds study entities of a single scenario to fresh variables of a problem.
pub struct InputMapper<'a> {
    study: &'a Study,
    scenario: usize,
}

impl<'a> InputMapper<'a> {
    pub fn new(study: &'a Study, scenario: usize) -> Self {
        Self { study, scenario }
    }

    pub fn scenario(&self) -> usize {
        self.scenario
    }

    /// Bind every entity of `network/name` at time step `t`.
    pub fn get_node(
        &self,
        problem: &mut LinearProblem,
        network: &str,
        name: &str,
        node: &Node,
        t: usize,
    ) -> Result<BoundNode, ModelError> {
        let scn = self.scenario;
        let at = format!("{}/{} at t={} for scn={}", network, name, t, scn);

        let consumptions = node
            .consumptions
            .iter()
            .map(|c| {
                let quantity = c.quantity.at(scn, t)?;
                let lost_of_load = problem.add_variable(
                    Variable::continuous(format!("lol {} on {}", c.name, at))
                        .with_bounds(0.0, Some(quantity)),
                );
                Ok(BoundConsumption {
                    name: c.name.clone(),
                    cost: c.cost,
                    quantity,
                    lost_of_load,
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        let productions = node
            .productions
            .iter()
            .map(|p| {
                let quantity = p.quantity.at(scn, t)?;
                let variable = problem.add_variable(
                    Variable::continuous(format!("prod {} on {}", p.name, at))
                        .with_bounds(0.0, Some(quantity)),
                );
                Ok(BoundProduction {
                    name: p.name.clone(),
                    cost: p.cost,
                    quantity,
                    variable,
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        let storages = node
            .storages
            .iter()
            .map(|s| BoundStorage {
                name: s.name.clone(),
                capacity_max: s.capacity_max,
                capacity_initial: s.capacity_initial,
                cost: s.cost,
                efficiency: s.efficiency,
                capacity: problem.add_variable(
                    Variable::continuous(format!("storage capacity {} on {}", s.name, at))
                        .with_bounds(0.0, Some(s.capacity_max)),
                ),
                flow_in: problem.add_variable(
                    Variable::continuous(format!("storage flow in {} on {}", s.name, at))
                        .with_bounds(0.0, Some(s.flow_in_max)),
                ),
                flow_out: problem.add_variable(
                    Variable::continuous(format!("storage flow out {} on {}", s.name, at))
                        .with_bounds(0.0, Some(s.flow_out_max)),
                ),
            })
            .collect();

        let links = node
            .links
            .iter()
            .map(|l| {
                let quantity = l.quantity.at(scn, t)?;
                let variable = problem.add_variable(
                    Variable::continuous(format!("link to {} on {}", l.dest, at))
                        .with_bounds(0.0, Some(quantity)),
                );
                Ok(BoundLink {
                    src: name.to_string(),
                    dest: l.dest.clone(),
                    cost: l.cost,
                    quantity,
                    variable,
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        Ok(BoundNode {
            network: network.to_string(),
            name: name.to_string(),
            consumptions,
            productions,
            storages,
            links,
        })
    }

    /// Bind one converter at time step `t`. Each input is capped so that it
    /// alone could not exceed the output capacity.
    pub fn get_converter(
        &self,
        problem: &mut LinearProblem,
        name: &str,
        converter: &Converter,
        t: usize,
    ) -> Result<BoundConverter, ModelError> {
        let scn = self.scenario;
        let max = converter.max.at(scn, t)?;

        let sources = converter
            .sources
            .iter()
            .map(|src| BoundConverterSource {
                network: src.network.clone(),
                node: src.node.clone(),
                ratio: src.ratio,
                variable: problem.add_variable(
                    Variable::continuous(format!(
                        "flow src {} {}/{} at t={} for scn={}",
                        name, src.network, src.node, t, scn
                    ))
                    .with_bounds(0.0, Some(max / src.ratio)),
                ),
            })
            .collect();

        let dest = problem.add_variable(
            Variable::continuous(format!("flow dest {} at t={} for scn={}", name, t, scn))
                .with_bounds(0.0, Some(max)),
        );

        Ok(BoundConverter {
            name: name.to_string(),
            cost: converter.cost,
            max,
            sources,
            dest_network: converter.dest_network.clone(),
            dest_node: converter.dest_node.clone(),
            dest,
        })
    }
}
