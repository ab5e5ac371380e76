//! Per node, per time step balance ("Kirchhoff") equations.
//!
//! ```text
//! Σ consumption + Σ export + Σ storage in + Σ converter input
//!     = Σ production + Σ import + Σ storage out + Σ converter output + Σ lost of load
//! ```
//!
//! Rows are created while nodes are registered. Coefficients that land in a
//! row owned by another node (link imports, converter edges) are recorded and
//! applied by [`AdequacyBuilder::build`], once every row exists.

use crate::domain::{Constraint, LinearProblem, ModelError, RowId, VarId};
use crate::optimizer::binder::{BoundConverter, BoundNode};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BalanceKey {
    t: usize,
    network: String,
    node: String,
}

impl BalanceKey {
    fn new(t: usize, network: &str, node: &str) -> Self {
        Self {
            t,
            network: network.to_string(),
            node: node.to_string(),
        }
    }
}

#[derive(Debug)]
struct Deferred {
    key: BalanceKey,
    var: VarId,
    coefficient: f64,
}

#[derive(Debug, Default)]
pub struct AdequacyBuilder {
    constraints: HashMap<BalanceKey, RowId>,
    importations: Vec<Deferred>,
}

impl AdequacyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the balance row of `node` at `t` and fill its local terms.
    pub fn add_node(&mut self, problem: &mut LinearProblem, node: &BoundNode, t: usize) -> RowId {
        // Forced consumption is the right hand side; loss of load acts as a
        // phantom production so the row always has a feasible point.
        let load: f64 = node.consumptions.iter().map(|c| c.quantity).sum();
        let mut row = Constraint::equal(load).with_name(format!(
            "balance {}/{} at t={}",
            node.network, node.name, t
        ));

        for cons in &node.consumptions {
            row.set_coefficient(cons.lost_of_load, 1.0);
        }
        for prod in &node.productions {
            row.set_coefficient(prod.variable, 1.0);
        }
        for storage in &node.storages {
            row.set_coefficient(storage.flow_in, -1.0);
            row.set_coefficient(storage.flow_out, 1.0);
        }
        for link in &node.links {
            // Export and import of a self-link cancel out.
            if link.dest == node.name {
                continue;
            }
            row.set_coefficient(link.variable, -1.0);
            self.importations.push(Deferred {
                key: BalanceKey::new(t, &node.network, &link.dest),
                var: link.variable,
                coefficient: 1.0,
            });
        }

        let id = problem.add_constraint(row);
        self.constraints
            .insert(BalanceKey::new(t, &node.network, &node.name), id);
        tracing::debug!(network = %node.network, node = %node.name, t, load, "balance row registered");
        id
    }

    /// Converter inputs leave their source nodes, the output enters its
    /// destination node.
    pub fn add_converter(&mut self, converter: &BoundConverter, t: usize) {
        for src in &converter.sources {
            self.importations.push(Deferred {
                key: BalanceKey::new(t, &src.network, &src.node),
                var: src.variable,
                coefficient: -1.0,
            });
        }
        self.importations.push(Deferred {
            key: BalanceKey::new(t, &converter.dest_network, &converter.dest_node),
            var: converter.dest,
            coefficient: 1.0,
        });
    }

    pub fn num_rows(&self) -> usize {
        self.constraints.len()
    }

    /// Apply every deferred cross-node coefficient. Consumes the builder, so
    /// it runs exactly once and only after all nodes were registered.
    pub fn build(self, problem: &mut LinearProblem) -> Result<usize, ModelError> {
        let applied = self.importations.len();
        for deferred in self.importations {
            let row = self.constraints.get(&deferred.key).ok_or_else(|| ModelError::UnknownNode {
                context: format!("balance at t={}", deferred.key.t),
                network: deferred.key.network.clone(),
                node: deferred.key.node.clone(),
            })?;
            problem.set_coefficient(*row, deferred.var, deferred.coefficient);
        }
        tracing::debug!(rows = self.constraints.len(), applied, "balance rows finalized");
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Consumption, Converter, Link, Network, Node, Production, Storage, Study};
    use crate::optimizer::binder::InputMapper;

    fn bind_all(study: &Study, problem: &mut LinearProblem) -> Vec<BoundNode> {
        let mapper = InputMapper::new(study, 0);
        let mut nodes = Vec::new();
        for (net, network) in &study.networks {
            for (name, node) in &network.nodes {
                nodes.push(mapper.get_node(problem, net, name, node, 0).unwrap());
            }
        }
        nodes
    }

    #[test]
    fn link_import_is_applied_on_destination_row() {
        // "a" exports to "b", which is registered later than its exporter
        // would need it.
        let study = Study::new(1, 1);
        let a = Node::new()
            .with_production(Production::new("nuclear", 10.0, study.constant(30.0)))
            .with_link(Link::new("b", 2.0, study.constant(10.0)));
        let b = Node::new().with_consumption(Consumption::new("load", 1e6, study.constant(20.0)));
        let study = study.with_network("n", Network::new().with_node("a", a).with_node("b", b));

        let mut problem = LinearProblem::new("balance");
        let nodes = bind_all(&study, &mut problem);
        let mut builder = AdequacyBuilder::new();
        let rows: Vec<RowId> = nodes.iter().map(|n| builder.add_node(&mut problem, n, 0)).collect();

        let link = nodes[0].links[0].variable;
        assert_eq!(problem.constraint(rows[0]).coefficient(link), Some(-1.0));
        assert_eq!(problem.constraint(rows[1]).coefficient(link), None);

        assert_eq!(builder.build(&mut problem), Ok(1));
        assert_eq!(problem.constraint(rows[1]).coefficient(link), Some(1.0));
        assert_eq!(problem.constraint(rows[1]).bound, 20.0);
        assert_eq!(
            problem.constraint(rows[1]).coefficient(nodes[1].consumptions[0].lost_of_load),
            Some(1.0)
        );
    }

    #[test]
    fn storage_flows_enter_balance_with_opposite_signs() {
        let study = Study::new(1, 1);
        let a = Node::new().with_storage(Storage::new("cell", 10.0, 5.0, 5.0));
        let study = study.with_network("n", Network::new().with_node("a", a));

        let mut problem = LinearProblem::new("balance");
        let nodes = bind_all(&study, &mut problem);
        let mut builder = AdequacyBuilder::new();
        let row = builder.add_node(&mut problem, &nodes[0], 0);
        builder.build(&mut problem).unwrap();

        let storage = &nodes[0].storages[0];
        assert_eq!(problem.constraint(row).coefficient(storage.flow_in), Some(-1.0));
        assert_eq!(problem.constraint(row).coefficient(storage.flow_out), Some(1.0));
        assert_eq!(problem.constraint(row).coefficient(storage.capacity), None);
    }

    #[test]
    fn converter_edges_patch_source_and_destination_rows() {
        let study = Study::new(1, 1);
        let study = study
            .clone()
            .with_network("elec", Network::new().with_node("a", Node::new()))
            .with_network("gas", Network::new().with_node("b", Node::new()))
            .with_converter(
                "conv",
                Converter::new("elec", "a", 0.0, study.constant(50.0)).with_source("gas", "b", 0.8),
            );

        let mut problem = LinearProblem::new("balance");
        let nodes = bind_all(&study, &mut problem);
        let mut builder = AdequacyBuilder::new();
        let rows: Vec<RowId> = nodes.iter().map(|n| builder.add_node(&mut problem, n, 0)).collect();
        let conv = InputMapper::new(&study, 0)
            .get_converter(&mut problem, "conv", &study.converters["conv"], 0)
            .unwrap();
        builder.add_converter(&conv, 0);
        builder.build(&mut problem).unwrap();

        // BTreeMap order: "elec" before "gas".
        assert_eq!(problem.constraint(rows[0]).coefficient(conv.dest), Some(1.0));
        assert_eq!(problem.constraint(rows[1]).coefficient(conv.sources[0].variable), Some(-1.0));
    }

    #[test]
    fn self_link_adds_nothing_to_its_row() {
        let study = Study::new(1, 1);
        let a = Node::new().with_link(Link::new("a", 1.0, study.constant(10.0)));
        let study = study.with_network("n", Network::new().with_node("a", a));

        let mut problem = LinearProblem::new("balance");
        let nodes = bind_all(&study, &mut problem);
        let mut builder = AdequacyBuilder::new();
        let row = builder.add_node(&mut problem, &nodes[0], 0);

        assert_eq!(builder.build(&mut problem), Ok(0));
        assert_eq!(problem.constraint(row).coefficient(nodes[0].links[0].variable), None);
    }

    #[test]
    fn missing_destination_row_is_reported() {
        let study = Study::new(1, 1);
        let a = Node::new().with_link(Link::new("b", 0.0, study.constant(1.0)));
        let study = study.with_network("n", Network::new().with_node("a", a).with_node("b", Node::new()));

        let mut problem = LinearProblem::new("balance");
        let nodes = bind_all(&study, &mut problem);
        let mut builder = AdequacyBuilder::new();
        builder.add_node(&mut problem, &nodes[0], 0);

        assert!(matches!(
            builder.build(&mut problem),
            Err(ModelError::UnknownNode { .. })
        ));
    }
}
