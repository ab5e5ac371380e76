use crate::domain::{LinearProblem, VarId};
use crate::optimizer::binder::{BoundConverter, BoundNode};

/// Accumulates `variable * cost` for every costed entity of a scenario.
#[derive(Debug, Default)]
pub struct ObjectiveBuilder {
    terms: Vec<(VarId, f64)>,
}

impl ObjectiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: &BoundNode) {
        // Loss of load is paid at the consumption's unavailability cost.
        for cons in &node.consumptions {
            self.terms.push((cons.lost_of_load, cons.cost));
        }
        for prod in &node.productions {
            self.terms.push((prod.variable, prod.cost));
        }
        for storage in &node.storages {
            self.terms.push((storage.capacity, storage.cost));
        }
        for link in &node.links {
            self.terms.push((link.variable, link.cost));
        }
        tracing::trace!(network = %node.network, node = %node.name, terms = self.terms.len(), "objective terms added");
    }

    pub fn add_converter(&mut self, converter: &BoundConverter) {
        self.terms.push((converter.dest, converter.cost));
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Write the accumulated costs into the problem objective.
    pub fn build(self, problem: &mut LinearProblem) {
        for (var, cost) in self.terms {
            problem.set_objective_coefficient(var, cost);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Consumption, Link, Network, Node, Production, Storage, Study};
    use crate::optimizer::binder::InputMapper;

    #[test]
    fn every_costed_entity_reaches_the_objective() {
        let study = Study::new(1, 1);
        let a = Node::new()
            .with_consumption(Consumption::new("load", 1000.0, study.constant(5.0)))
            .with_production(Production::new("gas", 30.0, study.constant(5.0)))
            .with_storage(Storage::new("cell", 10.0, 1.0, 1.0).with_cost(0.5))
            .with_link(Link::new("b", 2.0, study.constant(5.0)));
        let study = study.with_network("n", Network::new().with_node("a", a).with_node("b", Node::new()));

        let mut problem = crate::domain::LinearProblem::new("objective");
        let node = InputMapper::new(&study, 0)
            .get_node(&mut problem, "n", "a", study.node("n", "a").unwrap(), 0)
            .unwrap();

        let mut objective = ObjectiveBuilder::new();
        objective.add_node(&node);
        assert_eq!(objective.len(), 4);
        objective.build(&mut problem);

        assert_eq!(problem.objective[node.consumptions[0].lost_of_load.index()], 1000.0);
        assert_eq!(problem.objective[node.productions[0].variable.index()], 30.0);
        assert_eq!(problem.objective[node.storages[0].capacity.index()], 0.5);
        assert_eq!(problem.objective[node.storages[0].flow_in.index()], 0.0);
        assert_eq!(problem.objective[node.links[0].variable.index()], 2.0);
    }
}
