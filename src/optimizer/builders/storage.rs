//! Storage continuity, the only constraint coupling consecutive time steps.
//!
//! ```text
//! capacity[t] = capacity[t-1] + flow_in[t] * efficiency - flow_out[t]
//! ```
//! with `capacity[-1] = capacity_initial`.

use crate::domain::{Constraint, LinearProblem, VarId};
use crate::optimizer::binder::BoundNode;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StorageKey {
    network: String,
    node: String,
    name: String,
}

#[derive(Debug, Default)]
pub struct StorageBuilder {
    previous: HashMap<StorageKey, VarId>,
}

impl StorageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the continuity rows of every storage on `node`. Nodes must be fed
    /// in increasing `t`.
    pub fn add_node(&mut self, problem: &mut LinearProblem, node: &BoundNode, t: usize) {
        for storage in &node.storages {
            let key = StorageKey {
                network: node.network.clone(),
                node: node.name.clone(),
                name: storage.name.clone(),
            };

            let mut row = Constraint::equal(0.0)
                .with_name(format!(
                    "storage {} on {}/{} at t={}",
                    storage.name, node.network, node.name, t
                ))
                .with_term(storage.capacity, 1.0)
                .with_term(storage.flow_in, -storage.efficiency)
                .with_term(storage.flow_out, 1.0);

            match self.previous.insert(key, storage.capacity) {
                Some(previous) => row.set_coefficient(previous, -1.0),
                None => {
                    debug_assert_eq!(t, 0, "storage first seen after t=0");
                    row.bound = storage.capacity_initial;
                }
            }

            problem.add_constraint(row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Network, Node, Storage, Study};
    use crate::optimizer::binder::InputMapper;

    #[test]
    fn initial_capacity_is_only_used_at_first_step() {
        let study = Study::new(3, 1).with_network(
            "n",
            Network::new().with_node(
                "a",
                Node::new().with_storage(
                    Storage::new("cell", 30.0, 20.0, 20.0)
                        .with_initial(15.0)
                        .with_efficiency(0.5),
                ),
            ),
        );
        let node = study.node("n", "a").unwrap();
        let mapper = InputMapper::new(&study, 0);
        let mut problem = LinearProblem::new("storage");
        let mut builder = StorageBuilder::new();

        let mut bound = Vec::new();
        for t in 0..3 {
            let b = mapper.get_node(&mut problem, "n", "a", node, t).unwrap();
            builder.add_node(&mut problem, &b, t);
            bound.push(b);
        }

        assert_eq!(problem.num_constraints(), 3);
        let first = &problem.constraints[0];
        assert_eq!(first.bound, 15.0);
        assert_eq!(first.num_terms(), 3);
        assert_eq!(first.coefficient(bound[0].storages[0].flow_in), Some(-0.5));

        for t in 1..3 {
            let row = &problem.constraints[t];
            assert_eq!(row.bound, 0.0);
            assert_eq!(row.coefficient(bound[t].storages[0].capacity), Some(1.0));
            assert_eq!(row.coefficient(bound[t - 1].storages[0].capacity), Some(-1.0));
            assert_eq!(row.coefficient(bound[t].storages[0].flow_out), Some(1.0));
        }
    }
}
