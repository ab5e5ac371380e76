//! Turns per-scenario variable values into a [`StudyResult`] shaped like the
//! input study.

use crate::domain::{
    Benchmark, ModelError, OutputConsumption, OutputConverter, OutputConverterSource,
    OutputLink, OutputNetwork, OutputNode, OutputProduction, OutputStorage, Study, StudyResult,
    TimeSeries,
};
use crate::optimizer::scenario::{EntityKey, EntityKind, ScenarioSolution};

pub struct OutputMapper<'a> {
    study: &'a Study,
    result: StudyResult,
}

impl<'a> OutputMapper<'a> {
    /// Start from a zero-filled result with the study's exact structure.
    pub fn new(study: &'a Study) -> Self {
        let zeros = || TimeSeries::zeros(study.nb_scn, study.horizon);

        let networks = study
            .networks
            .iter()
            .map(|(net_name, network)| {
                let nodes = network
                    .nodes
                    .iter()
                    .map(|(node_name, node)| {
                        let out = OutputNode {
                            consumptions: node
                                .consumptions
                                .iter()
                                .map(|c| OutputConsumption {
                                    name: c.name.clone(),
                                    cost: c.cost,
                                    quantity: zeros(),
                                })
                                .collect(),
                            productions: node
                                .productions
                                .iter()
                                .map(|p| OutputProduction {
                                    name: p.name.clone(),
                                    cost: p.cost,
                                    quantity: zeros(),
                                })
                                .collect(),
                            storages: node
                                .storages
                                .iter()
                                .map(|s| OutputStorage {
                                    name: s.name.clone(),
                                    capacity: zeros(),
                                    flow_in: zeros(),
                                    flow_out: zeros(),
                                })
                                .collect(),
                            links: node
                                .links
                                .iter()
                                .map(|l| OutputLink {
                                    dest: l.dest.clone(),
                                    cost: l.cost,
                                    quantity: zeros(),
                                })
                                .collect(),
                        };
                        (node_name.clone(), out)
                    })
                    .collect();
                (net_name.clone(), OutputNetwork { nodes })
            })
            .collect();

        let converters = study
            .converters
            .iter()
            .map(|(name, conv)| {
                let out = OutputConverter {
                    name: name.clone(),
                    flow_src: conv
                        .sources
                        .iter()
                        .map(|s| OutputConverterSource {
                            network: s.network.clone(),
                            node: s.node.clone(),
                            quantity: zeros(),
                        })
                        .collect(),
                    flow_dest: zeros(),
                };
                (name.clone(), out)
            })
            .collect();

        Self {
            study,
            result: StudyResult {
                horizon: study.horizon,
                nb_scn: study.nb_scn,
                networks,
                converters,
                objective: vec![0.0; study.nb_scn],
                benchmark: Benchmark {
                    modeler_ms: vec![0.0; study.nb_scn],
                    solver_ms: vec![0.0; study.nb_scn],
                    mapper_ms: 0.0,
                },
            },
        }
    }

    /// Write one scenario's row into every output series.
    pub fn set_scenario(&mut self, solution: &ScenarioSolution) -> Result<(), ModelError> {
        let scn = solution.scenario;
        let horizon = self.study.horizon;
        let fill = |series: &mut TimeSeries, key: EntityKey| {
            if let Some(values) = solution.values.get(&key) {
                for (t, v) in values.iter().enumerate().take(horizon) {
                    series.set(scn, t, *v);
                }
            }
        };

        for (net_name, network) in &self.study.networks {
            for (node_name, node) in &network.nodes {
                let Some(out) = self
                    .result
                    .networks
                    .get_mut(net_name)
                    .and_then(|n| n.nodes.get_mut(node_name))
                else {
                    continue;
                };
                let key = |kind, name: &str| EntityKey::new(kind, net_name, node_name, name);

                // Served quantity is what remains of the forced load once
                // the lost of load is removed.
                for (cons, out_cons) in node.consumptions.iter().zip(&mut out.consumptions) {
                    let lol = key(EntityKind::Consumption, &cons.name);
                    for t in 0..horizon {
                        let forced = cons.quantity.at(scn, t)?;
                        let lost = solution.value(&lol, t).unwrap_or(0.0);
                        out_cons.quantity.set(scn, t, forced - lost);
                    }
                }
                for out_prod in &mut out.productions {
                    fill(&mut out_prod.quantity, key(EntityKind::Production, &out_prod.name));
                }
                for out_storage in &mut out.storages {
                    let name = out_storage.name.clone();
                    fill(&mut out_storage.capacity, key(EntityKind::StorageCapacity, &name));
                    fill(&mut out_storage.flow_in, key(EntityKind::StorageFlowIn, &name));
                    fill(&mut out_storage.flow_out, key(EntityKind::StorageFlowOut, &name));
                }
                for out_link in &mut out.links {
                    fill(&mut out_link.quantity, key(EntityKind::Link, &out_link.dest));
                }
            }
        }

        for (name, out_conv) in &mut self.result.converters {
            for src in &mut out_conv.flow_src {
                let key = EntityKey::new(EntityKind::ConverterSource, &src.network, &src.node, name);
                fill(&mut src.quantity, key);
            }
            if let Some(conv) = self.study.converters.get(name) {
                let key = EntityKey::new(
                    EntityKind::ConverterDest,
                    &conv.dest_network,
                    &conv.dest_node,
                    name,
                );
                fill(&mut out_conv.flow_dest, key);
            }
        }

        self.result.objective[scn] = solution.objective;
        self.result.benchmark.modeler_ms[scn] = solution.modeler_ms;
        self.result.benchmark.solver_ms[scn] = solution.solver_ms;
        Ok(())
    }

    pub fn into_result(mut self, mapper_ms: f64) -> StudyResult {
        self.result.benchmark.mapper_ms = mapper_ms;
        self.result
    }
}

/// Convenience wrapper: assemble every scenario at once.
pub fn assemble(study: &Study, solutions: &[ScenarioSolution]) -> Result<StudyResult, ModelError> {
    let start = std::time::Instant::now();
    let mut mapper = OutputMapper::new(study);
    for solution in solutions {
        mapper.set_scenario(solution)?;
    }
    Ok(mapper.into_result(start.elapsed().as_secs_f64() * 1000.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Consumption, Converter, Link, Network, Node, Production, Storage};
    use std::collections::BTreeMap;

    fn study() -> Study {
        let study = Study::new(2, 2);
        let a = Node::new()
            .with_consumption(Consumption::new("load", 1e6, study.constant(10.0)))
            .with_production(Production::new("nuclear", 20.0, study.constant(30.0)))
            .with_storage(Storage::new("cell", 5.0, 5.0, 5.0))
            .with_link(Link::new("b", 1.0, study.constant(10.0)));
        study
            .clone()
            .with_network("n", Network::new().with_node("a", a).with_node("b", Node::new()))
            .with_converter(
                "conv",
                Converter::new("n", "b", 1.0, study.constant(5.0)).with_source("n", "a", 2.0),
            )
    }

    fn solution(scenario: usize) -> ScenarioSolution {
        let mut values = BTreeMap::new();
        let key = |kind, node: &str, name: &str| EntityKey::new(kind, "n", node, name);
        values.insert(key(EntityKind::Consumption, "a", "load"), vec![0.0, 4.0]);
        values.insert(key(EntityKind::Production, "a", "nuclear"), vec![10.0, 6.0]);
        values.insert(key(EntityKind::StorageCapacity, "a", "cell"), vec![1.0, 2.0]);
        values.insert(key(EntityKind::Link, "a", "b"), vec![3.0, 0.0]);
        values.insert(key(EntityKind::ConverterSource, "a", "conv"), vec![2.0, 0.0]);
        values.insert(key(EntityKind::ConverterDest, "b", "conv"), vec![1.0, 0.0]);
        ScenarioSolution {
            scenario,
            objective: 100.0 + scenario as f64,
            values,
            modeler_ms: 1.0,
            solver_ms: 2.0,
        }
    }

    #[test]
    fn blank_result_mirrors_study_structure() {
        let study = study();
        let result = OutputMapper::new(&study).into_result(0.0);

        let a = result.node("n", "a").unwrap();
        assert_eq!(a.consumptions.len(), 1);
        assert_eq!(a.links[0].dest, "b");
        assert_eq!(a.production("nuclear").unwrap().quantity.shape(), (2, 2));
        assert!(result.node("n", "b").unwrap().consumptions.is_empty());
        assert_eq!(result.converters["conv"].flow_src.len(), 1);
    }

    #[test]
    fn scenario_rows_are_written_independently() {
        let study = study();
        let mut mapper = OutputMapper::new(&study);
        mapper.set_scenario(&solution(1)).unwrap();
        let result = mapper.into_result(0.5);

        let a = result.node("n", "a").unwrap();
        assert_eq!(a.consumption("load").unwrap().quantity.row(1), &[10.0, 6.0]);
        assert_eq!(a.consumption("load").unwrap().quantity.row(0), &[0.0, 0.0]);
        assert_eq!(a.production("nuclear").unwrap().quantity.row(1), &[10.0, 6.0]);
        assert_eq!(a.storage("cell").unwrap().capacity.row(1), &[1.0, 2.0]);
        assert_eq!(a.link("b").unwrap().quantity.row(1), &[3.0, 0.0]);
        assert_eq!(result.converters["conv"].source("n", "a").unwrap().row(1), &[2.0, 0.0]);
        assert_eq!(result.converters["conv"].name, "conv");
        assert_eq!(result.converters["conv"].flow_dest.row(1), &[1.0, 0.0]);
        assert_eq!(result.objective, vec![0.0, 101.0]);
        assert_eq!(result.benchmark.solver_ms, vec![0.0, 2.0]);
        assert_eq!(result.benchmark.mapper_ms, 0.5);
    }
}
