// Mappers: Convert between gRPC protobuf types and domain models
// This keeps protobuf dependencies isolated from the engine

use crate::domain::{
    Benchmark, Consumption, Converter, ConverterSource, Link, Network, Node, OutputConsumption,
    OutputConverter, OutputConverterSource, OutputLink, OutputNetwork, OutputNode,
    OutputProduction, OutputStorage, Production, ScenarioError, Storage, Study, StudyResult,
    TimeSeries,
};
use std::collections::BTreeMap;
use tonic::Status;

pub mod adequacy {
    tonic::include_proto!("adequacy");
}

use adequacy as proto;

type MapResult<T> = std::result::Result<T, Box<Status>>;

fn invalid(message: impl Into<String>) -> Box<Status> {
    Box::new(Status::invalid_argument(message.into()))
}

// ------------------------------------------------------------------ series

pub fn domain_to_proto_series(series: &TimeSeries) -> proto::Series {
    proto::Series {
        nb_scn: series.nb_scn() as u32,
        horizon: series.horizon() as u32,
        values: series.values().to_vec(),
    }
}

/// Convert protobuf Series to domain TimeSeries. `field` names the owner for
/// error messages.
pub fn proto_to_domain_series(series: Option<proto::Series>, field: &str) -> MapResult<TimeSeries> {
    let series = series.ok_or_else(|| invalid(format!("{}: missing series", field)))?;
    TimeSeries::from_flat(series.nb_scn as usize, series.horizon as usize, series.values)
        .map_err(|e| invalid(format!("{}: {}", field, e)))
}

// ------------------------------------------------------------------- study

pub fn domain_to_proto_study(study: &Study) -> proto::Study {
    let networks = study
        .networks
        .iter()
        .map(|(name, network)| proto::Network {
            name: name.clone(),
            nodes: network
                .nodes
                .iter()
                .map(|(node_name, node)| domain_to_proto_node(node_name, node))
                .collect(),
        })
        .collect();

    let converters = study
        .converters
        .iter()
        .map(|(name, conv)| proto::Converter {
            name: name.clone(),
            sources: conv
                .sources
                .iter()
                .map(|s| proto::ConverterSource {
                    network: s.network.clone(),
                    node: s.node.clone(),
                    ratio: s.ratio,
                })
                .collect(),
            dest_network: conv.dest_network.clone(),
            dest_node: conv.dest_node.clone(),
            cost: conv.cost,
            max: Some(domain_to_proto_series(&conv.max)),
        })
        .collect();

    proto::Study {
        horizon: study.horizon as u32,
        nb_scn: study.nb_scn as u32,
        networks,
        converters,
    }
}

fn domain_to_proto_node(name: &str, node: &Node) -> proto::Node {
    proto::Node {
        name: name.to_string(),
        consumptions: node
            .consumptions
            .iter()
            .map(|c| proto::Consumption {
                name: c.name.clone(),
                cost: c.cost,
                quantity: Some(domain_to_proto_series(&c.quantity)),
            })
            .collect(),
        productions: node
            .productions
            .iter()
            .map(|p| proto::Production {
                name: p.name.clone(),
                cost: p.cost,
                quantity: Some(domain_to_proto_series(&p.quantity)),
            })
            .collect(),
        storages: node
            .storages
            .iter()
            .map(|s| proto::Storage {
                name: s.name.clone(),
                capacity_max: s.capacity_max,
                capacity_initial: s.capacity_initial,
                flow_in_max: s.flow_in_max,
                flow_out_max: s.flow_out_max,
                cost: s.cost,
                efficiency: s.efficiency,
            })
            .collect(),
        links: node
            .links
            .iter()
            .map(|l| proto::Link {
                dest: l.dest.clone(),
                cost: l.cost,
                quantity: Some(domain_to_proto_series(&l.quantity)),
            })
            .collect(),
    }
}

/// Convert protobuf Study to domain Study. Structural duplicates that a map
/// cannot hold are rejected here; everything else is left to
/// [`Study::validate`].
pub fn proto_to_domain_study(proto_study: proto::Study) -> MapResult<Study> {
    let mut study = Study::new(proto_study.horizon as usize, proto_study.nb_scn as usize);

    for network in proto_study.networks {
        let mut nodes = BTreeMap::new();
        for node in network.nodes {
            let scope = format!("{}/{}", network.name, node.name);
            let name = node.name.clone();
            let domain = proto_to_domain_node(node, &scope)?;
            if nodes.insert(name, domain).is_some() {
                return Err(invalid(format!("duplicate node {}", scope)));
            }
        }
        if study.networks.insert(network.name.clone(), Network { nodes }).is_some() {
            return Err(invalid(format!("duplicate network {}", network.name)));
        }
    }

    for conv in proto_study.converters {
        let field = format!("converter {}", conv.name);
        let converter = Converter {
            sources: conv
                .sources
                .into_iter()
                .map(|s| ConverterSource {
                    network: s.network,
                    node: s.node,
                    ratio: s.ratio,
                })
                .collect(),
            dest_network: conv.dest_network,
            dest_node: conv.dest_node,
            cost: conv.cost,
            max: proto_to_domain_series(conv.max, &field)?,
        };
        if study.converters.insert(conv.name, converter).is_some() {
            return Err(invalid(format!("duplicate {}", field)));
        }
    }

    Ok(study)
}

fn proto_to_domain_node(node: proto::Node, scope: &str) -> MapResult<Node> {
    let consumptions = node
        .consumptions
        .into_iter()
        .map(|c| {
            let field = format!("consumption {} on {}", c.name, scope);
            Ok(Consumption {
                quantity: proto_to_domain_series(c.quantity, &field)?,
                name: c.name,
                cost: c.cost,
            })
        })
        .collect::<MapResult<Vec<_>>>()?;

    let productions = node
        .productions
        .into_iter()
        .map(|p| {
            let field = format!("production {} on {}", p.name, scope);
            Ok(Production {
                quantity: proto_to_domain_series(p.quantity, &field)?,
                name: p.name,
                cost: p.cost,
            })
        })
        .collect::<MapResult<Vec<_>>>()?;

    let storages = node
        .storages
        .into_iter()
        .map(|s| Storage {
            name: s.name,
            capacity_max: s.capacity_max,
            capacity_initial: s.capacity_initial,
            flow_in_max: s.flow_in_max,
            flow_out_max: s.flow_out_max,
            cost: s.cost,
            efficiency: s.efficiency,
        })
        .collect();

    let links = node
        .links
        .into_iter()
        .map(|l| {
            let field = format!("link {} -> {}", scope, l.dest);
            Ok(Link {
                quantity: proto_to_domain_series(l.quantity, &field)?,
                dest: l.dest,
                cost: l.cost,
            })
        })
        .collect::<MapResult<Vec<_>>>()?;

    Ok(Node {
        consumptions,
        productions,
        storages,
        links,
    })
}

// ------------------------------------------------------------------ result

pub fn domain_to_proto_result(result: &StudyResult) -> proto::StudyResult {
    let series = |s: &TimeSeries| Some(domain_to_proto_series(s));

    let networks = result
        .networks
        .iter()
        .map(|(name, network)| proto::OutputNetwork {
            name: name.clone(),
            nodes: network
                .nodes
                .iter()
                .map(|(node_name, node)| proto::OutputNode {
                    name: node_name.clone(),
                    consumptions: node
                        .consumptions
                        .iter()
                        .map(|c| proto::OutputConsumption {
                            name: c.name.clone(),
                            cost: c.cost,
                            quantity: series(&c.quantity),
                        })
                        .collect(),
                    productions: node
                        .productions
                        .iter()
                        .map(|p| proto::OutputProduction {
                            name: p.name.clone(),
                            cost: p.cost,
                            quantity: series(&p.quantity),
                        })
                        .collect(),
                    storages: node
                        .storages
                        .iter()
                        .map(|s| proto::OutputStorage {
                            name: s.name.clone(),
                            capacity: series(&s.capacity),
                            flow_in: series(&s.flow_in),
                            flow_out: series(&s.flow_out),
                        })
                        .collect(),
                    links: node
                        .links
                        .iter()
                        .map(|l| proto::OutputLink {
                            dest: l.dest.clone(),
                            cost: l.cost,
                            quantity: series(&l.quantity),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    let converters = result
        .converters
        .iter()
        .map(|(name, conv)| proto::OutputConverter {
            name: name.clone(),
            flow_src: conv
                .flow_src
                .iter()
                .map(|s| proto::OutputConverterSource {
                    network: s.network.clone(),
                    node: s.node.clone(),
                    quantity: series(&s.quantity),
                })
                .collect(),
            flow_dest: series(&conv.flow_dest),
        })
        .collect();

    proto::StudyResult {
        horizon: result.horizon as u32,
        nb_scn: result.nb_scn as u32,
        networks,
        converters,
        objective: result.objective.clone(),
        benchmark: Some(proto::Benchmark {
            modeler_ms: result.benchmark.modeler_ms.clone(),
            solver_ms: result.benchmark.solver_ms.clone(),
            mapper_ms: result.benchmark.mapper_ms,
        }),
    }
}

/// Convert protobuf StudyResult to domain StudyResult. Every series must be
/// present and shaped `(nb_scn, horizon)`.
pub fn proto_to_domain_result(proto_result: proto::StudyResult) -> MapResult<StudyResult> {
    let nb_scn = proto_result.nb_scn as usize;
    let horizon = proto_result.horizon as usize;
    let series = |s: Option<proto::Series>, field: String| -> MapResult<TimeSeries> {
        let series = proto_to_domain_series(s, &field)?;
        if series.shape() != (nb_scn, horizon) {
            return Err(invalid(format!(
                "{}: expected shape {:?}, found {:?}",
                field,
                (nb_scn, horizon),
                series.shape()
            )));
        }
        Ok(series)
    };

    let mut networks = BTreeMap::new();
    for network in proto_result.networks {
        let mut nodes = BTreeMap::new();
        for node in network.nodes {
            let scope = format!("{}/{}", network.name, node.name);
            let out = OutputNode {
                consumptions: node
                    .consumptions
                    .into_iter()
                    .map(|c| {
                        let quantity = series(c.quantity, format!("consumption {} on {}", c.name, scope))?;
                        Ok(OutputConsumption {
                            name: c.name,
                            cost: c.cost,
                            quantity,
                        })
                    })
                    .collect::<MapResult<_>>()?,
                productions: node
                    .productions
                    .into_iter()
                    .map(|p| {
                        let quantity = series(p.quantity, format!("production {} on {}", p.name, scope))?;
                        Ok(OutputProduction {
                            name: p.name,
                            cost: p.cost,
                            quantity,
                        })
                    })
                    .collect::<MapResult<_>>()?,
                storages: node
                    .storages
                    .into_iter()
                    .map(|s| {
                        let entity = format!("storage {} on {}", s.name, scope);
                        Ok(OutputStorage {
                            capacity: series(s.capacity, format!("{} capacity", entity))?,
                            flow_in: series(s.flow_in, format!("{} flow_in", entity))?,
                            flow_out: series(s.flow_out, format!("{} flow_out", entity))?,
                            name: s.name,
                        })
                    })
                    .collect::<MapResult<_>>()?,
                links: node
                    .links
                    .into_iter()
                    .map(|l| {
                        let quantity = series(l.quantity, format!("link {} -> {}", scope, l.dest))?;
                        Ok(OutputLink {
                            dest: l.dest,
                            cost: l.cost,
                            quantity,
                        })
                    })
                    .collect::<MapResult<_>>()?,
            };
            nodes.insert(node.name, out);
        }
        networks.insert(network.name, OutputNetwork { nodes });
    }

    let mut converters = BTreeMap::new();
    for conv in proto_result.converters {
        let entity = format!("converter {}", conv.name);
        let flow_src = conv
            .flow_src
            .into_iter()
            .map(|s| {
                let quantity = series(s.quantity, format!("{} source {}/{}", entity, s.network, s.node))?;
                Ok(OutputConverterSource {
                    network: s.network,
                    node: s.node,
                    quantity,
                })
            })
            .collect::<MapResult<_>>()?;
        let flow_dest = series(conv.flow_dest, format!("{} flow_dest", entity))?;
        converters.insert(
            conv.name.clone(),
            OutputConverter {
                name: conv.name,
                flow_src,
                flow_dest,
            },
        );
    }

    let benchmark = proto_result
        .benchmark
        .map(|b| Benchmark {
            modeler_ms: b.modeler_ms,
            solver_ms: b.solver_ms,
            mapper_ms: b.mapper_ms,
        })
        .unwrap_or_default();

    Ok(StudyResult {
        horizon,
        nb_scn,
        networks,
        converters,
        objective: proto_result.objective,
        benchmark,
    })
}

// ---------------------------------------------------------------- failures

pub fn domain_to_proto_failures(failures: &[ScenarioError]) -> proto::FailureReport {
    use proto::scenario_failure::Kind;

    proto::FailureReport {
        failures: failures
            .iter()
            .map(|failure| match failure {
                ScenarioError::AdequacyInfeasible { scenario } => proto::ScenarioFailure {
                    scenario: *scenario as u32,
                    kind: Kind::Infeasible as i32,
                    message: failure.to_string(),
                },
                ScenarioError::SolverError { scenario, message } => proto::ScenarioFailure {
                    scenario: *scenario as u32,
                    kind: Kind::SolverError as i32,
                    message: message.clone(),
                },
            })
            .collect(),
    }
}

pub fn proto_to_domain_failures(report: proto::FailureReport) -> Vec<ScenarioError> {
    use proto::scenario_failure::Kind;

    report
        .failures
        .into_iter()
        .map(|failure| {
            let scenario = failure.scenario as usize;
            match Kind::try_from(failure.kind) {
                Ok(Kind::Infeasible) => ScenarioError::AdequacyInfeasible { scenario },
                _ => ScenarioError::SolverError {
                    scenario,
                    message: failure.message,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn study() -> Study {
        let study = Study::new(2, 1);
        let a = Node::new()
            .with_consumption(Consumption::new("load", 1e6, study.constant(10.0)))
            .with_storage(Storage::new("cell", 5.0, 1.0, 2.0).with_efficiency(0.9))
            .with_link(Link::new("b", 1.0, study.constant(3.0)));
        study
            .clone()
            .with_network("elec", Network::new().with_node("a", a).with_node("b", Node::new()))
            .with_converter(
                "conv",
                Converter::new("elec", "b", 1.0, study.constant(5.0)).with_source("elec", "a", 0.5),
            )
    }

    #[test]
    fn study_survives_the_wire() {
        let study = study();
        let back = proto_to_domain_study(domain_to_proto_study(&study)).unwrap();
        assert_eq!(back, study);
    }

    #[test]
    fn missing_series_is_invalid_argument() {
        let mut wire = domain_to_proto_study(&study());
        wire.networks[0].nodes[0].consumptions[0].quantity = None;

        let status = proto_to_domain_study(wire).unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert!(status.message().contains("consumption load on elec/a"));
    }

    #[test]
    fn duplicate_node_is_invalid_argument() {
        let mut wire = domain_to_proto_study(&study());
        let copy = wire.networks[0].nodes[0].clone();
        wire.networks[0].nodes.push(copy);

        assert!(proto_to_domain_study(wire).is_err());
    }

    fn empty_result() -> StudyResult {
        crate::optimizer::OutputMapper::new(&study()).into_result(0.5)
    }

    #[test]
    fn result_survives_the_wire() {
        let result = empty_result();
        let back = proto_to_domain_result(domain_to_proto_result(&result)).unwrap();
        assert_eq!(back, result);
        assert_eq!(back.converters["conv"].name, "conv");
    }

    #[test]
    fn malformed_result_series_is_rejected() {
        let mut wire = domain_to_proto_result(&empty_result());
        wire.networks[0].nodes[0].links[0].quantity = Some(proto::Series {
            nb_scn: 1,
            horizon: 1,
            values: vec![7.0],
        });

        let status = proto_to_domain_result(wire).unwrap_err();
        assert!(status.message().contains("link elec/a -> b"));
    }

    #[test]
    fn missing_result_series_is_rejected() {
        let mut wire = domain_to_proto_result(&empty_result());
        wire.converters[0].flow_dest = None;

        assert!(proto_to_domain_result(wire).is_err());
    }

    #[test]
    fn failure_kinds_are_preserved() {
        let failures = vec![
            ScenarioError::AdequacyInfeasible { scenario: 1 },
            ScenarioError::SolverError {
                scenario: 3,
                message: "numerical trouble".to_string(),
            },
        ];
        let back = proto_to_domain_failures(domain_to_proto_failures(&failures));
        assert_eq!(back, failures);
    }
}
