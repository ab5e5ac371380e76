//! Input description of an adequacy study.
//!
//! A study is immutable once handed to an optimizer. Every time-indexed
//! quantity is a [`TimeSeries`] of shape `(nb_scn, horizon)`.

use super::error::ModelError;
use super::series::TimeSeries;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Forced demand, penalised by `cost` per unit left unserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consumption {
    pub name: String,
    pub cost: f64,
    pub quantity: TimeSeries,
}

impl Consumption {
    pub fn new(name: impl Into<String>, cost: f64, quantity: TimeSeries) -> Self {
        Self {
            name: name.into(),
            cost,
            quantity,
        }
    }
}

/// Available capacity, costing `cost` per unit used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Production {
    pub name: String,
    pub cost: f64,
    pub quantity: TimeSeries,
}

impl Production {
    pub fn new(name: impl Into<String>, cost: f64, quantity: TimeSeries) -> Self {
        Self {
            name: name.into(),
            cost,
            quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    pub name: String,
    pub capacity_max: f64,
    pub capacity_initial: f64,
    pub flow_in_max: f64,
    pub flow_out_max: f64,
    /// Per unit of stored level, per time step.
    pub cost: f64,
    /// Applied to inflow only.
    pub efficiency: f64,
}

impl Storage {
    pub fn new(name: impl Into<String>, capacity_max: f64, flow_in_max: f64, flow_out_max: f64) -> Self {
        Self {
            name: name.into(),
            capacity_max,
            capacity_initial: 0.0,
            flow_in_max,
            flow_out_max,
            cost: 0.0,
            efficiency: 1.0,
        }
    }

    pub fn with_initial(mut self, capacity_initial: f64) -> Self {
        self.capacity_initial = capacity_initial;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_efficiency(mut self, efficiency: f64) -> Self {
        self.efficiency = efficiency;
        self
    }
}

/// Directed transfer capacity from the owning node to `dest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub dest: String,
    pub cost: f64,
    pub quantity: TimeSeries,
}

impl Link {
    pub fn new(dest: impl Into<String>, cost: f64, quantity: TimeSeries) -> Self {
        Self {
            dest: dest.into(),
            cost,
            quantity,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub consumptions: Vec<Consumption>,
    pub productions: Vec<Production>,
    pub storages: Vec<Storage>,
    pub links: Vec<Link>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_consumption(mut self, consumption: Consumption) -> Self {
        self.consumptions.push(consumption);
        self
    }

    pub fn with_production(mut self, production: Production) -> Self {
        self.productions.push(production);
        self
    }

    pub fn with_storage(mut self, storage: Storage) -> Self {
        self.storages.push(storage);
        self
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub nodes: BTreeMap<String, Node>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, name: impl Into<String>, node: Node) -> Self {
        self.nodes.insert(name.into(), node);
        self
    }
}

/// Input edge of a converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterSource {
    pub network: String,
    pub node: String,
    pub ratio: f64,
}

/// Turns flows taken from source nodes into one flow injected at a
/// destination node: `output = Σ input_i * ratio_i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Converter {
    pub sources: Vec<ConverterSource>,
    pub dest_network: String,
    pub dest_node: String,
    /// Per unit of output flow.
    pub cost: f64,
    /// Output flow capacity.
    pub max: TimeSeries,
}

impl Converter {
    pub fn new(dest_network: impl Into<String>, dest_node: impl Into<String>, cost: f64, max: TimeSeries) -> Self {
        Self {
            sources: Vec::new(),
            dest_network: dest_network.into(),
            dest_node: dest_node.into(),
            cost,
            max,
        }
    }

    pub fn with_source(mut self, network: impl Into<String>, node: impl Into<String>, ratio: f64) -> Self {
        self.sources.push(ConverterSource {
            network: network.into(),
            node: node.into(),
            ratio,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub horizon: usize,
    pub nb_scn: usize,
    #[serde(default)]
    pub networks: BTreeMap<String, Network>,
    #[serde(default)]
    pub converters: BTreeMap<String, Converter>,
}

impl Study {
    pub fn new(horizon: usize, nb_scn: usize) -> Self {
        Self {
            horizon,
            nb_scn,
            networks: BTreeMap::new(),
            converters: BTreeMap::new(),
        }
    }

    pub fn with_network(mut self, name: impl Into<String>, network: Network) -> Self {
        self.networks.insert(name.into(), network);
        self
    }

    pub fn with_converter(mut self, name: impl Into<String>, converter: Converter) -> Self {
        self.converters.insert(name.into(), converter);
        self
    }

    /// Series of shape `(nb_scn, horizon)` filled with `value`.
    pub fn constant(&self, value: f64) -> TimeSeries {
        TimeSeries::constant(self.nb_scn, self.horizon, value)
    }

    pub fn node(&self, network: &str, node: &str) -> Option<&Node> {
        self.networks.get(network).and_then(|n| n.nodes.get(node))
    }

    /// Number of (node, time step) balance equations per scenario.
    pub fn num_balance_rows(&self) -> usize {
        self.networks.values().map(|n| n.nodes.len()).sum::<usize>() * self.horizon
    }

    /// Check every structural invariant the engine relies on.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.horizon == 0 || self.nb_scn == 0 {
            return Err(ModelError::EmptyStudy {
                horizon: self.horizon,
                nb_scn: self.nb_scn,
            });
        }

        for (network_name, network) in &self.networks {
            for (node_name, node) in &network.nodes {
                let scope = format!("{}/{}", network_name, node_name);
                self.validate_node(network_name, network, node_name, &scope, node)?;
            }
        }

        for (name, converter) in &self.converters {
            self.validate_converter(name, converter)?;
        }

        Ok(())
    }

    fn validate_node(
        &self,
        network_name: &str,
        network: &Network,
        node_name: &str,
        scope: &str,
        node: &Node,
    ) -> Result<(), ModelError> {
        unique_names("consumption", scope, node.consumptions.iter().map(|c| c.name.as_str()))?;
        unique_names("production", scope, node.productions.iter().map(|p| p.name.as_str()))?;
        unique_names("storage", scope, node.storages.iter().map(|s| s.name.as_str()))?;
        unique_names("link", scope, node.links.iter().map(|l| l.dest.as_str()))?;

        for c in &node.consumptions {
            let entity = format!("consumption {} on {}", c.name, scope);
            non_negative(&entity, "cost", c.cost)?;
            self.check_series(&entity, &c.quantity)?;
        }

        for p in &node.productions {
            let entity = format!("production {} on {}", p.name, scope);
            non_negative(&entity, "cost", p.cost)?;
            self.check_series(&entity, &p.quantity)?;
        }

        for s in &node.storages {
            let entity = format!("storage {} on {}", s.name, scope);
            non_negative(&entity, "capacity_max", s.capacity_max)?;
            non_negative(&entity, "capacity_initial", s.capacity_initial)?;
            non_negative(&entity, "flow_in_max", s.flow_in_max)?;
            non_negative(&entity, "flow_out_max", s.flow_out_max)?;
            non_negative(&entity, "cost", s.cost)?;
            if !(s.efficiency > 0.0 && s.efficiency <= 1.0) {
                return Err(ModelError::InvalidEfficiency {
                    entity,
                    value: s.efficiency,
                });
            }
        }

        for l in &node.links {
            let entity = format!("link {} -> {} on {}", scope, l.dest, network_name);
            // Import and export of a self-link land on the same balance row.
            if l.dest == node_name {
                return Err(ModelError::SelfLink {
                    network: network_name.to_string(),
                    node: node_name.to_string(),
                });
            }
            if !network.nodes.contains_key(&l.dest) {
                return Err(ModelError::UnknownNode {
                    context: entity,
                    network: network_name.to_string(),
                    node: l.dest.clone(),
                });
            }
            non_negative(&entity, "cost", l.cost)?;
            self.check_series(&entity, &l.quantity)?;
        }

        Ok(())
    }

    fn validate_converter(&self, name: &str, converter: &Converter) -> Result<(), ModelError> {
        let entity = format!("converter {}", name);
        non_negative(&entity, "cost", converter.cost)?;
        self.check_series(&entity, &converter.max)?;

        if self.node(&converter.dest_network, &converter.dest_node).is_none() {
            return Err(ModelError::UnknownNode {
                context: entity,
                network: converter.dest_network.clone(),
                node: converter.dest_node.clone(),
            });
        }

        let mut seen = HashSet::new();
        for source in &converter.sources {
            if self.node(&source.network, &source.node).is_none() {
                return Err(ModelError::UnknownNode {
                    context: entity,
                    network: source.network.clone(),
                    node: source.node.clone(),
                });
            }
            if !seen.insert((source.network.as_str(), source.node.as_str())) {
                return Err(ModelError::DuplicateName {
                    kind: "converter source",
                    name: format!("{}/{}", source.network, source.node),
                    scope: entity,
                });
            }
            if !(source.ratio.is_finite() && source.ratio > 0.0) {
                return Err(ModelError::InvalidRatio {
                    converter: name.to_string(),
                    network: source.network.clone(),
                    node: source.node.clone(),
                    value: source.ratio,
                });
            }
        }

        Ok(())
    }

    fn check_series(&self, entity: &str, series: &TimeSeries) -> Result<(), ModelError> {
        let expected = (self.nb_scn, self.horizon);
        if series.shape() != expected {
            return Err(ModelError::ShapeMismatch {
                entity: entity.to_string(),
                expected,
                found: series.shape(),
            });
        }
        match series.iter().find(|v| !(v.is_finite() && *v >= 0.0)) {
            Some(value) => Err(ModelError::Negative {
                entity: entity.to_string(),
                field: "quantity",
                value,
            }),
            None => Ok(()),
        }
    }
}

fn non_negative(entity: &str, field: &'static str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ModelError::Negative {
            entity: entity.to_string(),
            field,
            value,
        })
    }
}

fn unique_names<'a>(kind: &'static str, scope: &str, names: impl Iterator<Item = &'a str>) -> Result<(), ModelError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ModelError::DuplicateName {
                kind,
                name: name.to_string(),
                scope: scope.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_nodes() -> Study {
        let study = Study::new(2, 1);
        let a = Node::new()
            .with_consumption(Consumption::new("load", 1e6, study.constant(10.0)))
            .with_link(Link::new("b", 2.0, study.constant(5.0)));
        let b = Node::new().with_production(Production::new("gas", 30.0, study.constant(20.0)));
        study.with_network("default", Network::new().with_node("a", a).with_node("b", b))
    }

    #[test]
    fn valid_study_passes() {
        assert_eq!(two_nodes().validate(), Ok(()));
    }

    #[test]
    fn empty_horizon_is_rejected() {
        assert!(matches!(
            Study::new(0, 1).validate(),
            Err(ModelError::EmptyStudy { horizon: 0, nb_scn: 1 })
        ));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mut study = two_nodes();
        let node = study.networks.get_mut("default").unwrap().nodes.get_mut("b").unwrap();
        node.productions[0].quantity = TimeSeries::constant(1, 3, 1.0);

        match study.validate() {
            Err(ModelError::ShapeMismatch { expected, found, .. }) => {
                assert_eq!(expected, (1, 2));
                assert_eq!(found, (1, 3));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn duplicate_consumption_is_rejected() {
        let mut study = two_nodes();
        let node = study.networks.get_mut("default").unwrap().nodes.get_mut("a").unwrap();
        node.consumptions.push(node.consumptions[0].clone());

        assert!(matches!(
            study.validate(),
            Err(ModelError::DuplicateName { kind: "consumption", .. })
        ));
    }

    #[test]
    fn link_to_unknown_node_is_rejected() {
        let mut study = two_nodes();
        let node = study.networks.get_mut("default").unwrap().nodes.get_mut("a").unwrap();
        node.links[0].dest = "z".into();

        assert!(matches!(study.validate(), Err(ModelError::UnknownNode { .. })));
    }

    #[test]
    fn link_to_own_node_is_rejected() {
        let mut study = two_nodes();
        let node = study.networks.get_mut("default").unwrap().nodes.get_mut("a").unwrap();
        node.links[0].dest = "a".into();

        assert_eq!(
            study.validate(),
            Err(ModelError::SelfLink {
                network: "default".into(),
                node: "a".into(),
            })
        );
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let mut study = two_nodes();
        let node = study.networks.get_mut("default").unwrap().nodes.get_mut("a").unwrap();
        node.consumptions[0].quantity.set(0, 1, -1.0);

        assert!(matches!(study.validate(), Err(ModelError::Negative { .. })));
    }

    #[test]
    fn storage_efficiency_must_be_positive() {
        let study = Study::new(1, 1).with_network(
            "default",
            Network::new().with_node(
                "a",
                Node::new().with_storage(Storage::new("cell", 10.0, 1.0, 1.0).with_efficiency(0.0)),
            ),
        );

        assert!(matches!(study.validate(), Err(ModelError::InvalidEfficiency { .. })));
    }

    #[test]
    fn converter_sources_must_exist_and_be_positive() {
        let base = two_nodes();
        let unknown = base.clone().with_converter(
            "conv",
            Converter::new("default", "a", 0.0, base.constant(10.0)).with_source("gas", "x", 0.5),
        );
        assert!(matches!(unknown.validate(), Err(ModelError::UnknownNode { .. })));

        let zero = base.clone().with_converter(
            "conv",
            Converter::new("default", "a", 0.0, base.constant(10.0)).with_source("default", "b", 0.0),
        );
        assert!(matches!(zero.validate(), Err(ModelError::InvalidRatio { .. })));
    }

    #[test]
    fn study_json_round_trip_keeps_structure() {
        let study = two_nodes();
        let json = serde_json::to_string(&study).unwrap();
        let back: Study = serde_json::from_str(&json).unwrap();
        assert_eq!(back, study);
        assert_eq!(back.num_balance_rows(), 4);
    }
}
