//! Solved counterpart of a [`Study`](super::Study).
//!
//! Same networks, nodes and entity names as the input; every numeric field
//! holds the quantity the optimizer actually used. Only the engine builds
//! these values.

use super::series::TimeSeries;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConsumption {
    pub name: String,
    pub cost: f64,
    /// Served quantity.
    pub quantity: TimeSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputProduction {
    pub name: String,
    pub cost: f64,
    /// Used quantity.
    pub quantity: TimeSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputStorage {
    pub name: String,
    /// Level at the end of each time step.
    pub capacity: TimeSeries,
    pub flow_in: TimeSeries,
    pub flow_out: TimeSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputLink {
    pub dest: String,
    pub cost: f64,
    pub quantity: TimeSeries,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputNode {
    pub consumptions: Vec<OutputConsumption>,
    pub productions: Vec<OutputProduction>,
    pub storages: Vec<OutputStorage>,
    pub links: Vec<OutputLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputNetwork {
    pub nodes: BTreeMap<String, OutputNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConverterSource {
    pub network: String,
    pub node: String,
    pub quantity: TimeSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConverter {
    pub name: String,
    pub flow_src: Vec<OutputConverterSource>,
    pub flow_dest: TimeSeries,
}

impl OutputConverter {
    pub fn source(&self, network: &str, node: &str) -> Option<&TimeSeries> {
        self.flow_src
            .iter()
            .find(|s| s.network == network && s.node == node)
            .map(|s| &s.quantity)
    }
}

/// Timings in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    /// Problem construction time, per scenario.
    pub modeler_ms: Vec<f64>,
    /// Solver time, per scenario.
    pub solver_ms: Vec<f64>,
    pub mapper_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyResult {
    pub horizon: usize,
    pub nb_scn: usize,
    pub networks: BTreeMap<String, OutputNetwork>,
    pub converters: BTreeMap<String, OutputConverter>,
    /// Minimised total cost, per scenario.
    pub objective: Vec<f64>,
    #[serde(default)]
    pub benchmark: Benchmark,
}

impl StudyResult {
    pub fn node(&self, network: &str, node: &str) -> Option<&OutputNode> {
        self.networks.get(network).and_then(|n| n.nodes.get(node))
    }

    /// True when both results hold the same solved values, ignoring timings.
    pub fn same_values(&self, other: &StudyResult) -> bool {
        self.horizon == other.horizon
            && self.nb_scn == other.nb_scn
            && self.networks == other.networks
            && self.converters == other.converters
            && self.objective == other.objective
    }
}

impl OutputNode {
    pub fn consumption(&self, name: &str) -> Option<&OutputConsumption> {
        self.consumptions.iter().find(|c| c.name == name)
    }

    pub fn production(&self, name: &str) -> Option<&OutputProduction> {
        self.productions.iter().find(|p| p.name == name)
    }

    pub fn storage(&self, name: &str) -> Option<&OutputStorage> {
        self.storages.iter().find(|s| s.name == name)
    }

    pub fn link(&self, dest: &str) -> Option<&OutputLink> {
        self.links.iter().find(|l| l.dest == dest)
    }
}
