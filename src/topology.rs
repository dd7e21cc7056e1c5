//! Energy-system topologies: nodes connected by directed flows.
//!
//! A topology is purely declarative. It is turned into a linear program by
//! [`DispatchProblem`](crate::optimisation::DispatchProblem).
use crate::id::define_id_type;
use crate::market::Market;
use crate::timeline::MarketTimeline;
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use std::fmt;
use strum::IntoEnumIterator;

pub mod district;
pub mod power_plant;

define_id_type! {NodeID}

/// Identifies a directed flow between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeID {
    /// The node the flow leaves
    pub source: NodeID,
    /// The node the flow enters
    pub sink: NodeID,
}

impl EdgeID {
    /// Create a new edge ID from node labels
    pub fn new(source: &str, sink: &str) -> Self {
        Self {
            source: source.into(),
            sink: sink.into(),
        }
    }
}

impl fmt::Display for EdgeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.sink)
    }
}

/// The sell flow for each market
pub type MarketEdges = IndexMap<Market, EdgeID>;

/// A topology together with the sell flow for each market
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSystem {
    /// The nodes and flows
    pub system: EnergySystem,
    /// The sell flow for each market
    pub market_edges: MarketEdges,
}

/// The label of the sink node for a market
pub fn market_sink_label(market: Market) -> &'static str {
    match market {
        Market::DayAhead => "s_da",
        Market::Intraday => "s_id",
        Market::FutureBase => "s_fb",
        Market::FuturePeak => "s_fp",
    }
}

/// Add a sink for each market, fed from `bus`, which earns the market price.
///
/// The cost of each sell flow is the negated price multiplied by `price_scale`.
pub fn add_market_sinks(
    system: &mut EnergySystem,
    bus: &str,
    prices: &MarketTimeline,
    price_scale: f64,
) -> Result<MarketEdges> {
    ensure!(
        prices.len() == system.timesteps(),
        "Market prices cover {} steps but the system has {}",
        prices.len(),
        system.timesteps()
    );

    let mut market_edges = MarketEdges::new();
    for market in Market::iter() {
        let label = market_sink_label(market);
        system.add_node(label, NodeKind::Sink)?;
        let costs = prices
            .get(market)
            .iter()
            .map(|price| -price * price_scale)
            .collect();
        let edge = system.add_flow(bus, label, Flow::new(prices.len()).with_costs(costs))?;
        market_edges.insert(market, edge);
    }

    Ok(market_edges)
}

/// Parameters of a storage node
#[derive(Debug, Clone, PartialEq)]
pub struct StorageParams {
    /// Storage capacity (kWh)
    pub capacity: f64,
    /// Fraction of the stored energy lost in each step
    pub loss_rate: f64,
    /// Fraction of the inflow which is stored
    pub inflow_efficiency: f64,
    /// Fraction of the withdrawn energy which leaves as outflow
    pub outflow_efficiency: f64,
    /// Level before the first step, as a fraction of capacity
    pub initial_level: f64,
}

/// What a node does with the flows into and out of it
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Inflows equal outflows in every step
    Bus,
    /// Only has outflows
    Source,
    /// Only has inflows
    Sink,
    /// Has a single input. Each output equals the input times its conversion factor.
    Transformer {
        /// Conversion factor for each output node
        conversion_factors: IndexMap<NodeID, f64>,
    },
    /// Stores energy between steps. Has exactly one input and one output.
    Storage(StorageParams),
}

/// A directed flow with per-step costs and bounds
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    /// Cost per unit of flow in each step
    pub variable_costs: Vec<f64>,
    /// Scales `max` and `fix`; an upper bound on its own
    pub nominal_value: Option<f64>,
    /// Upper bound in each step, relative to the nominal value
    pub max: Option<Vec<f64>>,
    /// Fixed value in each step, relative to the nominal value
    pub fix: Option<Vec<f64>>,
}

impl Flow {
    /// An unbounded, free flow over `timesteps` steps
    pub fn new(timesteps: usize) -> Self {
        Self {
            variable_costs: vec![0.0; timesteps],
            nominal_value: None,
            max: None,
            fix: None,
        }
    }

    /// Set the cost in each step
    pub fn with_costs(mut self, costs: Vec<f64>) -> Self {
        self.variable_costs = costs;
        self
    }

    /// Set the same cost for every step
    pub fn with_constant_cost(mut self, cost: f64) -> Self {
        self.variable_costs.fill(cost);
        self
    }

    /// Set the nominal value
    pub fn with_nominal_value(mut self, nominal_value: f64) -> Self {
        self.nominal_value = Some(nominal_value);
        self
    }

    /// Set a relative upper bound for each step
    pub fn with_max(mut self, max: Vec<f64>) -> Self {
        self.max = Some(max);
        self
    }

    /// Fix the flow in each step, relative to the nominal value
    pub fn with_fix(mut self, fix: Vec<f64>) -> Self {
        self.fix = Some(fix);
        self
    }

    /// The number of steps covered by the flow
    pub fn timesteps(&self) -> usize {
        self.variable_costs.len()
    }

    /// The lower and upper bound of the flow in the given step
    pub fn bounds(&self, timestep: usize) -> (f64, f64) {
        let nominal = self.nominal_value.unwrap_or(1.0);
        if let Some(fix) = &self.fix {
            let value = nominal * fix[timestep];
            return (value, value);
        }

        let upper = match (&self.max, self.nominal_value) {
            (Some(max), _) => nominal * max[timestep],
            (None, Some(nominal)) => nominal,
            (None, None) => f64::INFINITY,
        };
        (0.0, upper)
    }

    fn validate(&self, timesteps: usize) -> Result<()> {
        ensure!(
            self.variable_costs.len() == timesteps,
            "Variable costs cover {} steps (expected {timesteps})",
            self.variable_costs.len()
        );
        ensure!(
            self.variable_costs.iter().all(|cost| cost.is_finite()),
            "Variable costs must be finite"
        );
        if let Some(nominal) = self.nominal_value {
            ensure!(
                nominal.is_finite() && nominal >= 0.0,
                "Nominal value must be finite and non-negative"
            );
        }
        for (name, profile) in [("max", &self.max), ("fix", &self.fix)] {
            if let Some(profile) = profile {
                ensure!(
                    profile.len() == timesteps,
                    "The {name} profile covers {} steps (expected {timesteps})",
                    profile.len()
                );
                ensure!(
                    profile.iter().all(|value| value.is_finite() && *value >= 0.0),
                    "The {name} profile must be finite and non-negative"
                );
            }
        }

        Ok(())
    }
}

/// A set of nodes and the flows between them, over a fixed number of dispatch steps
#[derive(Debug, Clone, PartialEq)]
pub struct EnergySystem {
    timesteps: usize,
    nodes: IndexMap<NodeID, NodeKind>,
    flows: IndexMap<EdgeID, Flow>,
}

impl EnergySystem {
    /// Create an empty energy system
    pub fn new(timesteps: usize) -> Self {
        Self {
            timesteps,
            nodes: IndexMap::new(),
            flows: IndexMap::new(),
        }
    }

    /// The number of dispatch steps
    pub fn timesteps(&self) -> usize {
        self.timesteps
    }

    /// Add a node
    pub fn add_node(&mut self, id: &str, kind: NodeKind) -> Result<NodeID> {
        let id = NodeID::new(id);
        ensure!(
            !self.nodes.contains_key(&id),
            "Node {id} has already been added"
        );
        self.nodes.insert(id.clone(), kind);

        Ok(id)
    }

    /// Add a flow between two existing nodes
    pub fn add_flow(&mut self, source: &str, sink: &str, flow: Flow) -> Result<EdgeID> {
        let edge = EdgeID::new(source, sink);
        let source_kind = self.node(&edge.source)?;
        ensure!(
            !matches!(source_kind, NodeKind::Sink),
            "Sink {source} cannot have outflows"
        );
        let sink_kind = self.node(&edge.sink)?;
        ensure!(
            !matches!(sink_kind, NodeKind::Source),
            "Source {sink} cannot have inflows"
        );
        ensure!(
            !self.flows.contains_key(&edge),
            "Flow {edge} has already been added"
        );
        flow.validate(self.timesteps)
            .with_context(|| format!("Invalid flow {edge}"))?;

        self.flows.insert(edge.clone(), flow);
        Ok(edge)
    }

    fn node(&self, id: &NodeID) -> Result<&NodeKind> {
        self.nodes
            .get(id)
            .with_context(|| format!("Node {id} not found"))
    }

    /// Get the flow with the given ID
    pub fn get_flow(&self, edge: &EdgeID) -> Option<&Flow> {
        self.flows.get(edge)
    }

    /// Iterate over the nodes in the order they were added
    pub fn iter_nodes(&self) -> impl Iterator<Item = (&NodeID, &NodeKind)> {
        self.nodes.iter()
    }

    /// Iterate over the flows in the order they were added
    pub fn iter_flows(&self) -> impl Iterator<Item = (&EdgeID, &Flow)> {
        self.flows.iter()
    }

    /// The flows entering a node
    pub fn inputs<'a>(&'a self, node: &'a NodeID) -> impl Iterator<Item = &'a EdgeID> {
        self.flows.keys().filter(move |edge| &edge.sink == node)
    }

    /// The flows leaving a node
    pub fn outputs<'a>(&'a self, node: &'a NodeID) -> impl Iterator<Item = &'a EdgeID> {
        self.flows.keys().filter(move |edge| &edge.source == node)
    }

    /// Check that transformers and storage nodes are connected properly
    pub fn validate(&self) -> Result<()> {
        for (id, kind) in &self.nodes {
            let inputs = self.inputs(id).count();
            match kind {
                NodeKind::Transformer { conversion_factors } => {
                    ensure!(inputs == 1, "Transformer {id} must have exactly one input");
                    let mut outputs: Vec<_> = self.outputs(id).map(|edge| &edge.sink).collect();
                    let mut expected: Vec<_> = conversion_factors.keys().collect();
                    outputs.sort();
                    expected.sort();
                    ensure!(
                        outputs == expected,
                        "Transformer {id} outputs do not match its conversion factors"
                    );
                    for (output, factor) in conversion_factors {
                        ensure!(
                            factor.is_finite() && *factor > 0.0,
                            "Invalid conversion factor for {id}->{output}"
                        );
                    }
                }
                NodeKind::Storage(params) => {
                    ensure!(
                        inputs == 1 && self.outputs(id).count() == 1,
                        "Storage {id} must have exactly one input and one output"
                    );
                    validate_storage(params).with_context(|| format!("Invalid storage {id}"))?;
                }
                NodeKind::Bus | NodeKind::Source | NodeKind::Sink => {}
            }
        }

        Ok(())
    }
}

fn validate_storage(params: &StorageParams) -> Result<()> {
    ensure!(
        params.capacity.is_finite() && params.capacity >= 0.0,
        "Capacity must be finite and non-negative"
    );
    for (name, value) in [
        ("loss rate", params.loss_rate),
        ("initial level", params.initial_level),
    ] {
        if !(0.0..=1.0).contains(&value) {
            bail!("The {name} must be between 0 and 1");
        }
    }
    for (name, value) in [
        ("inflow efficiency", params.inflow_efficiency),
        ("outflow efficiency", params.outflow_efficiency),
    ] {
        ensure!(
            value > 0.0 && value <= 1.0,
            "The {name} must be > 0 and <= 1"
        );
    }

    Ok(())
}
