//! Single power plants selling into the four markets.
use super::{EnergySystem, Flow, MarketSystem, NodeKind, add_market_sinks};
use crate::boundary::BoundaryData;
use crate::timeline::MarketTimeline;
use crate::units::MoneyPerEnergy;
use anyhow::{Result, ensure};
use serde_string_enum::DeserializeLabeledStringEnum;
use strum::{Display, EnumIter};

/// The label of the plant's source node
pub const PLANT_SOURCE: &str = "source";

/// The bus the plant feeds and the markets buy from
pub const PLANT_BUS: &str = "b_el_out";

/// A kind of power plant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, DeserializeLabeledStringEnum)]
#[strum(serialize_all = "snake_case")]
pub enum PowerPlant {
    /// Hard coal
    #[string = "coal"]
    Coal,
    /// Natural gas
    #[string = "gas"]
    Gas,
    /// Biogas
    #[string = "biogas"]
    Biogas,
    /// Photovoltaics
    #[string = "pv"]
    Pv,
    /// Onshore wind
    #[string = "wind"]
    Wind,
}

impl PowerPlant {
    /// The marginal generation cost
    pub fn variable_cost(self) -> MoneyPerEnergy {
        MoneyPerEnergy(match self {
            Self::Coal => 43.92,
            Self::Gas => 46.17,
            Self::Biogas => 68.15,
            Self::Pv | Self::Wind => 0.0,
        })
    }

    /// The available capacity in each step, per unit of nominal power
    pub fn availability(self, boundary: &BoundaryData) -> Vec<f64> {
        match self {
            Self::Pv => boundary.pv_pu.clone(),
            Self::Wind => boundary.wind_pu.clone(),
            Self::Coal | Self::Gas | Self::Biogas => vec![1.0; boundary.len()],
        }
    }
}

/// Build a topology with one plant of unit nominal power.
///
/// Prices and costs are both per MWh, so flows are in MW.
pub fn build_power_plant(
    plant: PowerPlant,
    boundary: &BoundaryData,
    prices: &MarketTimeline,
) -> Result<MarketSystem> {
    let steps = prices.len();
    ensure!(
        boundary.len() == steps,
        "Boundary data covers {} steps but the market prices cover {steps}",
        boundary.len()
    );

    let mut system = EnergySystem::new(steps);
    system.add_node(PLANT_BUS, NodeKind::Bus)?;
    system.add_node(PLANT_SOURCE, NodeKind::Source)?;
    system.add_flow(
        PLANT_SOURCE,
        PLANT_BUS,
        Flow::new(steps)
            .with_constant_cost(plant.variable_cost().value())
            .with_nominal_value(1.0)
            .with_max(plant.availability(boundary)),
    )?;
    let market_edges = add_market_sinks(&mut system, PLANT_BUS, prices, 1.0)?;

    Ok(MarketSystem {
        system,
        market_edges,
    })
}
