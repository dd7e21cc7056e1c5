//! The district topology: local demand, PV, a boiler, a CHP plant and a battery, with surplus
//! electricity sold into the four markets.
use super::{
    EnergySystem, Flow, MarketSystem, NodeKind, StorageParams, add_market_sinks,
};
use crate::boundary::BoundaryData;
use crate::input::deserialise_proportion_nonzero;
use crate::market::Market;
use crate::timeline::MarketTimeline;
use crate::units::{Energy, MoneyPerEnergy, Power};
use anyhow::{Result, ensure};
use serde::Deserialize;

/// Plant sizes for the district
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct Sizing {
    /// Installed PV capacity
    pub pv: PvSizing,
    /// Gas boiler
    pub boiler: BoilerSizing,
    /// Electric battery
    pub battery: BatterySizing,
    /// Combined heat and power plant
    pub chp: ChpSizing,
}

/// PV sizing
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PvSizing {
    /// Peak power
    pub power: Power,
}

impl Default for PvSizing {
    fn default() -> Self {
        Self {
            power: Power(200.0),
        }
    }
}

/// Gas boiler sizing
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoilerSizing {
    /// Thermal output power
    pub power: Power,
    /// Heat out per unit of gas in
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub efficiency: f64,
}

impl Default for BoilerSizing {
    fn default() -> Self {
        Self {
            power: Power(300.0),
            efficiency: 0.85,
        }
    }
}

/// Battery sizing
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BatterySizing {
    /// Maximum charging power
    pub input_power: Power,
    /// Maximum discharging power
    pub output_power: Power,
    /// Fraction of the stored energy lost per step
    pub self_discharge: f64,
    /// Storage capacity
    pub capacity: Energy,
    /// Charging efficiency
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub inflow_efficiency: f64,
    /// Discharging efficiency
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub outflow_efficiency: f64,
}

impl Default for BatterySizing {
    fn default() -> Self {
        Self {
            input_power: Power(10.0),
            output_power: Power(10.0),
            self_discharge: 0.1,
            capacity: Energy(200.0),
            inflow_efficiency: 0.98,
            outflow_efficiency: 0.98,
        }
    }
}

/// CHP sizing
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChpSizing {
    /// Electrical output power
    pub electric_power: Power,
    /// Thermal output power
    pub thermal_power: Power,
    /// Electricity out per unit of gas in
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub electric_efficiency: f64,
    /// Heat out per unit of gas in
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub thermal_efficiency: f64,
}

impl Default for ChpSizing {
    fn default() -> Self {
        Self {
            electric_power: Power(30.0),
            thermal_power: Power(60.0),
            electric_efficiency: 0.3,
            thermal_efficiency: 0.6,
        }
    }
}

impl Sizing {
    /// Check that sizes are non-negative and the battery loss rate is a fraction
    pub fn validate(&self) -> Result<()> {
        for (name, power) in [
            ("PV power", self.pv.power),
            ("boiler power", self.boiler.power),
            ("battery input power", self.battery.input_power),
            ("battery output power", self.battery.output_power),
            ("CHP electric power", self.chp.electric_power),
            ("CHP thermal power", self.chp.thermal_power),
        ] {
            ensure!(
                power.is_finite() && power.value() >= 0.0,
                "The {name} must be finite and non-negative"
            );
        }
        ensure!(
            self.battery.capacity.is_finite() && self.battery.capacity.value() >= 0.0,
            "The battery capacity must be finite and non-negative"
        );
        ensure!(
            (0.0..=1.0).contains(&self.battery.self_discharge),
            "The battery self-discharge must be between 0 and 1"
        );

        Ok(())
    }

    /// The combined thermal power of the boiler and CHP plant
    pub fn thermal_power(&self) -> Power {
        self.boiler.power + self.chp.thermal_power
    }
}

/// Build the district topology.
///
/// Prices are in EUR/MWh and flows in kW, so flow costs are prices divided by 1000.
///
/// # Arguments
///
/// * `boundary` - Demand and PV profiles, covering exactly the dispatch window
/// * `prices` - Market prices for the dispatch window
/// * `sizing` - Plant sizes
/// * `gas_price` - The price of gas
pub fn build_district(
    boundary: &BoundaryData,
    prices: &MarketTimeline,
    sizing: &Sizing,
    gas_price: MoneyPerEnergy,
) -> Result<MarketSystem> {
    let steps = prices.len();
    ensure!(
        boundary.len() == steps,
        "Boundary data covers {} steps but the market prices cover {steps}",
        boundary.len()
    );
    let peak_heat = boundary.peak_heat();
    ensure!(
        sizing.thermal_power().value() >= peak_heat,
        "Thermal power ({} kW) is not enough for the peak heat demand ({peak_heat} kW). \
        Check the boiler and CHP sizes.",
        sizing.thermal_power()
    );

    let mut system = EnergySystem::new(steps);

    // Buses
    for bus in [
        "b_renewable",
        "b_el_out",
        "b_electric_supply",
        "b_gas",
        "b_heat_supply",
    ] {
        system.add_node(bus, NodeKind::Bus)?;
    }
    system.add_flow("b_renewable", "b_el_out", Flow::new(steps))?;
    system.add_flow("b_renewable", "b_electric_supply", Flow::new(steps))?;

    // Grid and gas supply
    system.add_node("s_electric_grid", NodeKind::Source)?;
    let grid_costs = prices
        .get(Market::DayAhead)
        .iter()
        .map(|price| MoneyPerEnergy(*price).per_kwh())
        .collect();
    system.add_flow(
        "s_electric_grid",
        "b_electric_supply",
        Flow::new(steps).with_costs(grid_costs),
    )?;
    system.add_node("m_gas", NodeKind::Source)?;
    system.add_flow(
        "m_gas",
        "b_gas",
        Flow::new(steps).with_constant_cost(gas_price.per_kwh()),
    )?;

    // Local demand
    system.add_node("d_el", NodeKind::Sink)?;
    system.add_flow(
        "b_electric_supply",
        "d_el",
        Flow::new(steps)
            .with_nominal_value(1.0)
            .with_fix(boundary.electricity.clone()),
    )?;
    system.add_node("d_heat", NodeKind::Sink)?;
    system.add_flow(
        "b_heat_supply",
        "d_heat",
        Flow::new(steps)
            .with_nominal_value(1.0)
            .with_fix(boundary.heat.clone()),
    )?;

    // PV
    system.add_node("s_pv", NodeKind::Source)?;
    system.add_flow(
        "s_pv",
        "b_renewable",
        Flow::new(steps)
            .with_nominal_value(sizing.pv.power.value())
            .with_max(boundary.pv_pu.clone()),
    )?;

    // Boiler
    system.add_node(
        "t_boiler",
        NodeKind::Transformer {
            conversion_factors: [("b_heat_supply".into(), sizing.boiler.efficiency)]
                .into_iter()
                .collect(),
        },
    )?;
    system.add_flow("b_gas", "t_boiler", Flow::new(steps))?;
    system.add_flow(
        "t_boiler",
        "b_heat_supply",
        Flow::new(steps).with_nominal_value(sizing.boiler.power.value()),
    )?;

    // Battery
    let battery = &sizing.battery;
    system.add_node(
        "sto_battery",
        NodeKind::Storage(StorageParams {
            capacity: battery.capacity.value(),
            loss_rate: battery.self_discharge,
            inflow_efficiency: battery.inflow_efficiency,
            outflow_efficiency: battery.outflow_efficiency,
            initial_level: 0.0,
        }),
    )?;
    system.add_flow(
        "b_renewable",
        "sto_battery",
        Flow::new(steps).with_nominal_value(battery.input_power.value()),
    )?;
    system.add_flow(
        "sto_battery",
        "b_renewable",
        Flow::new(steps).with_nominal_value(battery.output_power.value()),
    )?;

    // CHP
    let chp = &sizing.chp;
    system.add_node(
        "t_chp",
        NodeKind::Transformer {
            conversion_factors: [
                ("b_renewable".into(), chp.electric_efficiency),
                ("b_heat_supply".into(), chp.thermal_efficiency),
            ]
            .into_iter()
            .collect(),
        },
    )?;
    system.add_flow("b_gas", "t_chp", Flow::new(steps))?;
    system.add_flow(
        "t_chp",
        "b_renewable",
        Flow::new(steps).with_nominal_value(chp.electric_power.value()),
    )?;
    system.add_flow(
        "t_chp",
        "b_heat_supply",
        Flow::new(steps).with_nominal_value(chp.thermal_power.value()),
    )?;

    // Markets
    let market_edges = add_market_sinks(&mut system, "b_el_out", prices, 1.0 / 1000.0)?;
    system.validate()?;

    Ok(MarketSystem {
        system,
        market_edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, boundary_data, market_timeline};
    use crate::topology::EdgeID;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_sizing_defaults_from_toml() {
        let sizing: Sizing = toml::from_str("[chp]\nelectric_power = 50").unwrap();
        assert_eq!(sizing.chp.electric_power, Power(50.0));
        assert_eq!(sizing.chp.thermal_power, Power(60.0));
        assert_eq!(sizing.pv.power, Power(200.0));
        assert_eq!(sizing.thermal_power(), Power(360.0));
        sizing.validate().unwrap();
    }

    #[test]
    fn test_sizing_invalid_efficiency() {
        assert!(toml::from_str::<Sizing>("[boiler]\nefficiency = 1.2").is_err());
    }

    #[test]
    fn test_sizing_validate() {
        let mut sizing = Sizing::default();
        sizing.battery.capacity = Energy(-1.0);
        assert!(sizing.validate().is_err());
    }

    #[rstest]
    fn test_build_district(boundary_data: BoundaryData, market_timeline: MarketTimeline) {
        let district = build_district(
            &boundary_data,
            &market_timeline,
            &Sizing::default(),
            MoneyPerEnergy(12.5),
        )
        .unwrap();

        assert_eq!(district.market_edges.len(), 4);
        assert_eq!(
            district.market_edges[&Market::DayAhead],
            EdgeID::new("b_el_out", "s_da")
        );

        // Selling earns the price in EUR/kWh
        let sell = district
            .system
            .get_flow(&district.market_edges[&Market::Intraday])
            .unwrap();
        assert_approx_eq!(
            f64,
            sell.variable_costs[5],
            -market_timeline.get(Market::Intraday)[5] / 1000.0
        );

        let gas = district
            .system
            .get_flow(&EdgeID::new("m_gas", "b_gas"))
            .unwrap();
        assert_approx_eq!(f64, gas.variable_costs[0], 0.0125);
    }

    #[rstest]
    fn test_build_district_not_enough_heat(
        boundary_data: BoundaryData,
        market_timeline: MarketTimeline,
    ) {
        let mut sizing = Sizing::default();
        sizing.boiler.power = Power(0.0);
        sizing.chp.thermal_power = Power(1.0);
        assert_error!(
            build_district(
                &boundary_data,
                &market_timeline,
                &sizing,
                MoneyPerEnergy(12.5)
            ),
            "Thermal power (1 kW) is not enough for the peak heat demand (80 kW). \
            Check the boiler and CHP sizes."
        );
    }
}
