//! Functionality for running the scenario sweep and the power plant comparison.
use crate::boundary::BoundaryData;
use crate::model::Model;
use crate::optimisation::DispatchProblem;
use crate::optimisation::market::apply_market_constraints;
use crate::output::DataWriter;
use crate::scenario::Scenario;
use crate::timeline::MarketTimeline;
use crate::topology::district::build_district;
use crate::topology::power_plant::{PLANT_BUS, PLANT_SOURCE, PowerPlant, build_power_plant};
use crate::topology::{EdgeID, MarketSystem};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{error, info};

pub mod kpi;
use kpi::{PlantKpiRow, PlantKpis};

/// The solved flows of a topology, copied out of the solver
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    /// The flow in every step, for each edge
    pub flows: IndexMap<EdgeID, Vec<f64>>,
    /// Total variable cost
    pub objective: f64,
}

/// Build the dispatch problem for a topology, constrain its market flows and solve it.
///
/// # Arguments
///
/// * `built` - The topology and its market sell flows
/// * `show_solver_output` - Whether HiGHS should print its log to the console
pub fn dispatch(built: &MarketSystem, show_solver_output: bool) -> Result<DispatchResult> {
    let mut problem = DispatchProblem::new(&built.system)?;
    apply_market_constraints(&mut problem, &built.market_edges)?;
    let solution = problem.solve(show_solver_output)?;

    Ok(DispatchResult {
        flows: solution
            .iter_flows()
            .map(|(edge, flow)| (edge.clone(), flow.to_vec()))
            .collect(),
        objective: solution.objective(),
    })
}

/// What happened to one scenario in a sweep
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioStatus {
    /// The scenario was solved
    Solved {
        /// Total variable cost of the district
        objective: f64,
    },
    /// The scenario failed, with the error message
    Failed(String),
}

/// The outcome of each scenario in a sweep, in the order they were run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    outcomes: Vec<(String, ScenarioStatus)>,
}

impl SweepReport {
    /// Iterate over scenario names and their outcomes
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScenarioStatus)> {
        self.outcomes
            .iter()
            .map(|(name, status)| (name.as_str(), status))
    }

    /// The names of the scenarios which failed
    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.iter().filter_map(|(name, status)| match status {
            ScenarioStatus::Failed(_) => Some(name),
            ScenarioStatus::Solved { .. } => None,
        })
    }
}

/// Run every scenario of the model on the district.
///
/// A scenario which fails is logged and recorded in the report, and the sweep carries on with the
/// next one. Flows are only written for solved scenarios. Errors writing output are fatal.
///
/// # Arguments
///
/// * `model` - The model to run
/// * `writer` - Where to write the results
/// * `debug_model` - Whether to show solver output
pub fn run_sweep(model: &Model, writer: &DataWriter, debug_model: bool) -> Result<SweepReport> {
    let prices = model.market_timeline()?;
    let boundary = model.boundary_window()?;
    writer.write_market_prices(&prices)?;

    let mut report = SweepReport::default();
    for scenario in &model.parameters.scenarios {
        let name = scenario.to_string();
        info!("Running scenario: {name}");

        let scenario_prices = scenario.apply(&prices);
        writer.write_scenario_prices(&name, &scenario_prices)?;
        let status = match run_scenario(model, &boundary, &scenario_prices, debug_model) {
            Ok(result) => {
                writer.write_scenario_flows(
                    &name,
                    scenario_prices.timeline(),
                    result
                        .flows
                        .iter()
                        .map(|(edge, flow)| (edge, flow.as_slice())),
                )?;
                info!("Scenario {name} solved (total cost: {})", result.objective);
                ScenarioStatus::Solved {
                    objective: result.objective,
                }
            }
            Err(err) => {
                error!("Scenario {name} failed: {err:?}");
                ScenarioStatus::Failed(format!("{err:#}"))
            }
        };
        report.outcomes.push((name, status));
    }

    Ok(report)
}

fn run_scenario(
    model: &Model,
    boundary: &BoundaryData,
    prices: &MarketTimeline,
    debug_model: bool,
) -> Result<DispatchResult> {
    let params = &model.parameters;
    let district = build_district(boundary, prices, &params.sizing, params.gas_price)?;
    dispatch(&district, debug_model)
}

/// Solve each of the model's power plants against the unscaled market prices and write their
/// flows and KPIs.
pub fn run_power_plants(
    model: &Model,
    writer: &DataWriter,
    debug_model: bool,
) -> Result<Vec<(PowerPlant, PlantKpis)>> {
    let prices = model.market_timeline()?;
    let boundary = model.boundary_window()?;
    writer.write_market_prices(&prices)?;

    let generation_edge = EdgeID::new(PLANT_SOURCE, PLANT_BUS);
    let mut all_kpis = Vec::new();
    for &plant in &model.parameters.power_plants {
        info!("Running power plant: {plant}");
        let built = build_power_plant(plant, &boundary, &prices)?;
        let result = dispatch(&built, debug_model)
            .with_context(|| format!("Failed to solve the {plant} power plant"))?;
        writer.write_power_plant_flows(
            &plant.to_string(),
            prices.timeline(),
            result
                .flows
                .iter()
                .map(|(edge, flow)| (edge, flow.as_slice())),
        )?;

        let kpis = PlantKpis::compute(&result, &generation_edge, &built.market_edges, &prices)?;
        info!(
            "{plant}: generated {:.2} MWh for a total income of {:.2}",
            kpis.generation,
            kpis.total_income()
        );
        all_kpis.push((plant, kpis));
    }

    writer.write_power_plant_kpis(
        all_kpis
            .iter()
            .map(|(plant, kpis)| PlantKpiRow::new(&plant.to_string(), kpis)),
    )?;

    Ok(all_kpis)
}

/// The scenarios whose names match those given, in the model's order
pub fn select_scenarios<'a>(scenarios: &'a [Scenario], names: &[String]) -> Vec<&'a Scenario> {
    scenarios
        .iter()
        .filter(|scenario| names.is_empty() || names.contains(&scenario.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarketError;
    use crate::fixture::{boundary_data, market_timeline, write_model_dir};
    use crate::market::Market;
    use crate::scenario::default_sweep;
    use crate::topology::district::Sizing;
    use crate::units::{MoneyPerEnergy, Power};
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[rstest]
    fn test_dispatch_district(boundary_data: BoundaryData, market_timeline: MarketTimeline) {
        let district = build_district(
            &boundary_data,
            &market_timeline,
            &Sizing::default(),
            MoneyPerEnergy(12.5),
        )
        .unwrap();
        let result = dispatch(&district, false).unwrap();
        assert_eq!(result.flows.len(), district.system.iter_flows().count());

        let day_ahead = &result.flows[&district.market_edges[&Market::DayAhead]];
        assert!(day_ahead.chunks(4).all(|block| {
            block
                .iter()
                .all(|&flow| (flow - block[0]).abs() < 1e-6)
        }));
    }

    #[test]
    fn test_run_sweep() {
        let model_dir = tempdir().unwrap();
        write_model_dir(model_dir.path(), 1);
        let model = Model::from_path(model_dir.path()).unwrap();
        let output_dir = tempdir().unwrap();
        let writer = DataWriter::new(output_dir.path(), false);

        let report = run_sweep(&model, &writer, false).unwrap();
        let names: Vec<_> = report.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["baseline", "day_ahead_x2"]);
        assert_eq!(report.failed().count(), 0);
        for name in names {
            assert!(output_dir.path().join(format!("flows_{name}.csv")).is_file());
        }
        assert!(output_dir.path().join("market_prices.csv").is_file());
    }

    #[test]
    fn test_run_sweep_records_failure() {
        let model_dir = tempdir().unwrap();
        write_model_dir(model_dir.path(), 1);
        let mut model = Model::from_path(model_dir.path()).unwrap();

        // No heat can be supplied, so the district cannot be built
        model.parameters.sizing.boiler.power = Power(0.0);
        model.parameters.sizing.chp.thermal_power = Power(0.0);
        let output_dir = tempdir().unwrap();
        let writer = DataWriter::new(output_dir.path(), false);

        let report = run_sweep(&model, &writer, false).unwrap();
        assert_eq!(report.failed().count(), 2);
        assert!(!output_dir.path().join("flows_baseline.csv").exists());
        assert!(output_dir.path().join("market_prices.csv").is_file());
    }

    #[test]
    fn test_run_sweep_records_infeasible_scenario() {
        let model_dir = tempdir().unwrap();
        write_model_dir(model_dir.path(), 1);
        let mut model = Model::from_path(model_dir.path()).unwrap();

        // Enough nominal thermal power to build the district, but the CHP can only run if its
        // electricity output is non-zero, so no heat can actually be supplied
        let sizing = &mut model.parameters.sizing;
        sizing.boiler.power = Power(0.0);
        sizing.chp.thermal_power = Power(1000.0);
        sizing.chp.electric_power = Power(0.0);
        model.parameters.scenarios = vec![Scenario::Baseline];

        let boundary = model.boundary_window().unwrap();
        let prices = model.market_timeline().unwrap();
        let err = run_scenario(&model, &boundary, &prices, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MarketError>(),
            Some(MarketError::SolverNonOptimal(_))
        ));

        let output_dir = tempdir().unwrap();
        let writer = DataWriter::new(output_dir.path(), false);
        let report = run_sweep(&model, &writer, false).unwrap();
        assert_eq!(report.failed().collect::<Vec<_>>(), ["baseline"]);
        assert!(!output_dir.path().join("flows_baseline.csv").exists());
        assert!(output_dir.path().join("market_prices.csv").is_file());
    }

    #[test]
    fn test_run_power_plants() {
        let model_dir = tempdir().unwrap();
        write_model_dir(model_dir.path(), 1);
        let model = Model::from_path(model_dir.path()).unwrap();
        let output_dir = tempdir().unwrap();
        let writer = DataWriter::new(output_dir.path(), false);

        let kpis = run_power_plants(&model, &writer, false).unwrap();
        let plants: Vec<_> = kpis.iter().map(|(plant, _)| *plant).collect();
        assert_eq!(plants, [PowerPlant::Coal, PowerPlant::Pv]);

        for (_, kpis) in &kpis {
            assert!(kpis.generation > 0.0);
            assert!(kpis.total_income() > 0.0);
        }

        let table = fs::read_to_string(output_dir.path().join("power_plant_kpis.csv")).unwrap();
        assert_eq!(table.lines().count(), 3);
        assert!(output_dir.path().join("power_plant_flows_pv.csv").is_file());
    }

    #[test]
    fn test_select_scenarios() {
        let sweep = default_sweep();
        assert_eq!(select_scenarios(&sweep, &[]).len(), 4);
        let selected = select_scenarios(&sweep, &["future_base_x3".into()]);
        assert_eq!(selected, [&Scenario::FutureBaseInflated(3.0)]);
    }
}
