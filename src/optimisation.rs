//! Code for building and solving the dispatch linear program for an energy system.
//!
//! There is one decision variable per flow per dispatch step, plus one storage level variable per
//! storage node per step. The objective is to minimise the total variable cost of all flows.
use crate::error::MarketError;
use crate::topology::{EdgeID, EnergySystem, NodeID};
use anyhow::{Result, ensure};
use highs::{HighsModelStatus, RowProblem as Problem, Sense};
use indexmap::{IndexMap, IndexSet};
use log::debug;

pub mod constraints;
pub mod market;

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
pub type Variable = highs::Col;

/// The variables for one flow or storage node, one per dispatch step.
///
/// Columns are added in one contiguous run, so the solution values for the variables start at
/// `first_column`.
struct VariableRun {
    first_column: usize,
    variables: Vec<Variable>,
}

/// An equality constraint with a unique name
#[derive(Debug, Clone, PartialEq)]
pub struct NamedConstraint {
    /// Unique name of the constraint
    pub name: String,
    /// The variables and their coefficients
    pub terms: Vec<(Variable, f64)>,
    /// The value the weighted sum of the terms must equal
    pub rhs: f64,
}

/// A dispatch problem which has been built but not yet solved
pub struct DispatchProblem<'a> {
    system: &'a EnergySystem,
    problem: Problem,
    num_columns: usize,
    flow_vars: IndexMap<EdgeID, VariableRun>,
    storage_vars: IndexMap<NodeID, VariableRun>,
    constraint_names: IndexSet<String>,
}

impl<'a> DispatchProblem<'a> {
    /// Build the problem for an energy system, adding the physical constraints.
    pub fn new(system: &'a EnergySystem) -> Result<Self> {
        system.validate()?;

        let mut dispatch = Self {
            system,
            problem: Problem::default(),
            num_columns: 0,
            flow_vars: IndexMap::new(),
            storage_vars: IndexMap::new(),
            constraint_names: IndexSet::new(),
        };
        dispatch.add_flow_variables();
        dispatch.add_storage_variables();
        constraints::add_physical_constraints(&mut dispatch);
        debug!(
            "Dispatch problem has {} columns and {} rows",
            dispatch.num_columns,
            dispatch.problem.num_rows()
        );

        Ok(dispatch)
    }

    fn add_flow_variables(&mut self) {
        let system = self.system;
        for (edge, flow) in system.iter_flows() {
            let first_column = self.num_columns;
            let variables = (0..system.timesteps())
                .map(|t| {
                    let (lower, upper) = flow.bounds(t);
                    let cost = flow.variable_costs[t];
                    if upper.is_finite() {
                        self.problem.add_column(cost, lower..=upper)
                    } else {
                        self.problem.add_column(cost, lower..)
                    }
                })
                .collect();
            self.num_columns += system.timesteps();

            self.flow_vars.insert(
                edge.clone(),
                VariableRun {
                    first_column,
                    variables,
                },
            );
        }
    }

    fn add_storage_variables(&mut self) {
        let system = self.system;
        for (id, params) in constraints::iter_storage(system) {
            let first_column = self.num_columns;
            let variables = (0..system.timesteps())
                .map(|_| self.problem.add_column(0.0, 0.0..=params.capacity))
                .collect();
            self.num_columns += system.timesteps();

            self.storage_vars.insert(
                id.clone(),
                VariableRun {
                    first_column,
                    variables,
                },
            );
        }
    }

    /// The energy system the problem was built from
    pub fn system(&self) -> &'a EnergySystem {
        self.system
    }

    /// The number of dispatch steps
    pub fn timesteps(&self) -> usize {
        self.system.timesteps()
    }

    /// The per-step variables for a flow
    pub fn flow_variables(&self, edge: &EdgeID) -> Option<&[Variable]> {
        self.flow_vars.get(edge).map(|run| run.variables.as_slice())
    }

    /// The per-step variable costs for a flow
    pub fn variable_costs(&self, edge: &EdgeID) -> Option<&[f64]> {
        self.system
            .get_flow(edge)
            .map(|flow| flow.variable_costs.as_slice())
    }

    fn storage_variables(&self, node: &NodeID) -> Option<&[Variable]> {
        self.storage_vars.get(node).map(|run| run.variables.as_slice())
    }

    /// The number of constraint rows
    pub fn num_rows(&self) -> usize {
        self.problem.num_rows()
    }

    /// Whether a named constraint has been added
    pub fn has_constraint(&self, name: &str) -> bool {
        self.constraint_names.contains(name)
    }

    /// Iterate over the names of the named constraints, in the order they were added
    pub fn iter_constraint_names(&self) -> impl Iterator<Item = &str> {
        self.constraint_names.iter().map(String::as_str)
    }

    /// Add a batch of named equality constraints.
    ///
    /// If any name is already registered, or appears twice in the batch, no constraints are
    /// added and a [`MarketError::DuplicateConstraint`] error is returned.
    pub fn add_named_constraints(&mut self, constraints: Vec<NamedConstraint>) -> Result<()> {
        let mut new_names = IndexSet::with_capacity(constraints.len());
        for constraint in &constraints {
            if self.constraint_names.contains(&constraint.name)
                || !new_names.insert(constraint.name.as_str())
            {
                return Err(MarketError::DuplicateConstraint(constraint.name.clone()).into());
            }
        }

        for constraint in constraints {
            self.problem
                .add_row(constraint.rhs..=constraint.rhs, constraint.terms);
            self.constraint_names.insert(constraint.name);
        }

        Ok(())
    }

    /// Solve the problem.
    ///
    /// # Arguments
    ///
    /// * `show_solver_output` - Whether HiGHS should print its log to the console
    ///
    /// # Returns
    ///
    /// The optimal flows, or a [`MarketError::SolverNonOptimal`] error.
    pub fn solve(self, show_solver_output: bool) -> Result<Solution<'a>> {
        let mut highs_model = self.problem.optimise(Sense::Minimise);
        highs_model.set_option("output_flag", show_solver_output);
        highs_model.set_option("log_to_console", show_solver_output);

        let solved = highs_model.solve();
        match solved.status() {
            HighsModelStatus::Optimal => {
                let solution = solved.get_solution();
                let columns = solution.columns().to_vec();
                ensure!(
                    columns.len() == self.num_columns,
                    "Solver returned {} columns (expected {})",
                    columns.len(),
                    self.num_columns
                );
                let objective = self
                    .system
                    .iter_flows()
                    .zip(self.flow_vars.values())
                    .map(|((_, flow), run)| {
                        flow.variable_costs
                            .iter()
                            .zip(&columns[run.first_column..])
                            .map(|(cost, value)| cost * value)
                            .sum::<f64>()
                    })
                    .sum();

                Ok(Solution {
                    system: self.system,
                    columns,
                    flow_offsets: offsets(&self.flow_vars),
                    storage_offsets: offsets(&self.storage_vars),
                    objective,
                })
            }
            status => Err(MarketError::SolverNonOptimal(format!("{status:?}")).into()),
        }
    }
}

fn offsets<K: Clone + std::hash::Hash + Eq>(
    runs: &IndexMap<K, VariableRun>,
) -> IndexMap<K, usize> {
    runs.iter()
        .map(|(key, run)| (key.clone(), run.first_column))
        .collect()
}

/// The optimal flows for a dispatch problem
#[derive(Debug, Clone)]
pub struct Solution<'a> {
    system: &'a EnergySystem,
    columns: Vec<f64>,
    flow_offsets: IndexMap<EdgeID, usize>,
    storage_offsets: IndexMap<NodeID, usize>,
    objective: f64,
}

impl Solution<'_> {
    /// The solved value of a flow in every step
    pub fn flow(&self, edge: &EdgeID) -> Option<&[f64]> {
        let offset = *self.flow_offsets.get(edge)?;
        Some(&self.columns[offset..offset + self.system.timesteps()])
    }

    /// The solved storage level of a node in every step
    pub fn storage_level(&self, node: &NodeID) -> Option<&[f64]> {
        let offset = *self.storage_offsets.get(node)?;
        Some(&self.columns[offset..offset + self.system.timesteps()])
    }

    /// Iterate over the flows in the order they were added to the energy system
    pub fn iter_flows(&self) -> impl Iterator<Item = (&EdgeID, &[f64])> {
        let steps = self.system.timesteps();
        self.flow_offsets
            .iter()
            .map(move |(edge, &offset)| (edge, &self.columns[offset..offset + steps]))
    }

    /// The value of the objective function (total variable cost)
    pub fn objective(&self) -> f64 {
        self.objective
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::topology::{Flow, NodeKind};
    use float_cmp::assert_approx_eq;

    /// A source with capacity 5 selling to a sink at a price of 2, and an expensive grid
    fn simple_system(steps: usize) -> EnergySystem {
        let mut system = EnergySystem::new(steps);
        system.add_node("source", NodeKind::Source).unwrap();
        system.add_node("b_el_out", NodeKind::Bus).unwrap();
        system.add_node("s_da", NodeKind::Sink).unwrap();
        system
            .add_flow(
                "source",
                "b_el_out",
                Flow::new(steps)
                    .with_constant_cost(1.0)
                    .with_nominal_value(5.0),
            )
            .unwrap();
        system
            .add_flow("b_el_out", "s_da", Flow::new(steps).with_constant_cost(-2.0))
            .unwrap();
        system
    }

    #[test]
    fn test_solve_simple() {
        let system = simple_system(3);
        let problem = DispatchProblem::new(&system).unwrap();
        let solution = problem.solve(false).unwrap();

        let sell = solution.flow(&EdgeID::new("b_el_out", "s_da")).unwrap();
        for value in sell {
            assert_approx_eq!(f64, *value, 5.0, epsilon = 1e-6);
        }
        assert_approx_eq!(f64, solution.objective(), -15.0, epsilon = 1e-6);
        assert_eq!(solution.iter_flows().count(), 2);
        assert!(solution.flow(&EdgeID::new("s_da", "source")).is_none());
    }

    #[test]
    fn test_add_named_constraints() {
        let system = simple_system(3);
        let mut problem = DispatchProblem::new(&system).unwrap();
        let rows = problem.num_rows();
        let vars = problem
            .flow_variables(&EdgeID::new("b_el_out", "s_da"))
            .unwrap()
            .to_vec();

        let pin = |name: &str, t: usize| NamedConstraint {
            name: name.into(),
            terms: vec![(vars[t], 1.0)],
            rhs: 1.0,
        };
        problem
            .add_named_constraints(vec![pin("cap_0", 0), pin("cap_1", 1)])
            .unwrap();
        assert_eq!(problem.num_rows(), rows + 2);
        assert!(problem.has_constraint("cap_1"));

        // A collision rejects the whole batch
        assert_error!(
            problem.add_named_constraints(vec![pin("cap_2", 2), pin("cap_0", 0)]),
            "A constraint named cap_0 has already been added"
        );
        assert_eq!(problem.num_rows(), rows + 2);
        assert!(!problem.has_constraint("cap_2"));

        // So does a collision within the batch
        assert!(
            problem
                .add_named_constraints(vec![pin("cap_2", 2), pin("cap_2", 2)])
                .is_err()
        );
        assert_eq!(problem.num_rows(), rows + 2);

        let solution = problem.solve(false).unwrap();
        let sell = solution.flow(&EdgeID::new("b_el_out", "s_da")).unwrap();
        assert_approx_eq!(f64, sell[0], 1.0, epsilon = 1e-6);
        assert_approx_eq!(f64, sell[2], 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve_infeasible() {
        let mut system = EnergySystem::new(1);
        system.add_node("source", NodeKind::Source).unwrap();
        system.add_node("b_el_out", NodeKind::Bus).unwrap();
        system.add_node("d_el", NodeKind::Sink).unwrap();
        system
            .add_flow("source", "b_el_out", Flow::new(1).with_nominal_value(1.0))
            .unwrap();
        system
            .add_flow(
                "b_el_out",
                "d_el",
                Flow::new(1).with_nominal_value(1.0).with_fix(vec![2.0]),
            )
            .unwrap();

        let err = DispatchProblem::new(&system)
            .unwrap()
            .solve(false)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MarketError>(),
            Some(MarketError::SolverNonOptimal(_))
        ));
    }
}
