//! Code for adding the physical constraints of the energy system to the dispatch problem.
use super::{DispatchProblem, Variable};
use crate::topology::{EnergySystem, NodeID, NodeKind, StorageParams};

/// Iterate over the storage nodes of an energy system
pub fn iter_storage(system: &EnergySystem) -> impl Iterator<Item = (&NodeID, &StorageParams)> {
    system.iter_nodes().filter_map(|(id, kind)| match kind {
        NodeKind::Storage(params) => Some((id, params)),
        _ => None,
    })
}

/// Add balance constraints for buses, conversion constraints for transformers and level
/// constraints for storage nodes.
///
/// These are unnamed: only market constraints go in the named registry.
pub fn add_physical_constraints(dispatch: &mut DispatchProblem) {
    let system = dispatch.system;
    for (id, kind) in system.iter_nodes() {
        match kind {
            NodeKind::Bus => add_bus_balance_constraints(dispatch, id),
            NodeKind::Transformer { conversion_factors } => {
                let input = system.inputs(id).next().expect("Transformer has one input");
                let input_vars = flow_vars(dispatch, input);
                for (output, factor) in conversion_factors {
                    let output_edge = system
                        .outputs(id)
                        .find(|edge| &edge.sink == output)
                        .expect("Transformer has an output for each conversion factor");
                    let output_vars = flow_vars(dispatch, output_edge);

                    // output = factor * input
                    for (&out_var, &in_var) in output_vars.iter().zip(&input_vars) {
                        dispatch
                            .problem
                            .add_row(0.0..=0.0, [(out_var, 1.0), (in_var, -factor)]);
                    }
                }
            }
            NodeKind::Storage(params) => add_storage_constraints(dispatch, id, params),
            NodeKind::Source | NodeKind::Sink => {}
        }
    }
}

fn flow_vars(dispatch: &DispatchProblem, edge: &crate::topology::EdgeID) -> Vec<Variable> {
    dispatch
        .flow_variables(edge)
        .expect("Every flow has variables")
        .to_vec()
}

/// Inflows minus outflows is zero in every step
fn add_bus_balance_constraints(dispatch: &mut DispatchProblem, bus: &NodeID) {
    let system = dispatch.system;
    let inputs: Vec<_> = system
        .inputs(bus)
        .map(|edge| flow_vars(dispatch, edge))
        .collect();
    let outputs: Vec<_> = system
        .outputs(bus)
        .map(|edge| flow_vars(dispatch, edge))
        .collect();
    if inputs.is_empty() && outputs.is_empty() {
        return;
    }

    let mut terms = Vec::with_capacity(inputs.len() + outputs.len());
    for t in 0..system.timesteps() {
        terms.extend(inputs.iter().map(|vars| (vars[t], 1.0)));
        terms.extend(outputs.iter().map(|vars| (vars[t], -1.0)));
        dispatch.problem.add_row(0.0..=0.0, terms.drain(..));
    }
}

/// level[t] = level[t-1] * (1 - loss) + inflow[t] * eta_in - outflow[t] / eta_out
///
/// The level before the first step is the initial level times the capacity.
fn add_storage_constraints(dispatch: &mut DispatchProblem, node: &NodeID, params: &StorageParams) {
    let system = dispatch.system;
    let inflow = system.inputs(node).next().expect("Storage has one input");
    let outflow = system.outputs(node).next().expect("Storage has one output");
    let inflow = flow_vars(dispatch, inflow);
    let outflow = flow_vars(dispatch, outflow);
    let levels = dispatch
        .storage_variables(node)
        .expect("Every storage node has level variables")
        .to_vec();

    let retention = 1.0 - params.loss_rate;
    let initial = params.initial_level * params.capacity * retention;
    for t in 0..system.timesteps() {
        let mut terms = vec![
            (levels[t], 1.0),
            (inflow[t], -params.inflow_efficiency),
            (outflow[t], 1.0 / params.outflow_efficiency),
        ];
        let rhs = if t == 0 {
            initial
        } else {
            terms.push((levels[t - 1], -retention));
            0.0
        };
        dispatch.problem.add_row(rhs..=rhs, terms);
    }
}
