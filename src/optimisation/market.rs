//! Market tradability constraints.
//!
//! Each market only lets some dispatch steps be traded independently. Steps which share one
//! traded quantity form a *trading block*, and every step in a block is constrained to carry the
//! same flow as the block's first step:
//!
//! * Day-ahead: one block per clock hour (4 dispatch steps).
//! * Intraday: every step is traded on its own, so there are no constraints.
//! * Future base: a single block covering the whole horizon.
//! * Future peak: one block per run of consecutive steps with a non-zero price (one per trading
//!   day). All blocks are then linked to the first, so there is one traded quantity for the
//!   whole horizon, and steps with a zero price are pinned to zero flow.
//!
//! The future-peak window is read from the sell flow's costs rather than from the calendar, so
//! it always agrees with the masked price series the costs were built from.
use super::{DispatchProblem, NamedConstraint, Variable};
use crate::error::MarketError;
use crate::market::Market;
use crate::time::DISPATCH_RESOLUTION;
use crate::topology::{EdgeID, MarketEdges};
use anyhow::Result;
use itertools::Itertools;
use log::debug;
use std::ops::Range;

/// Costs with an absolute value at or below this are treated as zero prices.
///
/// The tolerance applies to the sell flow's cost, not to the market price. District sink costs
/// are prices divided by 1000, so a district future-peak price of 1 EUR/MWh or less leaves every
/// step outside the window and pins the whole future-peak flow to zero. Power-plant sink costs
/// are the prices themselves.
pub const ZERO_PRICE_TOLERANCE: f64 = 0.001;

/// The steps of a market's sell flow which must share a flow value, and those pinned to zero
#[derive(Debug, Clone, PartialEq)]
pub struct TradingBlocks {
    /// Consecutive steps carrying the same flow
    pub blocks: Vec<Range<usize>>,
    /// Whether every block must also carry the same flow as the first block
    pub linked: bool,
    /// Steps whose flow must be zero
    pub zero: Vec<usize>,
}

impl TradingBlocks {
    /// Divide the dispatch steps into trading blocks for a market
    ///
    /// # Arguments
    ///
    /// * `market` - The market
    /// * `costs` - The per-step costs of the market's sell flow (only used for future peak)
    pub fn for_market(market: Market, costs: &[f64]) -> Self {
        let steps = costs.len();
        match market {
            Market::DayAhead => {
                let block_len = DISPATCH_RESOLUTION.steps_per_hour();
                Self::unlinked(
                    (0..steps)
                        .step_by(block_len)
                        .map(|start| start..(start + block_len).min(steps))
                        .collect(),
                )
            }
            Market::Intraday => Self::unlinked((0..steps).map(|t| t..t + 1).collect()),
            Market::FutureBase => Self::unlinked(if steps == 0 { vec![] } else { vec![0..steps] }),
            Market::FuturePeak => {
                let mut blocks = Vec::new();
                let mut zero = Vec::new();
                for (active, group) in &(0..steps).chunk_by(|&t| is_active(costs[t])) {
                    if active {
                        let group: Vec<_> = group.collect();
                        blocks.push(group[0]..group[group.len() - 1] + 1);
                    } else {
                        zero.extend(group);
                    }
                }

                Self {
                    blocks,
                    linked: true,
                    zero,
                }
            }
        }
    }

    fn unlinked(blocks: Vec<Range<usize>>) -> Self {
        Self {
            blocks,
            linked: false,
            zero: Vec::new(),
        }
    }

    /// Build the named equality constraints for the blocks.
    ///
    /// Names are `{market}_{t}={t0}` for a step tied to another step and `{market}_null_{t}`
    /// for a step pinned to zero.
    pub fn to_constraints(&self, market: Market, vars: &[Variable]) -> Vec<NamedConstraint> {
        let tie = |t: usize, t0: usize| NamedConstraint {
            name: format!("{market}_{t}={t0}"),
            terms: vec![(vars[t], 1.0), (vars[t0], -1.0)],
            rhs: 0.0,
        };

        let mut constraints = Vec::new();
        for block in &self.blocks {
            constraints.extend(block.clone().skip(1).map(|t| tie(t, block.start)));
        }
        if let (true, Some((first, rest))) = (self.linked, self.blocks.split_first()) {
            constraints.extend(rest.iter().map(|block| tie(block.start, first.start)));
        }
        constraints.extend(self.zero.iter().map(|&t| NamedConstraint {
            name: format!("{market}_null_{t}"),
            terms: vec![(vars[t], 1.0)],
            rhs: 0.0,
        }));

        constraints
    }
}

fn is_active(cost: f64) -> bool {
    cost.abs() > ZERO_PRICE_TOLERANCE
}

/// Add tradability constraints for each market's sell flow.
///
/// Every market's sell flow is looked up before any constraint is added, so if one is missing
/// the problem is left unchanged and a [`MarketError::EdgeNotFound`] error is returned.
pub fn apply_market_constraints(
    problem: &mut DispatchProblem,
    market_edges: &MarketEdges,
) -> Result<()> {
    let mut resolved = Vec::with_capacity(market_edges.len());
    for (&market, edge) in market_edges {
        let (Some(vars), Some(costs)) = (problem.flow_variables(edge), problem.variable_costs(edge))
        else {
            return Err(MarketError::EdgeNotFound(edge.clone()).into());
        };
        resolved.push((market, edge, vars, costs));
    }

    let mut constraints = Vec::new();
    for (market, edge, vars, costs) in resolved {
        let blocks = TradingBlocks::for_market(market, costs);
        let market_constraints = blocks.to_constraints(market, vars);
        log_blocks(market, edge, &blocks, market_constraints.len());
        constraints.extend(market_constraints);
    }

    problem.add_named_constraints(constraints)
}

fn log_blocks(market: Market, edge: &EdgeID, blocks: &TradingBlocks, num_constraints: usize) {
    debug!(
        "{market} ({edge}): {} trading blocks, {} steps pinned to zero, {num_constraints} constraints",
        blocks.blocks.len(),
        blocks.zero.len()
    );
}
