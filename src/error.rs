//! Failure kinds raised by the market model.
//!
//! These are fatal for whatever they occur in (a price series, a scenario). They travel inside
//! [`anyhow::Error`] and can be recovered with `downcast_ref::<MarketError>()`.
use crate::market::Market;
use crate::topology::EdgeID;
use thiserror::Error;

/// A failure in price synthesis, timeline assembly, constraint generation or solving
#[derive(Debug, Error, PartialEq)]
pub enum MarketError {
    /// No shape table row covers the given month and weekday
    #[error("No price shape found for month {month}, weekday {weekday}")]
    ShapeNotFound {
        /// Calendar month (1-12)
        month: u32,
        /// ISO weekday (1 = Monday)
        weekday: u32,
    },
    /// More than one shape table row covers the given month and weekday
    #[error("{matches} price shapes match month {month}, weekday {weekday}")]
    ShapeAmbiguous {
        /// Calendar month (1-12)
        month: u32,
        /// ISO weekday (1 = Monday)
        weekday: u32,
        /// The number of matching rows
        matches: usize,
    },
    /// No target mean was given and there is no historical mean for the year
    #[error("No historical {market} mean price for {year} and no target mean was given")]
    MissingMean {
        /// The requested year
        year: u32,
        /// The market being synthesised
        market: Market,
    },
    /// No future contract price was given and there is none in the price tables
    #[error("No {market} price for {year} and no explicit price was given")]
    MissingFuturePrice {
        /// The requested year
        year: u32,
        /// The futures market
        market: Market,
    },
    /// A market series does not line up with the dispatch timeline
    #[error("{market} series has {found} steps but the dispatch timeline has {expected}")]
    Alignment {
        /// The misaligned market
        market: Market,
        /// Length of the dispatch timeline
        expected: usize,
        /// Length of the market series
        found: usize,
    },
    /// The market's sell flow is not part of the model
    #[error("Flow {0} not found in the model")]
    EdgeNotFound(EdgeID),
    /// A named constraint would overwrite one already registered
    #[error("A constraint named {0} has already been added")]
    DuplicateConstraint(String),
    /// The solver finished without an optimal solution
    #[error("Could not solve: {0}")]
    SolverNonOptimal(String),
}
