//! Merging the four market price series onto the dispatch timeline.
use crate::error::MarketError;
use crate::market::{Market, is_future_peak_window};
use crate::price::{PriceSeries, PriceSynthesizer};
use crate::time::{DISPATCH_RESOLUTION, Timeline};
use crate::units::MoneyPerEnergy;
use anyhow::{Result, ensure};
use std::collections::BTreeMap;
use std::iter;

/// Future contract prices, keyed by year
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuturePrices {
    base: BTreeMap<u32, MoneyPerEnergy>,
    peak: BTreeMap<u32, MoneyPerEnergy>,
}

impl FuturePrices {
    /// Create a new set of future price tables
    pub fn new(base: BTreeMap<u32, MoneyPerEnergy>, peak: BTreeMap<u32, MoneyPerEnergy>) -> Self {
        Self { base, peak }
    }

    /// Look up the tabulated price for a futures market in a year
    pub fn get(&self, year: u32, market: Market) -> Option<MoneyPerEnergy> {
        match market {
            Market::FutureBase => self.base.get(&year).copied(),
            Market::FuturePeak => self.peak.get(&year).copied(),
            Market::DayAhead | Market::Intraday => None,
        }
    }

    /// Use the explicit price if there is one, otherwise look it up
    pub fn resolve(
        &self,
        year: u32,
        market: Market,
        explicit: Option<MoneyPerEnergy>,
    ) -> Result<MoneyPerEnergy, MarketError> {
        explicit
            .or_else(|| self.get(year, market))
            .ok_or(MarketError::MissingFuturePrice { year, market })
    }
}

/// Repeat each value `factor` times
pub fn upsample(values: &[f64], factor: usize) -> Vec<f64> {
    values
        .iter()
        .flat_map(|&value| iter::repeat_n(value, factor))
        .collect()
}

/// Prices for all four markets with one value per dispatch step
#[derive(Debug, Clone, PartialEq)]
pub struct MarketTimeline {
    timeline: Timeline,
    day_ahead: Vec<f64>,
    intraday: Vec<f64>,
    future_base: Vec<f64>,
    future_peak: Vec<f64>,
}

impl MarketTimeline {
    /// Synthesise and merge the prices for all four markets for a calendar year.
    ///
    /// # Arguments
    ///
    /// * `synthesizer` - Source of day-ahead and intraday prices
    /// * `year` - The calendar year
    /// * `day_ahead_mean` - Target mean for day-ahead prices (historical mean if `None`)
    /// * `intraday_mean` - Target mean for intraday prices (historical mean if `None`)
    /// * `future_base_price` - The future-base contract price
    /// * `future_peak_price` - The future-peak contract price
    pub fn assemble(
        synthesizer: &PriceSynthesizer,
        year: u32,
        day_ahead_mean: Option<MoneyPerEnergy>,
        intraday_mean: Option<MoneyPerEnergy>,
        future_base_price: MoneyPerEnergy,
        future_peak_price: MoneyPerEnergy,
    ) -> Result<Self> {
        let day_ahead = synthesizer.synthesize(year, Market::DayAhead, day_ahead_mean)?;
        let intraday = synthesizer.synthesize(year, Market::Intraday, intraday_mean)?;
        let timeline = Timeline::for_year(year, DISPATCH_RESOLUTION)?;

        Self::from_series(
            timeline,
            &day_ahead,
            intraday,
            future_base_price,
            future_peak_price,
        )
    }

    /// Merge synthesised series and contract prices onto a dispatch timeline.
    ///
    /// Day-ahead prices are repeated across each hour's dispatch steps. Intraday prices must
    /// already be at dispatch resolution. The future-base price applies to every step and the
    /// future-peak price only to steps in the peak window, with zero elsewhere. Any series whose
    /// length differs from the timeline's is an [`MarketError::Alignment`] error.
    pub fn from_series(
        timeline: Timeline,
        day_ahead: &PriceSeries,
        intraday: PriceSeries,
        future_base_price: MoneyPerEnergy,
        future_peak_price: MoneyPerEnergy,
    ) -> Result<Self> {
        ensure!(
            timeline.resolution() == DISPATCH_RESOLUTION,
            "Market timeline must be at dispatch resolution"
        );
        ensure!(
            day_ahead.timeline().start() == timeline.start()
                && intraday.timeline().start() == timeline.start(),
            "Price series must start at the beginning of the dispatch timeline"
        );

        let factor = DISPATCH_RESOLUTION.steps_per_hour()
            / day_ahead.timeline().resolution().steps_per_hour();
        let day_ahead = upsample(day_ahead.values(), factor);
        check_alignment(Market::DayAhead, &timeline, day_ahead.len())?;
        check_alignment(Market::Intraday, &timeline, intraday.len())?;

        let future_base = vec![future_base_price.value(); timeline.len()];
        let future_peak = timeline
            .iter()
            .map(|instant| {
                if is_future_peak_window(instant) {
                    future_peak_price.value()
                } else {
                    0.0
                }
            })
            .collect();

        Ok(Self {
            timeline,
            day_ahead,
            intraday: intraday.into_values(),
            future_base,
            future_peak,
        })
    }

    /// The dispatch timeline the prices apply to
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// The number of dispatch steps
    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    /// Whether there are no dispatch steps
    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    /// The prices for a market
    pub fn get(&self, market: Market) -> &[f64] {
        match market {
            Market::DayAhead => &self.day_ahead,
            Market::Intraday => &self.intraday,
            Market::FutureBase => &self.future_base,
            Market::FuturePeak => &self.future_peak,
        }
    }

    fn get_mut(&mut self, market: Market) -> &mut Vec<f64> {
        match market {
            Market::DayAhead => &mut self.day_ahead,
            Market::Intraday => &mut self.intraday,
            Market::FutureBase => &mut self.future_base,
            Market::FuturePeak => &mut self.future_peak,
        }
    }

    /// Multiply every price for a market by `factor`
    pub fn scale(&mut self, market: Market, factor: f64) {
        for price in self.get_mut(market) {
            *price *= factor;
        }
    }

    /// The prices for the first `steps` dispatch steps only
    pub fn head(&self, steps: usize) -> Self {
        let timeline = self.timeline.head(steps);
        let len = timeline.len();

        Self {
            timeline,
            day_ahead: self.day_ahead[..len].to_vec(),
            intraday: self.intraday[..len].to_vec(),
            future_base: self.future_base[..len].to_vec(),
            future_peak: self.future_peak[..len].to_vec(),
        }
    }
}

fn check_alignment(market: Market, timeline: &Timeline, found: usize) -> Result<(), MarketError> {
    if found == timeline.len() {
        Ok(())
    } else {
        Err(MarketError::Alignment {
            market,
            expected: timeline.len(),
            found,
        })
    }
}
