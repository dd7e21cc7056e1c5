//! Fixtures for tests
use crate::boundary::{BoundaryData, BoundaryHour};
use crate::price::shape::{DayRange, ShapeRow, ShapeTable};
use crate::price::{HistoricalMean, HistoricalMeans, PriceSynthesizer};
use crate::time::Resolution;
use crate::timeline::MarketTimeline;
use crate::units::MoneyPerEnergy;
use itertools::Itertools;
use rstest::fixture;
use std::fs;
use std::path::Path;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Weekday ranges used by the test shape tables: working days, Saturday and Sunday
const DAY_RANGES: [(u32, u32); 3] = [(1, 5), (6, 6), (7, 7)];

/// Number of hours of boundary data in [`boundary_data`]
const BOUNDARY_HOURS: usize = 48;

/// A positive, varying shape value for a month, weekday range and step of the day
fn shape_value(month: u32, range_index: usize, step: usize, steps_per_day: usize) -> f64 {
    let hour = (step * 24 / steps_per_day) as f64;
    let quarter = (step % (steps_per_day / 24)) as f64;
    20.0 + month as f64 + 5.0 * range_index as f64 + 2.0 * hour + 0.5 * quarter
}

fn shape_rows(steps_per_day: usize) -> Vec<ShapeRow> {
    (1..=12)
        .cartesian_product(DAY_RANGES.iter().enumerate())
        .map(|(month, (range_index, &(first, last)))| ShapeRow {
            month,
            days: DayRange::new(first, last).unwrap(),
            values: (0..steps_per_day)
                .map(|step| shape_value(month, range_index, step, steps_per_day))
                .collect(),
        })
        .collect()
}

fn shape_csv(table: &ShapeTable) -> String {
    let steps = table.resolution().steps_per_day();
    let header = ["month".to_string(), "day".to_string()]
        .into_iter()
        .chain((0..steps).map(|step| format!("s{step}")))
        .join(",");
    let rows = table
        .iter()
        .map(|row| format!("{},{},{}", row.month, row.days, row.values.iter().join(",")));

    itertools::chain([header], rows).join("\n") + "\n"
}

fn boundary_hour(hour: usize) -> BoundaryHour {
    let hour_of_day = hour % 24;
    let daylight = (6..18).contains(&hour_of_day);
    BoundaryHour {
        electricity: 40.0 + (hour_of_day as f64),
        // Peak of exactly 80 at 07:00
        heat: if hour_of_day == 7 {
            80.0
        } else {
            50.0 + (hour_of_day % 5) as f64
        },
        pv_pu: if daylight {
            1.0 - (hour_of_day as f64 - 12.0).abs() / 6.0
        } else {
            0.0
        },
        wind_pu: 0.2 + 0.1 * (hour % 4) as f64,
    }
}

#[fixture]
pub fn day_ahead_shapes() -> ShapeTable {
    ShapeTable::new(Resolution::Hourly, shape_rows(24)).unwrap()
}

#[fixture]
pub fn intraday_shapes() -> ShapeTable {
    ShapeTable::new(Resolution::QuarterHourly, shape_rows(96)).unwrap()
}

#[fixture]
pub fn historical_means() -> HistoricalMeans {
    HistoricalMeans::new(
        [
            (
                2019,
                HistoricalMean {
                    day_ahead: MoneyPerEnergy(37.67),
                    intraday: MoneyPerEnergy(38.43),
                },
            ),
            (
                2020,
                HistoricalMean {
                    day_ahead: MoneyPerEnergy(30.47),
                    intraday: MoneyPerEnergy(31.94),
                },
            ),
        ]
        .into_iter()
        .collect(),
    )
}

/// Two days of boundary data, whose heat demand peaks at 80
#[fixture]
pub fn boundary_data() -> BoundaryData {
    let hours: Vec<_> = (0..BOUNDARY_HOURS).map(boundary_hour).collect();
    BoundaryData::from_hourly(&hours)
}

/// Prices for the first two days of 2020 (both weekdays)
#[fixture]
pub fn market_timeline(
    day_ahead_shapes: ShapeTable,
    intraday_shapes: ShapeTable,
    historical_means: HistoricalMeans,
) -> MarketTimeline {
    let synthesizer = PriceSynthesizer::new(&day_ahead_shapes, &intraday_shapes, &historical_means);
    MarketTimeline::assemble(
        &synthesizer,
        2020,
        Some(MoneyPerEnergy(50.0)),
        None,
        MoneyPerEnergy(40.0),
        MoneyPerEnergy(48.0),
    )
    .unwrap()
    .head(BOUNDARY_HOURS * 4)
}

/// Write a complete model for 2020 into `dir`, simulating the given number of days
pub fn write_model_dir(dir: &Path, days: u32) {
    fs::write(
        dir.join("model.toml"),
        format!(
            "year = 2020\ndays = {days}\nscenarios = [{{ kind = \"baseline\" }}, \
            {{ kind = \"day_ahead_inflated\", factor = 2.0 }}]\npower_plants = [\"coal\", \"pv\"]\n"
        ),
    )
    .unwrap();
    fs::write(dir.join("day_ahead_shapes.csv"), shape_csv(&day_ahead_shapes())).unwrap();
    fs::write(dir.join("intraday_shapes.csv"), shape_csv(&intraday_shapes())).unwrap();
    fs::write(
        dir.join("historical_means.csv"),
        "year,day_ahead,intraday\n2019,37.67,38.43\n2020,30.47,31.94\n",
    )
    .unwrap();
    fs::write(dir.join("future_base_prices.csv"), "year,price\n2020,40.0\n").unwrap();
    fs::write(dir.join("future_peak_prices.csv"), "year,price\n2020,48.0\n").unwrap();

    let boundary = (0..days as usize * 24)
        .map(boundary_hour)
        .map(|hour| {
            format!(
                "{},{},{},{}",
                hour.electricity, hour.heat, hour.pv_pu, hour.wind_pu
            )
        })
        .join("\n");
    fs::write(
        dir.join("boundary.csv"),
        format!("electricity,heat,pv_pu,wind_pu\n{boundary}\n"),
    )
    .unwrap();
}
