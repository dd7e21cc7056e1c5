//! This module defines various unit types and their conversions.
//!
//! Time series (prices, profiles, flows) are kept as plain `f64` slices for the LP; these types
//! are used for the scalar quantities that come from configuration.

macro_rules! unit_struct {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            derive_more::Add,
            derive_more::Sub,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Create a new instance of the unit type from a f64 value
            pub fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<$name> for $name {
            type Output = Dimensionless;
            fn div(self, rhs: $name) -> Dimensionless {
                Dimensionless(self.0 / rhs.0)
            }
        }
    };
}

/// Represents a dimensionless quantity (efficiencies, factors, per-unit profiles)
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Default,
    derive_more::Add,
    derive_more::Sub,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Dimensionless(pub f64);

impl Dimensionless {
    /// Create a new dimensionless value
    pub fn new(val: f64) -> Self {
        Self(val)
    }

    /// Returns the underlying f64
    pub fn value(self) -> f64 {
        self.0
    }
}

unit_struct!(MoneyPerEnergy, "A price, in EUR/MWh");
unit_struct!(Power, "A power, in kW");
unit_struct!(Energy, "An amount of energy, in kWh");

impl MoneyPerEnergy {
    /// Convert a price in EUR/MWh into EUR/kWh
    pub fn per_kwh(self) -> f64 {
        self.0 / 1000.0
    }
}
