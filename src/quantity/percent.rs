use std::fmt::{Debug, Display, Formatter};

use crate::quantity::Quantity;

/// State-of-charge and other percentages, `0.0..=100.0`.
pub type Percent = Quantity<f64, 0, 0, 0>;

impl Percent {
    pub const FULL: Self = Self(100.0);

    pub const fn to_proportion(self) -> f64 {
        0.01 * self.0
    }
}

impl Display for Percent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} %", self.0)
    }
}

impl Debug for Percent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}
