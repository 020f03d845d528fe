use std::fmt::{Debug, Display, Formatter};

use crate::quantity::Quantity;

/// Price per unit of energy, in whatever currency and unit the price feed uses.
pub type Rate = Quantity<f64, -1, -1, 1>;

impl Display for Rate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

impl Debug for Rate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}/unit", self.0)
    }
}
