use std::{
    fmt::{Debug, Display, Formatter},
    ops::{Div, Mul},
};

use chrono::TimeDelta;

use crate::quantity::{Quantity, percent::Percent, power::Watts};

pub type WattHours = Quantity<f64, 1, 1, 0>;

impl Display for WattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0} Wh", self.0)
    }
}

impl Debug for WattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}Wh", self.0)
    }
}

impl Mul<Percent> for WattHours {
    type Output = Self;

    fn mul(self, rhs: Percent) -> Self::Output {
        Quantity(self.0 * rhs.to_proportion())
    }
}

/// Time needed to move the energy at the given power, in fractional hours.
impl Div<Watts> for WattHours {
    type Output = f64;

    fn div(self, rhs: Watts) -> Self::Output {
        self.0 / rhs.0
    }
}

impl Div<TimeDelta> for WattHours {
    type Output = Watts;

    fn div(self, rhs: TimeDelta) -> Self::Output {
        let hours = rhs.as_seconds_f64() / 3600.0;
        Quantity(self.0 / hours)
    }
}
