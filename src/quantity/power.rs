use std::{
    fmt::{Debug, Display, Formatter},
    ops::Mul,
};

use chrono::TimeDelta;

use crate::quantity::{Quantity, energy::WattHours};

pub type Watts = Quantity<f64, 1, 0, 0>;

impl Watts {
    /// Whole watts, as vendor APIs expect them.
    #[expect(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn round_u32(self) -> u32 {
        self.0.max(0.0).round() as u32
    }
}

impl Display for Watts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0} W", self.0)
    }
}

impl Debug for Watts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}W", self.0)
    }
}

impl Mul<TimeDelta> for Watts {
    type Output = WattHours;

    fn mul(self, rhs: TimeDelta) -> Self::Output {
        let hours = rhs.as_seconds_f64() / 3600.0;
        Quantity(self.0 * hours)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_mul_time_delta() {
        assert_abs_diff_eq!((Watts::from(1000.0) * TimeDelta::minutes(90)).0, 1500.0);
    }

    #[test]
    fn test_round_u32() {
        assert_eq!(Watts::from(1199.6).round_u32(), 1200);
        assert_eq!(Watts::from(-5.0).round_u32(), 0);
    }
}
