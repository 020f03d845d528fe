use chrono::TimeDelta;

use crate::quantity::{energy::WattHours, percent::Percent, power::Watts};

/// Live battery state, read right before it is needed and never persisted.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BatteryState {
    pub state_of_charge: Percent,
    pub capacity: WattHours,
    pub max_inverter_power: Watts,
}

impl BatteryState {
    /// Shortest discharge worth scheduling, in hours.
    const MIN_DISCHARGE_HOURS: f64 = 0.25;

    /// Longest discharge ever scheduled, in hours.
    const MAX_DISCHARGE_HOURS: f64 = 3.0;

    /// Time to charge to full at the maximum inverter power, rounded up to whole minutes.
    ///
    /// Anything short of full charge needs at least the buffer.
    pub fn required_charge_time(&self, min_buffer: TimeDelta) -> TimeDelta {
        if self.state_of_charge >= Percent::FULL || self.max_inverter_power <= Watts::ZERO {
            return TimeDelta::zero();
        }
        let missing = self.capacity * (Percent::FULL - self.state_of_charge);
        #[expect(clippy::cast_possible_truncation)]
        let minutes = TimeDelta::minutes((missing / self.max_inverter_power * 60.0).ceil() as i64);
        minutes.max(min_buffer)
    }

    /// Time to discharge down to the target at the given power, between 15 minutes and 3 hours.
    ///
    /// Zero when already at or below the target.
    pub fn discharge_duration(&self, target: Percent, power: Watts) -> TimeDelta {
        if self.state_of_charge <= target || power <= Watts::ZERO {
            return TimeDelta::zero();
        }
        let hours = (self.capacity * (self.state_of_charge - target) / power)
            .clamp(Self::MIN_DISCHARGE_HOURS, Self::MAX_DISCHARGE_HOURS);
        #[expect(clippy::cast_possible_truncation)]
        TimeDelta::minutes((hours * 60.0).round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battery(state_of_charge: f64) -> BatteryState {
        BatteryState {
            state_of_charge: Percent::from(state_of_charge),
            capacity: WattHours::from(10_000.0),
            max_inverter_power: Watts::from(5000.0),
        }
    }

    #[test]
    fn test_required_charge_time() {
        // 50% of 10 kWh at 5 kW:
        assert_eq!(battery(50.0).required_charge_time(TimeDelta::minutes(15)), TimeDelta::hours(1));
    }

    #[test]
    fn test_required_charge_time_rounds_up() {
        // 7.3% of 10 kWh at 5 kW is 8.76 minutes:
        assert_eq!(battery(92.7).required_charge_time(TimeDelta::zero()), TimeDelta::minutes(9));
    }

    #[test]
    fn test_required_charge_time_buffer() {
        assert_eq!(
            battery(99.0).required_charge_time(TimeDelta::minutes(15)),
            TimeDelta::minutes(15),
        );
        assert_eq!(battery(100.0).required_charge_time(TimeDelta::minutes(15)), TimeDelta::zero());
    }

    #[test]
    fn test_discharge_duration() {
        // 40% of 10 kWh at 2 kW is 2 hours:
        assert_eq!(
            battery(70.0).discharge_duration(Percent::from(30.0), Watts::from(2000.0)),
            TimeDelta::hours(2),
        );
    }

    #[test]
    fn test_discharge_duration_is_clamped() {
        assert_eq!(
            battery(31.0).discharge_duration(Percent::from(30.0), Watts::from(5000.0)),
            TimeDelta::minutes(15),
        );
        assert_eq!(
            battery(100.0).discharge_duration(Percent::from(0.0), Watts::from(500.0)),
            TimeDelta::hours(3),
        );
        assert_eq!(
            battery(30.0).discharge_duration(Percent::from(30.0), Watts::from(2000.0)),
            TimeDelta::zero(),
        );
    }
}
