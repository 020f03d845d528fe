//! Battery-related CLI arguments.

use clap::Parser;

use crate::quantity::{energy::WattHours, percent::Percent, power::Watts};

#[must_use]
#[derive(Copy, Clone, Parser)]
pub struct BatteryArgs {
    /// Usable battery capacity in watt-hours.
    #[clap(long = "battery-capacity-watt-hours", env = "BATTERY_CAPACITY_WATT_HOURS")]
    pub capacity: WattHours,

    /// Maximum inverter power in watts, also used for charging.
    #[clap(
        long = "max-inverter-power-watts",
        default_value = "5000",
        env = "MAX_INVERTER_POWER_WATTS"
    )]
    pub max_inverter_power: Watts,

    /// Discharging power in watts, capped by the inverter.
    #[clap(long = "discharge-power-watts", default_value = "2000", env = "DISCHARGE_POWER_WATTS")]
    pub discharge_power: Watts,

    /// Minimal state-of-charge percent the battery is allowed to reach.
    #[clap(long = "min-soc-percent", default_value = "20", env = "MIN_SOC_PERCENT")]
    pub min_soc: Percent,
}
