use chrono::Local;
use clap::Parser;

use crate::{
    api::{battery::BatteryMonitor, price_feed::PriceFeed},
    cli::{
        battery::BatteryArgs,
        ems::EmsArgs,
        home_assistant::HomeAssistantArgs,
        strategy::StrategyArgs,
    },
    core::planner::Planner,
    prelude::*,
    tables::{build_periods_table, build_prices_table, build_windows_table},
};

#[derive(Parser)]
pub struct PlanArgs {
    #[clap(flatten)]
    pub battery: BatteryArgs,

    #[clap(flatten)]
    pub strategy: StrategyArgs,

    #[clap(flatten)]
    pub ems: EmsArgs,

    #[clap(flatten)]
    pub home_assistant: HomeAssistantArgs,
}

impl PlanArgs {
    pub async fn run(self) -> Result {
        let home_assistant = self.home_assistant.connect(&self.battery)?;
        let (prices, battery) =
            tokio::try_join!(home_assistant.prices.get_prices(), home_assistant.battery.get_state())?;
        let settings = self.strategy.settings(&self.battery);
        let now = Local::now();

        let plan = Planner::builder()
            .today(&prices.today)
            .maybe_tomorrow(prices.tomorrow.as_ref())
            .battery(battery)
            .settings(&settings)
            .now(now)
            .plan()?;
        info!(
            state_of_charge = %battery.state_of_charge,
            is_cross_day = plan.charge_plan.is_cross_day,
            evening_check_at = ?plan.evening_check_at,
            "planned",
        );

        println!("{}", build_prices_table(&prices.today, plan.charge_plan.charge, plan.charge_plan.discharge));
        if let Some(tomorrow) = &prices.tomorrow {
            println!("{}", build_prices_table(tomorrow, plan.charge_plan.charge, plan.charge_plan.discharge));
        }
        println!("{}", build_periods_table(&plan.schema.periods));
        println!("{}", build_windows_table(&self.ems.buffers().derive_windows(&plan.schema, now)));
        Ok(())
    }
}
