use std::sync::Arc;

use clap::Parser;

use crate::{
    api::battery::BatteryControl,
    cli::{
        battery::BatteryArgs,
        ems::EmsArgs,
        foxess::FoxEssApiArgs,
        heartbeat::HeartbeatArgs,
        home_assistant::HomeAssistantArgs,
        state::StateArgs,
        strategy::StrategyArgs,
    },
    daemon::Daemon,
    prelude::*,
};

#[derive(Parser)]
pub struct RunArgs {
    /// Log the schedule instead of touching the gateway and the EMS switch.
    #[clap(long, env = "SIMULATE")]
    pub simulate: bool,

    #[clap(flatten)]
    pub battery: BatteryArgs,

    #[clap(flatten)]
    pub strategy: StrategyArgs,

    #[clap(flatten)]
    pub ems: EmsArgs,

    #[clap(flatten)]
    pub home_assistant: HomeAssistantArgs,

    #[clap(flatten)]
    pub fox_ess_api: FoxEssApiArgs,

    #[clap(flatten)]
    pub state: StateArgs,

    #[clap(flatten)]
    pub heartbeat: HeartbeatArgs,
}

impl RunArgs {
    pub async fn run(self) -> Result {
        let home_assistant = self.home_assistant.connect(&self.battery)?;
        let control = self
            .fox_ess_api
            .try_new_api(self.battery.min_soc)?
            .map(|api| Arc::new(api) as Arc<dyn BatteryControl>);
        if self.simulate {
            info!("simulating, the gateway and the EMS switch stay untouched");
        }
        let daemon = Daemon::builder()
            .settings(self.strategy.settings(&self.battery))
            .options(self.ems.options(self.simulate))
            .prices(Arc::new(home_assistant.prices))
            .battery(Arc::new(home_assistant.battery))
            .maybe_control(control)
            .ems_switch(Arc::new(home_assistant.ems_switch))
            .status(Arc::new(home_assistant.status))
            .store(Arc::new(self.state.store()))
            .maybe_heartbeat_url(self.heartbeat.url)
            .build();
        Arc::new(daemon).run().await
    }
}
