use clap::{Parser, Subcommand};

use crate::{
    api::foxess::work_mode,
    cli::foxess::FoxEssApiArgs,
    prelude::*,
    quantity::Quantity,
    tables::build_time_slot_sequence_table,
};

#[derive(Parser)]
pub struct BurrowArgs {
    #[clap(flatten)]
    pub fox_ess_api: FoxEssApiArgs,

    #[command(subcommand)]
    pub command: BurrowCommand,
}

#[derive(Subcommand)]
pub enum BurrowCommand {
    /// Get the schedule currently stored by FoxESS Cloud.
    Schedule,

    /// Get the work mode setting, as is and as understood.
    Mode,
}

impl BurrowArgs {
    pub async fn run(self) -> Result {
        let Some(api) = self.fox_ess_api.try_new_api(Quantity::ZERO)? else {
            bail!("FoxESS Cloud API key and serial number are required");
        };
        match self.command {
            BurrowCommand::Schedule => {
                let schedule = api.get_schedule().await?;
                info!(is_enabled = schedule.is_enabled, n_groups = schedule.groups.len(), "gotcha");
                println!("{}", build_time_slot_sequence_table(&schedule.groups));
            }
            BurrowCommand::Mode => {
                let raw = api.get_work_mode().await?;
                info!(raw = %raw, mode = %work_mode::parse(&raw), "gotcha");
            }
        }
        Ok(())
    }
}
