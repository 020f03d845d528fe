mod battery;
mod burrow;
mod ems;
mod foxess;
mod heartbeat;
mod home_assistant;
mod plan;
mod run;
mod state;
mod strategy;

use clap::{Parser, Subcommand};

use crate::cli::{burrow::BurrowArgs, plan::PlanArgs, run::RunArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: plan every day, switch the EMS around the periods, and apply the schedule.
    #[clap(name = "run")]
    Run(Box<RunArgs>),

    /// Fetch the prices and the battery state, plan the day, and print it without applying.
    #[clap(name = "plan")]
    Plan(Box<PlanArgs>),

    /// Development tools.
    #[clap(name = "burrow")]
    Burrow(Box<BurrowArgs>),
}

impl Command {
    pub async fn run(self) -> crate::prelude::Result {
        match self {
            Self::Run(args) => args.run().await,
            Self::Plan(args) => args.run().await,
            Self::Burrow(args) => args.run().await,
        }
    }
}
