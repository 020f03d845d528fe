use clap::Parser;
use reqwest::Url;

#[derive(Parser)]
pub struct HeartbeatArgs {
    /// Pinged after every successful daily build.
    #[clap(long = "heartbeat-url", env = "HEARTBEAT_URL")]
    pub url: Option<Url>,
}
