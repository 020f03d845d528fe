use std::path::PathBuf;

use clap::Parser;

use crate::state::TomlStateStore;

#[derive(Parser)]
pub struct StateArgs {
    #[clap(long = "state-path", default_value = "vixen.toml", env = "STATE_PATH")]
    pub path: PathBuf,

    /// Key of this instance's state within the file.
    #[clap(long = "app-id", default_value = "vixen", env = "APP_ID")]
    pub app_id: String,
}

impl StateArgs {
    pub fn store(&self) -> TomlStateStore {
        TomlStateStore::new(self.path.clone(), self.app_id.clone())
    }
}
