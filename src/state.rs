//! Persisted prepared and applied schemas, keyed by the app identifier.

use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    core::{mode::UserMode, schema::ChargingSchema},
    prelude::*,
};

pub trait StateStore: Send + Sync {
    /// Prepared schema for the date, a schema prepared for another date is treated as absent.
    fn load_prepared(&self, on: NaiveDate) -> Result<Option<ChargingSchema>>;

    fn save_prepared(&self, on: NaiveDate, schema: &ChargingSchema) -> Result;

    /// The last schema successfully sent to the gateway.
    fn load_applied(&self) -> Result<Option<ChargingSchema>>;

    fn save_applied(&self, schema: &ChargingSchema) -> Result;

    fn save_last_known_mode(&self, mode: UserMode) -> Result;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct AppState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prepared: Option<Prepared>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    applied: Option<ChargingSchema>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_known_mode: Option<UserMode>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Prepared {
    date: NaiveDate,
    schema: ChargingSchema,
}

/// TOML file shared by possibly several apps, each under its own table.
pub struct TomlStateStore {
    path: PathBuf,
    app_id: String,
    lock: Mutex<()>,
}

impl TomlStateStore {
    pub const fn new(path: PathBuf, app_id: String) -> Self {
        Self { path, app_id, lock: Mutex::new(()) }
    }

    fn read_all(&self) -> Result<BTreeMap<String, AppState>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => toml::from_str(&text)
                .with_context(|| format!("failed to parse `{}`", self.path.display())),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(error) => {
                Err(error).with_context(|| format!("failed to read `{}`", self.path.display()))
            }
        }
    }

    fn read(&self) -> Result<AppState> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_all()?.remove(&self.app_id).unwrap_or_default())
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(path = %self.path.display()))]
    fn update(&self, mutate: impl FnOnce(&mut AppState)) -> Result {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut states = self.read_all()?;
        mutate(states.entry(self.app_id.clone()).or_default());
        let text = toml::to_string_pretty(&states).context("failed to serialize the state")?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write `{}`", self.path.display()))?;
        debug!("saved");
        Ok(())
    }
}

impl StateStore for TomlStateStore {
    fn load_prepared(&self, on: NaiveDate) -> Result<Option<ChargingSchema>> {
        Ok(self.read()?.prepared.and_then(|prepared| {
            if prepared.date == on {
                Some(prepared.schema)
            } else {
                info!(date = %prepared.date, "ignoring a stale prepared schema");
                None
            }
        }))
    }

    fn save_prepared(&self, on: NaiveDate, schema: &ChargingSchema) -> Result {
        let schema = schema.clone();
        self.update(|state| state.prepared = Some(Prepared { date: on, schema }))
    }

    fn load_applied(&self) -> Result<Option<ChargingSchema>> {
        Ok(self.read()?.applied)
    }

    fn save_applied(&self, schema: &ChargingSchema) -> Result {
        let schema = schema.clone();
        self.update(|state| state.applied = Some(schema))
    }

    fn save_last_known_mode(&self, mode: UserMode) -> Result {
        self.update(|state| state.last_known_mode = Some(mode))
    }
}
