//! Installed module discovery and per-model operating limits.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::N6700Error;
use crate::n6700::protocol::Protocol;
use crate::n6700::transport::ScpiTransport;

/// A named output range of a module: maximum voltage and current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRange {
    pub name: String,
    pub voltage: f64,
    pub current: f64,
}

/// Static limits of one power module model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub voltage_max: f64,
    pub current_max: f64,
    pub ovp_max: f64,
    pub ocp_max: f64,
    #[serde(default)]
    pub ranges: Vec<OutputRange>,
}

impl ModuleSpec {
    pub fn new(voltage_max: f64, current_max: f64, ovp_max: f64, ocp_max: f64) -> Self {
        Self {
            voltage_max,
            current_max,
            ovp_max,
            ocp_max,
            ranges: Vec::new(),
        }
    }

    pub fn with_range(mut self, name: &str, voltage: f64, current: f64) -> Self {
        self.ranges.push(OutputRange {
            name: name.to_string(),
            voltage,
            current,
        });
        self
    }
}

/// Model identifier to limits.
///
/// Extended by inserting entries, e.g. from the `[modules]` section of the
/// configuration file. Model names are matched case-insensitively.
#[derive(Debug, Clone)]
pub struct ModuleTable {
    entries: HashMap<String, ModuleSpec>,
}

impl Default for ModuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModuleTable {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Modules this driver has been run against.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        table.insert(
            "N6752A",
            ModuleSpec::new(51.0, 10.2, 55.0, 10.2).with_range("P50V", 50.0, 10.0),
        );
        table.insert(
            "N6751A",
            ModuleSpec::new(51.0, 5.1, 55.0, 5.1).with_range("P50V", 50.0, 5.0),
        );
        table
    }

    pub fn insert(&mut self, model: &str, spec: ModuleSpec) {
        self.entries.insert(Self::key(model), spec);
    }

    pub fn extend<I: IntoIterator<Item = (String, ModuleSpec)>>(&mut self, entries: I) {
        for (model, spec) in entries {
            self.insert(&model, spec);
        }
    }

    pub fn get(&self, model: &str) -> Option<&ModuleSpec> {
        self.entries.get(&Self::key(model))
    }

    pub fn models(&self) -> Vec<&str> {
        let mut models: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        models.sort_unstable();
        models
    }

    /// Look up the limits of `model` installed in `channel`.
    pub fn resolve(&self, channel: usize, model: &str) -> Result<ModuleSpec, N6700Error> {
        self.get(model)
            .cloned()
            .ok_or_else(|| N6700Error::UnknownModule {
                channel,
                model: model.trim().to_string(),
            })
    }

    fn key(model: &str) -> String {
        model.trim().to_ascii_uppercase()
    }
}

/// Number of installed output channels, from `SYST:CHAN?`.
pub fn discover_channel_count<T: ScpiTransport + ?Sized>(
    transport: &mut T,
) -> Result<usize, N6700Error> {
    let command = "SYST:CHAN?";
    let reply = Protocol::query(transport, command)?;
    let count = Protocol::parse_count(command, &reply)?;
    info!("Mainframe reports {count} installed channels");
    Ok(count)
}

/// Query every channel's module model and resolve its limits.
///
/// Fails on the first model missing from `table`.
pub fn discover_module_specs<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    channel_count: usize,
    table: &ModuleTable,
) -> Result<Vec<ModuleSpec>, N6700Error> {
    let mut specs = Vec::with_capacity(channel_count);
    for channel in 0..channel_count {
        let reply = Protocol::query_channel(transport, "SYST:CHAN:MOD?", channel)?;
        let model = Protocol::strip_quotes(&reply);
        debug!("Channel {channel} holds module {model}");
        specs.push(table.resolve(channel, model)?);
    }
    Ok(specs)
}
