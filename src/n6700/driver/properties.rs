//! Access to channel properties by [`Attribute`], for front ends that
//! pick the property at runtime.

use serde::Serialize;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

use super::N6700;
use crate::error::N6700Error;
use crate::n6700::address::Channel;
use crate::n6700::cache::{Attribute, CachedValue};
use crate::n6700::transport::ScpiTransport;
use crate::types::{CurrentLimitBehavior, OutputDelay, SlewRate, TriggerSource, parse_option};

/// Snapshot of every property of one channel.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub name: String,
    pub index: usize,
    pub voltage_max: f64,
    pub properties: BTreeMap<&'static str, CachedValue>,
}

fn parse_number(attribute: Attribute, value: &str) -> Result<f64, N6700Error> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| N6700Error::unsupported(attribute.name(), value))
}

fn parse_flag(attribute: Attribute, value: &str) -> Result<bool, N6700Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "yes" => Ok(true),
        "0" | "off" | "false" | "no" => Ok(false),
        _ => Err(N6700Error::unsupported(attribute.name(), value)),
    }
}

impl<T: ScpiTransport> N6700<T> {
    /// Read any cached property.
    pub fn get_property(
        &mut self,
        channel: impl Into<Channel>,
        attribute: Attribute,
    ) -> Result<CachedValue, N6700Error> {
        let index = self.addresses.resolve(channel)?;
        let value = match attribute {
            Attribute::CurrentLimit => self.get_current_limit(index)?.into(),
            Attribute::CurrentLimitBehavior => self.get_current_limit_behavior(index)?.into(),
            Attribute::Enabled => self.get_enabled(index)?.into(),
            Attribute::OvpEnabled => self.get_ovp_enabled(index)?.into(),
            Attribute::OvpLimit => self.get_ovp_limit(index)?.into(),
            Attribute::VoltageLevel => self.get_voltage_level(index)?.into(),
            Attribute::SlewRate => self.get_slew_rate(index)?.into(),
            Attribute::TurnOnDelay => self.get_turn_on_delay(index)?.into(),
            Attribute::TurnOffDelay => self.get_turn_off_delay(index)?.into(),
            Attribute::TriggerSource => self.get_trigger_source(index)?.into(),
            Attribute::TriggeredVoltageLevel => self.get_triggered_voltage_level(index)?.into(),
            Attribute::TriggeredCurrentLimit => self.get_triggered_current_limit(index)?.into(),
            Attribute::OcpEnabled => self.get_ocp_enabled(index)?.into(),
        };
        Ok(value)
    }

    /// Write any property from its textual form, e.g. `"12.5"`, `"trip"`,
    /// `"on"`, `"max"` or `"TTL3"`.
    pub fn set_property(
        &mut self,
        channel: impl Into<Channel>,
        attribute: Attribute,
        value: &str,
    ) -> Result<(), N6700Error> {
        let index = self.addresses.resolve(channel)?;
        match attribute {
            Attribute::CurrentLimit => {
                self.set_current_limit(index, parse_number(attribute, value)?)
            }
            Attribute::CurrentLimitBehavior => {
                let behavior: CurrentLimitBehavior = parse_option("current limit behavior", value)?;
                self.set_current_limit_behavior(index, behavior)
            }
            Attribute::Enabled => self.set_enabled(index, parse_flag(attribute, value)?),
            Attribute::OvpEnabled => self.set_ovp_enabled(index, parse_flag(attribute, value)?),
            Attribute::OvpLimit => self.set_ovp_limit(index, parse_number(attribute, value)?),
            Attribute::VoltageLevel => {
                self.set_voltage_level(index, parse_number(attribute, value)?)
            }
            Attribute::SlewRate => {
                let rate: SlewRate = value.parse()?;
                self.set_slew_rate(index, rate)
            }
            Attribute::TurnOnDelay => {
                let delay: OutputDelay = value.parse()?;
                self.set_turn_on_delay(index, delay)
            }
            Attribute::TurnOffDelay => {
                let delay: OutputDelay = value.parse()?;
                self.set_turn_off_delay(index, delay)
            }
            Attribute::TriggerSource => {
                let source: TriggerSource = parse_option("trigger source", value)?;
                self.set_trigger_source(index, source)
            }
            Attribute::TriggeredVoltageLevel => {
                self.set_triggered_voltage_level(index, parse_number(attribute, value)?)
            }
            Attribute::TriggeredCurrentLimit => {
                self.set_triggered_current_limit(index, parse_number(attribute, value)?)
            }
            Attribute::OcpEnabled => self.set_ocp_enabled(index, parse_flag(attribute, value)?),
        }
    }

    /// Read every property of a channel. Uncached values are queried.
    pub fn channel_status(
        &mut self,
        channel: impl Into<Channel>,
    ) -> Result<ChannelStatus, N6700Error> {
        let index = self.addresses.resolve(channel)?;
        let mut properties = BTreeMap::new();
        for attribute in Attribute::iter() {
            properties.insert(attribute.name(), self.get_property(index, attribute)?);
        }
        Ok(ChannelStatus {
            name: self.addresses.name(index).unwrap_or_default().to_string(),
            index,
            voltage_max: self.specs[index].voltage_max,
            properties,
        })
    }
}
