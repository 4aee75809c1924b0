use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::N6700Error;

/// Parse a caller-supplied option name, mapping unknown names to
/// [`N6700Error::UnsupportedValue`].
pub fn parse_option<T: FromStr>(kind: &'static str, value: &str) -> Result<T, N6700Error> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| N6700Error::unsupported(kind, value))
}

/// What a channel does when its load exceeds the current limit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum CurrentLimitBehavior {
    /// Switch to constant-current regulation.
    Regulate,
    /// Trip the output off (over-current protection).
    Trip,
}

impl CurrentLimitBehavior {
    pub fn trip_enabled(self) -> bool {
        self == CurrentLimitBehavior::Trip
    }
}

impl From<bool> for CurrentLimitBehavior {
    fn from(trip: bool) -> Self {
        if trip {
            CurrentLimitBehavior::Trip
        } else {
            CurrentLimitBehavior::Regulate
        }
    }
}

/// Transient trigger sources understood by the mainframe.
///
/// The `TransientChanN` names are 1-based, matching the front panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum TriggerSource {
    #[strum(serialize = "immediate")]
    Immediate,
    #[strum(serialize = "bus")]
    Bus,
    #[strum(serialize = "external")]
    External,
    #[strum(serialize = "TTL0")]
    Ttl0,
    #[strum(serialize = "TTL1")]
    Ttl1,
    #[strum(serialize = "TTL2")]
    Ttl2,
    #[strum(serialize = "TTL3")]
    Ttl3,
    #[strum(serialize = "TTL4")]
    Ttl4,
    #[strum(serialize = "TTL5")]
    Ttl5,
    #[strum(serialize = "TTL6")]
    Ttl6,
    #[strum(serialize = "TTL7")]
    Ttl7,
    #[strum(serialize = "transient_chan1")]
    TransientChan1,
    #[strum(serialize = "transient_chan2")]
    TransientChan2,
    #[strum(serialize = "transient_chan3")]
    TransientChan3,
    #[strum(serialize = "transient_chan4")]
    TransientChan4,
}

impl TriggerSource {
    /// Instrument token sent with `TRIG:TRAN:SOUR`.
    pub fn scpi_token(self) -> &'static str {
        match self {
            TriggerSource::Immediate => "IMM",
            TriggerSource::Bus => "BUS",
            TriggerSource::External => "EXT",
            TriggerSource::Ttl0 => "PIN1",
            TriggerSource::Ttl1 => "PIN2",
            TriggerSource::Ttl2 => "PIN3",
            TriggerSource::Ttl3 => "PIN4",
            TriggerSource::Ttl4 => "PIN5",
            TriggerSource::Ttl5 => "PIN6",
            TriggerSource::Ttl6 => "PIN7",
            TriggerSource::Ttl7 => "PIN8",
            TriggerSource::TransientChan1 => "TRAN1",
            TriggerSource::TransientChan2 => "TRAN2",
            TriggerSource::TransientChan3 => "TRAN3",
            TriggerSource::TransientChan4 => "TRAN4",
        }
    }

    /// Reverse lookup of an instrument reply such as `BUS` or `pin3`.
    pub fn from_scpi_token(token: &str) -> Option<Self> {
        let token = token.trim();
        TriggerSource::iter().find(|source| source.scpi_token().eq_ignore_ascii_case(token))
    }
}

/// Voltage slew rate, in volts per millisecond.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlewRate {
    VoltsPerMs(f64),
    Min,
    Max,
    Infinite,
}

impl From<f64> for SlewRate {
    fn from(volts_per_ms: f64) -> Self {
        SlewRate::VoltsPerMs(volts_per_ms)
    }
}

impl FromStr for SlewRate {
    type Err = N6700Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" => Ok(SlewRate::Min),
            "max" => Ok(SlewRate::Max),
            "infinite" | "inf" => Ok(SlewRate::Infinite),
            other => other
                .parse::<f64>()
                .map(SlewRate::VoltsPerMs)
                .map_err(|_| N6700Error::unsupported("slew rate", s)),
        }
    }
}

impl fmt::Display for SlewRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlewRate::VoltsPerMs(v) => write!(f, "{v} V/ms"),
            SlewRate::Min => write!(f, "min"),
            SlewRate::Max => write!(f, "max"),
            SlewRate::Infinite => write!(f, "infinite"),
        }
    }
}

/// Turn-on or turn-off delay of an output, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputDelay {
    Seconds(f64),
    Min,
    Max,
}

impl From<f64> for OutputDelay {
    fn from(seconds: f64) -> Self {
        OutputDelay::Seconds(seconds)
    }
}

impl From<std::time::Duration> for OutputDelay {
    fn from(delay: std::time::Duration) -> Self {
        OutputDelay::Seconds(delay.as_secs_f64())
    }
}

impl FromStr for OutputDelay {
    type Err = N6700Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" => Ok(OutputDelay::Min),
            "max" => Ok(OutputDelay::Max),
            other => other
                .parse::<f64>()
                .map(OutputDelay::Seconds)
                .map_err(|_| N6700Error::unsupported("output delay", s)),
        }
    }
}

impl fmt::Display for OutputDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputDelay::Seconds(s) => write!(f, "{s} s"),
            OutputDelay::Min => write!(f, "min"),
            OutputDelay::Max => write!(f, "max"),
        }
    }
}

/// Quantities available through `MEAS:<kind>?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MeasurementKind {
    Voltage,
    VoltageRms,
    VoltageHigh,
    VoltageLow,
    VoltageMax,
    VoltageMin,
    Current,
    CurrentRms,
    CurrentHigh,
    CurrentLow,
    CurrentMax,
    CurrentMin,
    Power,
}

impl MeasurementKind {
    pub fn scpi_token(self) -> &'static str {
        match self {
            MeasurementKind::Voltage => "VOLT",
            MeasurementKind::VoltageRms => "VOLT:ACDC",
            MeasurementKind::VoltageHigh => "VOLT:HIGH",
            MeasurementKind::VoltageLow => "VOLT:LOW",
            MeasurementKind::VoltageMax => "VOLT:MAX",
            MeasurementKind::VoltageMin => "VOLT:MIN",
            MeasurementKind::Current => "CURR",
            MeasurementKind::CurrentRms => "CURR:ACDC",
            MeasurementKind::CurrentHigh => "CURR:HIGH",
            MeasurementKind::CurrentLow => "CURR:LOW",
            MeasurementKind::CurrentMax => "CURR:MAX",
            MeasurementKind::CurrentMin => "CURR:MIN",
            MeasurementKind::Power => "POW",
        }
    }
}

/// Front-panel meter view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DisplayMode {
    /// Four-channel meter view.
    All,
    /// Single-channel meter view.
    Single,
}

/// Function assigned to a pin of the rear digital port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum PinFunction {
    Dio,
    DInput,
    TOutput,
    TInput,
    Fault,
    Inhibit,
    OnCouple,
    OffCouple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum PinPolarity {
    #[strum(to_string = "POS", serialize = "positive")]
    Positive,
    #[strum(to_string = "NEG", serialize = "negative")]
    Negative,
}
