//! Per-channel property cache.
//!
//! One table keyed by `(channel, attribute)`. Each entry holds the last
//! value written to or read from the instrument and a validity flag. A
//! value is served from the table only while its flag is set; otherwise
//! the caller-supplied refresh closure queries the hardware.
//!
//! In simulation mode every entry counts as valid and refresh closures
//! are never called.

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::N6700Error;
use crate::types::{CurrentLimitBehavior, OutputDelay, SlewRate, TriggerSource};

/// Every cached per-channel property.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Attribute {
    CurrentLimit,
    CurrentLimitBehavior,
    Enabled,
    OvpEnabled,
    OvpLimit,
    VoltageLevel,
    SlewRate,
    TurnOnDelay,
    TurnOffDelay,
    TriggerSource,
    TriggeredVoltageLevel,
    TriggeredCurrentLimit,
    OcpEnabled,
}

impl Attribute {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// How far a write reaches into the rest of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationScope {
    /// Store the value, leave every validity flag as it is.
    None,
    /// Store the value and mark only this entry valid.
    ThisAttrOnly,
    /// Invalidate every attribute of this channel, then mark this entry valid.
    AllAttrsThisChannel,
    /// Invalidate every attribute of every channel, then mark this entry valid.
    AllAttrsAllChannels,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Float(f64),
    Bool(bool),
    Behavior(CurrentLimitBehavior),
    Slew(SlewRate),
    Delay(OutputDelay),
    Trigger(TriggerSource),
}

impl fmt::Display for CachedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachedValue::Float(v) => write!(f, "{v}"),
            CachedValue::Bool(v) => write!(f, "{v}"),
            CachedValue::Behavior(v) => write!(f, "{v}"),
            CachedValue::Slew(v) => write!(f, "{v}"),
            CachedValue::Delay(v) => write!(f, "{v}"),
            CachedValue::Trigger(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for CachedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CachedValue::Float(v) => serializer.serialize_f64(*v),
            CachedValue::Bool(v) => serializer.serialize_bool(*v),
            other => serializer.collect_str(other),
        }
    }
}

/// Types that can live in the cache.
pub trait CacheValue: Sized + Clone + Into<CachedValue> {
    fn from_cached(value: &CachedValue) -> Option<Self>;
}

macro_rules! cache_value {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for CachedValue {
            fn from(value: $ty) -> Self {
                CachedValue::$variant(value)
            }
        }

        impl CacheValue for $ty {
            fn from_cached(value: &CachedValue) -> Option<Self> {
                match value {
                    CachedValue::$variant(inner) => Some(*inner),
                    _ => None,
                }
            }
        }
    };
}

cache_value!(f64, Float);
cache_value!(bool, Bool);
cache_value!(CurrentLimitBehavior, Behavior);
cache_value!(SlewRate, Slew);
cache_value!(OutputDelay, Delay);
cache_value!(TriggerSource, Trigger);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedValue,
    valid: bool,
}

#[derive(Debug)]
pub struct PropertyCache {
    entries: HashMap<(usize, Attribute), CacheEntry>,
    channel_count: usize,
    simulate: bool,
}

impl PropertyCache {
    pub fn new(channel_count: usize, simulate: bool) -> Self {
        Self {
            entries: HashMap::with_capacity(channel_count * Attribute::iter().len()),
            channel_count,
            simulate,
        }
    }

    pub fn is_simulating(&self) -> bool {
        self.simulate
    }

    /// Install the initial value of an entry. Seeded entries start invalid
    /// so the first read goes to the instrument.
    pub fn seed(&mut self, channel: usize, attribute: Attribute, value: impl Into<CachedValue>) {
        self.entries.insert(
            (channel, attribute),
            CacheEntry {
                value: value.into(),
                valid: false,
            },
        );
    }

    /// Return the cached value if valid, otherwise refresh it from hardware.
    pub fn get<V, F>(
        &mut self,
        channel: usize,
        attribute: Attribute,
        refresh: F,
    ) -> Result<V, N6700Error>
    where
        V: CacheValue,
        F: FnOnce() -> Result<V, N6700Error>,
    {
        let entry = self
            .entries
            .get_mut(&(channel, attribute))
            .ok_or_else(|| N6700Error::UnknownChannel(channel.to_string()))?;

        if self.simulate || entry.valid {
            return V::from_cached(&entry.value).ok_or_else(|| {
                N6700Error::Protocol(format!(
                    "Cached {attribute} on channel {channel} holds unexpected value {:?}",
                    entry.value
                ))
            });
        }

        let value = refresh()?;
        entry.value = value.clone().into();
        entry.valid = true;
        Ok(value)
    }

    /// Raw access to an entry, ignoring its validity flag.
    pub fn peek(&self, channel: usize, attribute: Attribute) -> Option<&CachedValue> {
        self.entries.get(&(channel, attribute)).map(|entry| &entry.value)
    }

    /// Write-through: store `value`, then apply `scope`.
    pub fn set(
        &mut self,
        channel: usize,
        attribute: Attribute,
        value: impl Into<CachedValue>,
        scope: InvalidationScope,
    ) {
        match scope {
            InvalidationScope::None | InvalidationScope::ThisAttrOnly => {}
            InvalidationScope::AllAttrsThisChannel => self.invalidate_channel(channel),
            InvalidationScope::AllAttrsAllChannels => self.invalidate_all(),
        }

        let valid = match self.entries.get(&(channel, attribute)) {
            Some(entry) if scope == InvalidationScope::None => entry.valid,
            _ => scope != InvalidationScope::None,
        };
        self.entries.insert(
            (channel, attribute),
            CacheEntry {
                value: value.into(),
                valid,
            },
        );
    }

    pub fn is_valid(&self, channel: usize, attribute: Attribute) -> bool {
        self.simulate
            || self
                .entries
                .get(&(channel, attribute))
                .is_some_and(|entry| entry.valid)
    }

    pub fn invalidate(&mut self, channel: usize, attribute: Attribute) {
        if let Some(entry) = self.entries.get_mut(&(channel, attribute)) {
            entry.valid = false;
        }
    }

    pub fn invalidate_channel(&mut self, channel: usize) {
        for attribute in Attribute::iter() {
            self.invalidate(channel, attribute);
        }
    }

    pub fn invalidate_all(&mut self) {
        for channel in 0..self.channel_count {
            self.invalidate_channel(channel);
        }
    }
}
