//! Channel addressing.
//!
//! Callers always use 0-based channel indices or the generated channel
//! names (`output1`, `output2`, ...). The instrument uses 1-based channel
//! lists of the form `(@1,2,3)`. This module is the only place where one
//! is converted into the other.

use std::fmt;
use std::str::FromStr;

use crate::error::N6700Error;

/// A caller-side reference to a channel, by 0-based index or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    Index(i64),
    Name(String),
}

impl From<usize> for Channel {
    fn from(index: usize) -> Self {
        Channel::Index(index as i64)
    }
}

impl From<i32> for Channel {
    fn from(index: i32) -> Self {
        Channel::Index(index as i64)
    }
}

impl From<u8> for Channel {
    fn from(index: u8) -> Self {
        Channel::Index(index as i64)
    }
}

impl From<&str> for Channel {
    fn from(name: &str) -> Self {
        Channel::Name(name.to_string())
    }
}

impl From<String> for Channel {
    fn from(name: String) -> Self {
        Channel::Name(name)
    }
}

impl From<&Channel> for Channel {
    fn from(channel: &Channel) -> Self {
        channel.clone()
    }
}

/// Numeric text is an index, anything else a channel name.
impl FromStr for Channel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<i64>() {
            Ok(index) => Channel::Index(index),
            Err(_) => Channel::Name(s.to_string()),
        })
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Index(index) => write!(f, "{index}"),
            Channel::Name(name) => write!(f, "{name}"),
        }
    }
}

/// The discovered channel set and its names.
#[derive(Debug, Clone)]
pub struct ChannelAddresses {
    names: Vec<String>,
}

impl ChannelAddresses {
    pub fn new(count: usize) -> Self {
        Self {
            names: (1..=count).map(|n| format!("output{n}")).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Resolve a channel reference to its 0-based index.
    pub fn resolve(&self, channel: impl Into<Channel>) -> Result<usize, N6700Error> {
        let channel = channel.into();
        match &channel {
            Channel::Index(index) if *index >= 0 && (*index as usize) < self.names.len() => {
                Ok(*index as usize)
            }
            Channel::Index(_) => Err(N6700Error::UnknownChannel(channel.to_string())),
            Channel::Name(name) => self
                .names
                .iter()
                .position(|known| known.eq_ignore_ascii_case(name))
                .ok_or_else(|| N6700Error::UnknownChannel(name.clone())),
        }
    }

    /// Resolve a batch of references, keeping caller order and dropping
    /// duplicates. An empty batch is rejected since the instrument has no
    /// syntax for an empty channel list.
    pub fn resolve_all<I, C>(&self, channels: I) -> Result<ChannelList, N6700Error>
    where
        I: IntoIterator<Item = C>,
        C: Into<Channel>,
    {
        let mut indices: Vec<usize> = Vec::new();
        for channel in channels {
            let index = self.resolve(channel)?;
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
        if indices.is_empty() {
            return Err(N6700Error::InvalidCommand(
                "Channel list must not be empty".to_string(),
            ));
        }
        Ok(ChannelList(indices))
    }

    pub fn all(&self) -> ChannelList {
        ChannelList((0..self.names.len()).collect())
    }
}

/// Resolved 0-based channel indices, rendered 1-based on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelList(Vec<usize>);

impl ChannelList {
    pub fn single(index: usize) -> Self {
        ChannelList(vec![index])
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// 1-based instrument channel numbers.
    pub fn instrument_numbers(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().map(|index| index + 1)
    }

    /// `1,2,3`
    pub fn numbers(&self) -> String {
        self.instrument_numbers()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `(@1,2,3)`
    pub fn clause(&self) -> String {
        format!("(@{})", self.numbers())
    }

    /// Appended after the last parameter of a command: `, (@1,2,3)`.
    pub fn parameter_suffix(&self) -> String {
        format!(", {}", self.clause())
    }

    /// Appended to a query or a parameterless command: ` (@1,2,3)`.
    pub fn bare_suffix(&self) -> String {
        format!(" {}", self.clause())
    }
}
