use log::{debug, info};

use crate::error::N6700Error;
use crate::n6700::address::{Channel, ChannelAddresses, ChannelList};
use crate::n6700::cache::{Attribute, PropertyCache};
use crate::n6700::interface::RangedProperty;
use crate::n6700::modules::{self, ModuleSpec, ModuleTable};
use crate::n6700::protocol::Protocol;
use crate::n6700::transport::ScpiTransport;
use crate::types::{CurrentLimitBehavior, OutputDelay, SlewRate, TriggerSource};

pub mod batch;
pub mod digital;
pub mod measure;
pub mod output;
pub mod properties;
pub mod protection;
pub mod timing;
pub mod trigger;

pub use properties::ChannelStatus;

/// Driver for an N6700 series modular power system.
///
/// Channel settings are exposed as cached properties: reads are served
/// from the cache while it is valid, writes are validated against the
/// installed module's limits before anything is sent.
///
/// For its methods, "get"/"set" read and write a setting, while
/// "measure" reads back a measured quantity.
///
/// # Examples
///
/// ```no_run
/// use agilent_n6700::{ModuleTable, N6700, TcpTransport};
///
/// let transport = TcpTransport::new("192.168.1.108", 5025)?;
/// let mut psu = N6700::connect(transport, &ModuleTable::builtin())?;
///
/// psu.set_voltage_level(0, 3.3)?;
/// psu.set_current_limit(0, 2.5)?;
/// psu.set_outputs_enabled(true, [0, 1, 2])?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// Without hardware:
///
/// ```
/// use agilent_n6700::{MockTransport, ModuleTable, N6700};
///
/// let spec = ModuleTable::builtin().resolve(0, "N6752A")?;
/// let mut psu = N6700::simulated(MockTransport::new(), vec![spec; 4]);
/// psu.set_voltage_level("output2", 12.0)?;
/// assert_eq!(psu.get_voltage_level(1)?, 12.0);
/// assert!(psu.transport().writes().is_empty());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct N6700<T: ScpiTransport> {
    transport: T,
    simulate: bool,
    addresses: ChannelAddresses,
    specs: Vec<ModuleSpec>,
    cache: PropertyCache,
}

impl<T: ScpiTransport> N6700<T> {
    /// Discover the installed channels and modules, then build the driver.
    ///
    /// Fails with [`N6700Error::UnknownModule`] if any installed module is
    /// missing from `table`.
    pub fn connect(mut transport: T, table: &ModuleTable) -> Result<Self, N6700Error> {
        let count = modules::discover_channel_count(&mut transport)?;
        let specs = modules::discover_module_specs(&mut transport, count, table)?;
        Ok(Self::from_parts(transport, specs, false))
    }

    /// Build a driver that never touches `transport`. Every validation
    /// still runs.
    pub fn simulated(transport: T, specs: Vec<ModuleSpec>) -> Self {
        Self::from_parts(transport, specs, true)
    }

    fn from_parts(transport: T, specs: Vec<ModuleSpec>, simulate: bool) -> Self {
        let addresses = ChannelAddresses::new(specs.len());
        let mut cache = PropertyCache::new(specs.len(), simulate);

        for (channel, spec) in specs.iter().enumerate() {
            cache.seed(channel, Attribute::CurrentLimit, spec.current_max);
            cache.seed(
                channel,
                Attribute::CurrentLimitBehavior,
                CurrentLimitBehavior::Regulate,
            );
            cache.seed(channel, Attribute::Enabled, false);
            cache.seed(channel, Attribute::OvpEnabled, true);
            cache.seed(channel, Attribute::OvpLimit, spec.ovp_max);
            cache.seed(channel, Attribute::VoltageLevel, 0.0);
            cache.seed(channel, Attribute::SlewRate, SlewRate::Min);
            cache.seed(channel, Attribute::TurnOnDelay, OutputDelay::Min);
            cache.seed(channel, Attribute::TurnOffDelay, OutputDelay::Min);
            cache.seed(channel, Attribute::TriggerSource, TriggerSource::Immediate);
            cache.seed(channel, Attribute::TriggeredVoltageLevel, 0.0);
            cache.seed(channel, Attribute::TriggeredCurrentLimit, 0.0);
            cache.seed(channel, Attribute::OcpEnabled, false);
        }

        info!(
            "N6700 driver ready: {} channels{}",
            specs.len(),
            if simulate { " (simulated)" } else { "" }
        );

        Self {
            transport,
            simulate,
            addresses,
            specs,
            cache,
        }
    }

    pub fn is_simulating(&self) -> bool {
        self.simulate
    }

    pub fn channel_count(&self) -> usize {
        self.addresses.len()
    }

    pub fn channel_names(&self) -> &[String] {
        self.addresses.names()
    }

    /// Resolve a channel index or name to its 0-based index.
    pub fn resolve_channel(&self, channel: impl Into<Channel>) -> Result<usize, N6700Error> {
        self.addresses.resolve(channel)
    }

    pub fn module_spec(&self, channel: impl Into<Channel>) -> Result<&ModuleSpec, N6700Error> {
        let index = self.addresses.resolve(channel)?;
        Ok(&self.specs[index])
    }

    /// Module-derived voltage ceiling of a channel.
    pub fn get_voltage_max(&self, channel: impl Into<Channel>) -> Result<f64, N6700Error> {
        Ok(self.module_spec(channel)?.voltage_max)
    }

    /// Drop every cached value, e.g. after front-panel changes.
    pub fn invalidate_cache(&mut self) {
        debug!("Invalidating the whole property cache");
        self.cache.invalidate_all();
    }

    pub fn is_cached(&self, channel: impl Into<Channel>, attribute: Attribute) -> bool {
        self.addresses
            .resolve(channel)
            .is_ok_and(|index| self.cache.is_valid(index, attribute))
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send a command unless simulating.
    fn send(&mut self, command: &str) -> Result<(), N6700Error> {
        if self.simulate {
            debug!("(simulated) {command}");
            return Ok(());
        }
        Protocol::write(&mut self.transport, command)
    }

    /// Send `<command>, (@n)` unless simulating.
    fn send_channel(&mut self, command: &str, index: usize) -> Result<(), N6700Error> {
        self.send_channels(command, &ChannelList::single(index))
    }

    fn send_channels(&mut self, command: &str, channels: &ChannelList) -> Result<(), N6700Error> {
        if self.simulate {
            debug!("(simulated) {command}{}", channels.parameter_suffix());
            return Ok(());
        }
        Protocol::write_channels(&mut self.transport, command, channels)
    }

    fn send_channels_bare(
        &mut self,
        command: &str,
        channels: &ChannelList,
    ) -> Result<(), N6700Error> {
        if self.simulate {
            debug!("(simulated) {command}{}", channels.bare_suffix());
            return Ok(());
        }
        Protocol::write_channels_bare(&mut self.transport, command, channels)
    }

    /// Cached read of a module-bounded numeric setting.
    pub fn get_ranged<P: RangedProperty>(
        &mut self,
        channel: impl Into<Channel>,
    ) -> Result<f64, N6700Error> {
        let index = self.addresses.resolve(channel)?;
        let transport = &mut self.transport;
        self.cache.get(index, P::ATTRIBUTE, || {
            Protocol::query_channel_f64(transport, &P::query(), index)
        })
    }

    /// Validated write of a module-bounded numeric setting.
    pub fn set_ranged<P: RangedProperty>(
        &mut self,
        channel: impl Into<Channel>,
        value: f64,
    ) -> Result<(), N6700Error> {
        let index = self.addresses.resolve(channel)?;
        let value = P::validate(index, &self.specs[index], value)?;
        self.send_channel(&P::command(value), index)?;
        self.cache.set(index, P::ATTRIBUTE, value, P::SCOPE);
        Ok(())
    }
}
