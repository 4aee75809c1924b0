use super::N6700;
use crate::error::N6700Error;
use crate::n6700::address::Channel;
use crate::n6700::cache::{Attribute, InvalidationScope};
use crate::n6700::interface::ranged::{TriggeredCurrentLimit, TriggeredVoltageLevel};
use crate::n6700::protocol::Protocol;
use crate::n6700::transport::ScpiTransport;
use crate::types::TriggerSource;

impl<T: ScpiTransport> N6700<T> {
    pub fn get_trigger_source(
        &mut self,
        channel: impl Into<Channel>,
    ) -> Result<TriggerSource, N6700Error> {
        let index = self.addresses.resolve(channel)?;
        let transport = &mut self.transport;
        self.cache.get(index, Attribute::TriggerSource, || {
            let command = "TRIG:TRAN:SOUR?";
            let reply = Protocol::query_channel(transport, command, index)?;
            TriggerSource::from_scpi_token(&reply).ok_or_else(|| N6700Error::parse(command, &reply))
        })
    }

    /// Select what starts a transient on this channel.
    pub fn set_trigger_source(
        &mut self,
        channel: impl Into<Channel>,
        source: TriggerSource,
    ) -> Result<(), N6700Error> {
        let index = self.addresses.resolve(channel)?;
        self.send_channel(&format!("TRIG:TRAN:SOUR {}", source.scpi_token()), index)?;
        self.cache.set(
            index,
            Attribute::TriggerSource,
            source,
            InvalidationScope::ThisAttrOnly,
        );
        Ok(())
    }

    /// Voltage the output moves to when a transient is triggered.
    pub fn get_triggered_voltage_level(
        &mut self,
        channel: impl Into<Channel>,
    ) -> Result<f64, N6700Error> {
        self.get_ranged::<TriggeredVoltageLevel>(channel)
    }

    pub fn set_triggered_voltage_level(
        &mut self,
        channel: impl Into<Channel>,
        volts: f64,
    ) -> Result<(), N6700Error> {
        self.set_ranged::<TriggeredVoltageLevel>(channel, volts)
    }

    /// Current limit applied when a transient is triggered.
    pub fn get_triggered_current_limit(
        &mut self,
        channel: impl Into<Channel>,
    ) -> Result<f64, N6700Error> {
        self.get_ranged::<TriggeredCurrentLimit>(channel)
    }

    pub fn set_triggered_current_limit(
        &mut self,
        channel: impl Into<Channel>,
        amps: f64,
    ) -> Result<(), N6700Error> {
        self.set_ranged::<TriggeredCurrentLimit>(channel, amps)
    }

    /// Abort any initiated transient on all channels.
    pub fn trigger_abort(&mut self) -> Result<(), N6700Error> {
        self.send("ABOR:TRAN")
    }

    /// Fire a bus trigger (`*TRG`).
    pub fn send_software_trigger(&mut self) -> Result<(), N6700Error> {
        self.send("*TRG")
    }
}
