use log::info;

use super::N6700;
use crate::error::N6700Error;
use crate::n6700::address::{Channel, ChannelList};
use crate::n6700::cache::{Attribute, InvalidationScope};
use crate::n6700::protocol::Protocol;
use crate::n6700::transport::ScpiTransport;
use crate::types::CurrentLimitBehavior;

impl<T: ScpiTransport> N6700<T> {
    /// Whether over-current protection trips the output.
    pub fn get_ocp_enabled(&mut self, channel: impl Into<Channel>) -> Result<bool, N6700Error> {
        let index = self.addresses.resolve(channel)?;
        let transport = &mut self.transport;
        self.cache.get(index, Attribute::OcpEnabled, || {
            Protocol::query_channel_bool(transport, "SOUR:CURR:PROT:STAT?", index)
        })
    }

    /// Enable or disable over-current protection.
    ///
    /// Same instrument state as the current-limit behavior, which is kept
    /// in step.
    pub fn set_ocp_enabled(
        &mut self,
        channel: impl Into<Channel>,
        enabled: bool,
    ) -> Result<(), N6700Error> {
        let index = self.addresses.resolve(channel)?;
        self.send_channel(&format!("SOUR:CURR:PROT:STAT {}", u8::from(enabled)), index)?;
        self.cache.set(
            index,
            Attribute::OcpEnabled,
            enabled,
            InvalidationScope::AllAttrsAllChannels,
        );
        self.cache.set(
            index,
            Attribute::CurrentLimitBehavior,
            CurrentLimitBehavior::from(enabled),
            InvalidationScope::ThisAttrOnly,
        );
        Ok(())
    }

    /// Clear a latched protection fault. The output stays off until it
    /// is enabled again.
    pub fn reset_output_protection(
        &mut self,
        channel: impl Into<Channel>,
    ) -> Result<(), N6700Error> {
        let index = self.addresses.resolve(channel)?;
        info!("Clearing output protection on channel {index}");
        self.send_channels_bare("OUTP:PROT:CLE", &ChannelList::single(index))?;
        self.cache.invalidate(index, Attribute::Enabled);
        Ok(())
    }

    /// Option codes installed on a channel's module, e.g. `["054"]`.
    pub fn get_module_options(
        &mut self,
        channel: impl Into<Channel>,
    ) -> Result<Vec<String>, N6700Error> {
        let index = self.addresses.resolve(channel)?;
        if self.simulate {
            return Ok(Vec::new());
        }
        let reply = Protocol::query_channel(&mut self.transport, "SYST:CHAN:OPT?", index)?;
        Ok(Protocol::parse_string_list(&reply))
    }
}
