use super::N6700;
use crate::error::N6700Error;
use crate::n6700::address::Channel;
use crate::n6700::cache::{Attribute, InvalidationScope};
use crate::n6700::interface::ranged::{CurrentLimit, OvpLimit, VoltageLevel};
use crate::n6700::protocol::Protocol;
use crate::n6700::transport::ScpiTransport;
use crate::types::CurrentLimitBehavior;

impl<T: ScpiTransport> N6700<T> {
    /// Programmed output voltage, in volts.
    pub fn get_voltage_level(&mut self, channel: impl Into<Channel>) -> Result<f64, N6700Error> {
        self.get_ranged::<VoltageLevel>(channel)
    }

    /// Program the output voltage, in volts.
    ///
    /// # Errors
    /// [`N6700Error::OutOfRange`] unless `0 <= volts <= voltage_max` of the
    /// channel's module. The cache is left untouched on error.
    pub fn set_voltage_level(
        &mut self,
        channel: impl Into<Channel>,
        volts: f64,
    ) -> Result<(), N6700Error> {
        self.set_ranged::<VoltageLevel>(channel, volts)
    }

    /// Programmed current limit, in amps.
    pub fn get_current_limit(&mut self, channel: impl Into<Channel>) -> Result<f64, N6700Error> {
        self.get_ranged::<CurrentLimit>(channel)
    }

    /// Program the current limit, in amps (`0..=current_max`).
    pub fn set_current_limit(
        &mut self,
        channel: impl Into<Channel>,
        amps: f64,
    ) -> Result<(), N6700Error> {
        self.set_ranged::<CurrentLimit>(channel, amps)
    }

    /// Over-voltage protection threshold, in volts.
    pub fn get_ovp_limit(&mut self, channel: impl Into<Channel>) -> Result<f64, N6700Error> {
        self.get_ranged::<OvpLimit>(channel)
    }

    /// Program the over-voltage protection threshold (`0..=ovp_max`).
    pub fn set_ovp_limit(
        &mut self,
        channel: impl Into<Channel>,
        volts: f64,
    ) -> Result<(), N6700Error> {
        self.set_ranged::<OvpLimit>(channel, volts)
    }

    pub fn get_ovp_enabled(&mut self, channel: impl Into<Channel>) -> Result<bool, N6700Error> {
        let index = self.addresses.resolve(channel)?;
        let transport = &mut self.transport;
        self.cache.get(index, Attribute::OvpEnabled, || {
            Protocol::query_channel_bool(transport, "SOUR:VOLT:PROT:STAT?", index)
        })
    }

    pub fn set_ovp_enabled(
        &mut self,
        channel: impl Into<Channel>,
        enabled: bool,
    ) -> Result<(), N6700Error> {
        let index = self.addresses.resolve(channel)?;
        self.send_channel(&format!("SOUR:VOLT:PROT:STAT {}", u8::from(enabled)), index)?;
        self.cache.set(
            index,
            Attribute::OvpEnabled,
            enabled,
            InvalidationScope::ThisAttrOnly,
        );
        Ok(())
    }

    /// Whether the output is switched on.
    pub fn get_enabled(&mut self, channel: impl Into<Channel>) -> Result<bool, N6700Error> {
        let index = self.addresses.resolve(channel)?;
        let transport = &mut self.transport;
        self.cache.get(index, Attribute::Enabled, || {
            Protocol::query_channel_bool(transport, ":OUTP?", index)
        })
    }

    /// Switch a single output on or off.
    ///
    /// Each call adds the instrument's per-channel turn-on latency; use
    /// [`N6700::set_outputs_enabled`] to switch several outputs together.
    /// The output state may be coupled to other channels, so the whole
    /// cache is invalidated.
    pub fn set_enabled(
        &mut self,
        channel: impl Into<Channel>,
        enabled: bool,
    ) -> Result<(), N6700Error> {
        let index = self.addresses.resolve(channel)?;
        self.send_channel(&format!(":OUTP {}", u8::from(enabled)), index)?;
        self.cache.set(
            index,
            Attribute::Enabled,
            enabled,
            InvalidationScope::AllAttrsAllChannels,
        );
        Ok(())
    }

    pub fn get_current_limit_behavior(
        &mut self,
        channel: impl Into<Channel>,
    ) -> Result<CurrentLimitBehavior, N6700Error> {
        let index = self.addresses.resolve(channel)?;
        let transport = &mut self.transport;
        self.cache.get(index, Attribute::CurrentLimitBehavior, || {
            Protocol::query_channel_bool(transport, "SOUR:CURR:PROT:STAT?", index)
                .map(CurrentLimitBehavior::from)
        })
    }

    /// Select regulate (constant current) or trip (over-current
    /// protection). Shares instrument state with the OCP enable flag.
    pub fn set_current_limit_behavior(
        &mut self,
        channel: impl Into<Channel>,
        behavior: CurrentLimitBehavior,
    ) -> Result<(), N6700Error> {
        let index = self.addresses.resolve(channel)?;
        let trip = behavior.trip_enabled();
        self.send_channel(&format!("SOUR:CURR:PROT:STAT {}", u8::from(trip)), index)?;
        self.cache.set(
            index,
            Attribute::CurrentLimitBehavior,
            behavior,
            InvalidationScope::AllAttrsAllChannels,
        );
        self.cache.set(
            index,
            Attribute::OcpEnabled,
            trip,
            InvalidationScope::ThisAttrOnly,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::n6700::driver::N6700;
    use crate::n6700::modules::ModuleSpec;
    use crate::n6700::transport::MockTransport;
    use crate::{CurrentLimitBehavior, N6700Error};

    fn spec() -> ModuleSpec {
        ModuleSpec::new(51.0, 10.2, 55.0, 10.2)
    }

    fn live(channels: usize) -> N6700<MockTransport> {
        let mut mock = MockTransport::new().with_reply("SYST:CHAN?", &format!("+{channels}"));
        for n in 1..=channels {
            mock.set_reply(&format!("SYST:CHAN:MOD? (@{n})"), "N6752A");
        }
        let mut psu = N6700::connect(mock, &crate::ModuleTable::builtin()).unwrap();
        psu.transport_mut().clear_log();
        psu
    }

    #[test]
    fn voltage_write_format() {
        let mut psu = live(2);
        psu.set_voltage_level(1, 12.0).unwrap();
        assert_eq!(
            psu.transport().writes(),
            &["SOUR:VOLT 12.00, (@2)".to_string()]
        );
        assert_eq!(psu.get_voltage_level(1).unwrap(), 12.0);
        assert!(psu.transport().queries().is_empty());
    }

    #[test]
    fn voltage_read_queries_once() {
        let mut psu = live(1);
        psu.transport_mut().set_reply("SOUR:VOLT? (@1)", "+5.00000E+00");
        assert_eq!(psu.get_voltage_level(0).unwrap(), 5.0);
        assert_eq!(psu.get_voltage_level("output1").unwrap(), 5.0);
        assert_eq!(psu.transport().queries().len(), 1);
    }

    #[test]
    fn out_of_range_leaves_cache_and_wire_alone() {
        let mut psu = N6700::simulated(MockTransport::new(), vec![spec()]);
        psu.set_voltage_level(0, 10.0).unwrap();
        for bad in [-0.5, 51.5] {
            assert!(matches!(
                psu.set_voltage_level(0, bad),
                Err(N6700Error::OutOfRange { .. })
            ));
        }
        assert_eq!(psu.get_voltage_level(0).unwrap(), 10.0);
    }

    #[test]
    fn current_and_ovp_formats() {
        let mut psu = live(1);
        psu.set_current_limit(0, 2.5).unwrap();
        psu.set_ovp_limit(0, 4.3).unwrap();
        psu.set_ovp_enabled(0, true).unwrap();
        assert_eq!(
            psu.transport().writes(),
            &[
                "SOUR:CURR 2.50, (@1)".to_string(),
                "SOUR:VOLT:PROT:LEV 4.3, (@1)".to_string(),
                "SOUR:VOLT:PROT:STAT 1, (@1)".to_string(),
            ]
        );
        assert!(psu.set_current_limit(0, 10.3).is_err());
        assert!(psu.set_ovp_limit(0, 55.1).is_err());
    }

    #[test]
    fn enabled_reads_the_instrument_state() {
        let mut psu = live(1);
        psu.transport_mut().set_reply(":OUTP? (@1)", "1");
        assert!(psu.get_enabled(0).unwrap());
        psu.set_enabled(0, false).unwrap();
        assert!(!psu.get_enabled(0).unwrap());
        assert_eq!(psu.transport().writes(), &[":OUTP 0, (@1)".to_string()]);
    }

    #[test]
    fn behavior_keeps_ocp_in_step() {
        let mut psu = live(2);
        psu.set_current_limit_behavior(0, CurrentLimitBehavior::Trip).unwrap();
        assert_eq!(
            psu.transport().writes(),
            &["SOUR:CURR:PROT:STAT 1, (@1)".to_string()]
        );
        assert_eq!(
            psu.get_current_limit_behavior(0).unwrap(),
            CurrentLimitBehavior::Trip
        );
        assert!(psu.get_ocp_enabled(0).unwrap());
        assert!(psu.transport().queries().is_empty());
    }

    #[test]
    fn behavior_reply_parses() {
        let mut psu = live(1);
        psu.transport_mut().set_reply("SOUR:CURR:PROT:STAT? (@1)", "0");
        assert_eq!(
            psu.get_current_limit_behavior(0).unwrap(),
            CurrentLimitBehavior::Regulate
        );
    }
}
