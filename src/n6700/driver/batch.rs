use log::info;

use super::N6700;
use crate::error::N6700Error;
use crate::n6700::address::Channel;
use crate::n6700::cache::{Attribute, InvalidationScope};
use crate::n6700::interface::BatchAddressable;
use crate::n6700::transport::ScpiTransport;
use crate::types::{DisplayMode, parse_option};

impl<T: ScpiTransport> N6700<T> {
    /// Switch several outputs with one command so they change state on the
    /// same hardware cycle.
    ///
    /// This is the fast path compared to channel coupling: toggling
    /// channels one at a time adds the turn-on latency once per channel.
    /// Afterwards every cached value is invalidated.
    pub fn set_outputs_enabled<I, C>(
        &mut self,
        enabled: bool,
        channels: I,
    ) -> Result<(), N6700Error>
    where
        I: IntoIterator<Item = C>,
        C: Into<Channel>,
    {
        let list = self.addresses.resolve_all(channels)?;
        info!(
            "Switching outputs {} {}",
            list.numbers(),
            if enabled { "on" } else { "off" }
        );
        self.send_channels(&format!(":OUTP {}", u8::from(enabled)), &list)?;
        for &index in list.indices() {
            self.cache.set(
                index,
                Attribute::Enabled,
                enabled,
                InvalidationScope::None,
            );
        }
        self.cache.invalidate_all();
        Ok(())
    }

    /// Couple the enable state of the listed channels, or decouple all
    /// of them.
    ///
    /// The instrument keeps coupling across resets and power cycles, so
    /// callers must decouple explicitly. Decoupling always applies to the
    /// whole mainframe; any listed channels are still checked.
    pub fn set_channel_coupling<I, C>(
        &mut self,
        enabled: bool,
        channels: I,
    ) -> Result<(), N6700Error>
    where
        I: IntoIterator<Item = C>,
        C: Into<Channel>,
    {
        if !enabled {
            for channel in channels {
                self.addresses.resolve(channel)?;
            }
            info!("Decoupling all outputs");
            self.send("OUTP:COUP 0")?;
            self.cache.invalidate_all();
            return Ok(());
        }

        let list = self.addresses.resolve_all(channels)?;
        info!("Coupling outputs {}", list.numbers());
        self.send("OUTP:COUP 1")?;
        self.send(&format!("OUTP:COUP:CHAN {}", list.numbers()))?;
        self.cache.invalidate_all();
        Ok(())
    }

    /// Arm the transient system on the listed channels.
    pub fn trigger_initiate<I, C>(&mut self, channels: I) -> Result<(), N6700Error>
    where
        I: IntoIterator<Item = C>,
        C: Into<Channel>,
    {
        let list = self.addresses.resolve_all(channels)?;
        self.send_channels_bare("INIT:TRAN", &list)
    }

    /// [`N6700::trigger_initiate`] on every channel.
    pub fn trigger_initiate_all(&mut self) -> Result<(), N6700Error> {
        let list = self.addresses.all();
        self.send_channels_bare("INIT:TRAN", &list)
    }

    /// Select the front-panel meter view. `channel` is only used by
    /// [`DisplayMode::Single`].
    pub fn set_display_mode(
        &mut self,
        mode: DisplayMode,
        channel: impl Into<Channel>,
    ) -> Result<(), N6700Error> {
        let index = self.addresses.resolve(channel)?;
        match mode {
            DisplayMode::All => self.send("DISP:VIEW METER4"),
            DisplayMode::Single => {
                self.send("DISP:VIEW METER1")?;
                self.send(&format!("DISP:CHAN {}", index + 1))
            }
        }
    }

    /// [`N6700::set_display_mode`] with the mode given by name.
    pub fn set_display_mode_named(
        &mut self,
        mode: &str,
        channel: impl Into<Channel>,
    ) -> Result<(), N6700Error> {
        let mode: DisplayMode = parse_option("display mode", mode)?;
        self.set_display_mode(mode, channel)
    }
}

impl<T: ScpiTransport> BatchAddressable for N6700<T> {
    fn set_outputs_enabled<I, C>(&mut self, enabled: bool, channels: I) -> Result<(), N6700Error>
    where
        I: IntoIterator<Item = C>,
        C: Into<Channel>,
    {
        N6700::set_outputs_enabled(self, enabled, channels)
    }

    fn set_channel_coupling<I, C>(&mut self, enabled: bool, channels: I) -> Result<(), N6700Error>
    where
        I: IntoIterator<Item = C>,
        C: Into<Channel>,
    {
        N6700::set_channel_coupling(self, enabled, channels)
    }

    fn trigger_initiate<I, C>(&mut self, channels: I) -> Result<(), N6700Error>
    where
        I: IntoIterator<Item = C>,
        C: Into<Channel>,
    {
        N6700::trigger_initiate(self, channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::n6700::modules::ModuleSpec;
    use crate::n6700::transport::MockTransport;

    fn live() -> N6700<MockTransport> {
        let mut mock = MockTransport::new().with_reply("SYST:CHAN?", "+4");
        for n in 1..=4 {
            mock.set_reply(&format!("SYST:CHAN:MOD? (@{n})"), "N6752A");
        }
        let mut psu = N6700::connect(mock, &crate::ModuleTable::builtin()).unwrap();
        psu.transport_mut().clear_log();
        psu
    }

    #[test]
    fn simultaneous_enable_is_one_write() {
        let mut psu = live();
        psu.set_outputs_enabled(true, [0, 1, 2]).unwrap();
        assert_eq!(psu.transport().writes(), &[":OUTP 1, (@1,2,3)".to_string()]);
    }

    #[test]
    fn simultaneous_enable_invalidates_everything() {
        let mut psu = live();
        psu.set_voltage_level(3, 5.0).unwrap();
        psu.set_outputs_enabled(false, ["output2", "output1"]).unwrap();
        assert_eq!(psu.transport().writes().last().unwrap(), ":OUTP 0, (@2,1)");
        assert!(!psu.is_cached(3, Attribute::VoltageLevel));
        assert!(!psu.is_cached(0, Attribute::Enabled));
    }

    #[test]
    fn simulated_enable_keeps_the_optimistic_value() {
        let spec = ModuleSpec::new(51.0, 10.2, 55.0, 10.2);
        let mut psu = N6700::simulated(MockTransport::new(), vec![spec; 4]);
        psu.set_outputs_enabled(true, [1, 3]).unwrap();
        assert!(psu.get_enabled(1).unwrap());
        assert!(psu.get_enabled(3).unwrap());
        assert!(!psu.get_enabled(0).unwrap());
        assert!(psu.transport().writes().is_empty());
    }

    #[test]
    fn batch_rejects_unknown_and_empty_lists() {
        let mut psu = live();
        assert!(matches!(
            psu.set_outputs_enabled(true, [0, 7]),
            Err(N6700Error::UnknownChannel(_))
        ));
        assert!(matches!(
            psu.set_outputs_enabled(true, Vec::<usize>::new()),
            Err(N6700Error::InvalidCommand(_))
        ));
        assert!(psu.transport().writes().is_empty());
    }

    #[test]
    fn coupling_commands() {
        let mut psu = live();
        psu.set_channel_coupling(true, [0, 1, 2]).unwrap();
        psu.set_channel_coupling(false, Vec::<usize>::new()).unwrap();
        assert_eq!(
            psu.transport().writes(),
            &[
                "OUTP:COUP 1".to_string(),
                "OUTP:COUP:CHAN 1,2,3".to_string(),
                "OUTP:COUP 0".to_string(),
            ]
        );
    }

    #[test]
    fn decoupling_still_checks_the_channels() {
        let mut psu = live();
        assert!(matches!(
            psu.set_channel_coupling(false, [9]),
            Err(N6700Error::UnknownChannel(_))
        ));
        assert!(psu.transport().writes().is_empty());
        psu.set_channel_coupling(false, ["output4"]).unwrap();
        assert_eq!(psu.transport().writes(), &["OUTP:COUP 0".to_string()]);
    }

    #[test]
    fn trait_forwards_to_the_driver() {
        fn couple<B: BatchAddressable>(target: &mut B) -> Result<(), N6700Error> {
            target.set_channel_coupling(true, [2, 3])?;
            target.trigger_initiate([0])
        }
        let mut psu = live();
        couple(&mut psu).unwrap();
        assert_eq!(
            psu.transport().writes(),
            &[
                "OUTP:COUP 1".to_string(),
                "OUTP:COUP:CHAN 3,4".to_string(),
                "INIT:TRAN (@1)".to_string(),
            ]
        );
    }

    #[test]
    fn initiate_all_lists_every_channel() {
        let mut psu = live();
        psu.trigger_initiate_all().unwrap();
        assert_eq!(
            psu.transport().writes(),
            &["INIT:TRAN (@1,2,3,4)".to_string()]
        );
    }

    #[test]
    fn display_modes() {
        let mut psu = live();
        psu.set_display_mode(DisplayMode::All, 0).unwrap();
        psu.set_display_mode_named("single", "output3").unwrap();
        assert_eq!(
            psu.transport().writes(),
            &[
                "DISP:VIEW METER4".to_string(),
                "DISP:VIEW METER1".to_string(),
                "DISP:CHAN 3".to_string(),
            ]
        );
        assert!(matches!(
            psu.set_display_mode_named("dual", 0),
            Err(N6700Error::UnsupportedValue { .. })
        ));
    }
}
