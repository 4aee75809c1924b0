use log::warn;

use super::N6700;
use crate::error::N6700Error;
use crate::n6700::address::Channel;
use crate::n6700::cache::{Attribute, InvalidationScope};
use crate::n6700::protocol::{INFINITE_SLEW_REPLY, Protocol};
use crate::n6700::transport::ScpiTransport;
use crate::types::{OutputDelay, SlewRate};

/// Slew rates at or above this many V/ms are sent as `MAX`.
pub const SLEW_MAX_THRESHOLD: f64 = 9.9e35;
/// Delays at or below this many seconds are sent as `MIN`.
pub const DELAY_MIN_THRESHOLD: f64 = 1.03e-4;
/// Delays at or above this many seconds are sent as `MAX`.
pub const DELAY_MAX_THRESHOLD: f64 = 1.023e3;

/// Wire argument for `SOUR:VOLT:SLEW`, in V/s.
pub fn slew_argument(channel: usize, rate: SlewRate) -> Result<(String, SlewRate), N6700Error> {
    match rate {
        SlewRate::Min => Ok(("MIN".to_string(), rate)),
        SlewRate::Max => Ok(("MAX".to_string(), rate)),
        SlewRate::Infinite => Ok(("INF".to_string(), rate)),
        SlewRate::VoltsPerMs(v) if v.is_nan() || v <= 0.0 => Err(N6700Error::OutOfRange {
            attribute: Attribute::SlewRate.name(),
            channel,
            value: v,
            min: 0.0,
            max: f64::INFINITY,
        }),
        SlewRate::VoltsPerMs(v) if v.is_infinite() => Ok(("INF".to_string(), SlewRate::Infinite)),
        SlewRate::VoltsPerMs(v) if v >= SLEW_MAX_THRESHOLD => {
            Ok(("MAX".to_string(), SlewRate::Max))
        }
        SlewRate::VoltsPerMs(v) => Ok((Protocol::scientific(v * 1000.0, 2), rate)),
    }
}

/// Wire argument for `OUTP:DEL:RISE`/`OUTP:DEL:FALL`, in seconds.
///
/// Values outside the programmable window clamp to `MIN`/`MAX`.
pub fn delay_argument(
    channel: usize,
    delay: OutputDelay,
) -> Result<(String, OutputDelay), N6700Error> {
    match delay {
        OutputDelay::Min => Ok(("MIN".to_string(), delay)),
        OutputDelay::Max => Ok(("MAX".to_string(), delay)),
        OutputDelay::Seconds(s) if s.is_nan() => Err(N6700Error::OutOfRange {
            attribute: "output_delay",
            channel,
            value: s,
            min: 0.0,
            max: DELAY_MAX_THRESHOLD,
        }),
        OutputDelay::Seconds(s) if s <= DELAY_MIN_THRESHOLD => {
            if s < 0.0 {
                warn!("Negative delay {s} s on channel {channel} clamped to MIN");
            }
            Ok(("MIN".to_string(), OutputDelay::Min))
        }
        OutputDelay::Seconds(s) if s >= DELAY_MAX_THRESHOLD => {
            warn!("Delay {s} s on channel {channel} clamped to MAX");
            Ok(("MAX".to_string(), OutputDelay::Max))
        }
        OutputDelay::Seconds(s) => Ok((Protocol::scientific(s, 3), delay)),
    }
}

fn slew_from_reply(command: &str, reply: &str) -> Result<SlewRate, N6700Error> {
    let volts_per_second = Protocol::parse_f64(command, reply)?;
    if volts_per_second >= INFINITE_SLEW_REPLY {
        Ok(SlewRate::Infinite)
    } else {
        Ok(SlewRate::VoltsPerMs(volts_per_second / 1000.0))
    }
}

impl<T: ScpiTransport> N6700<T> {
    /// Voltage slew rate in V/ms.
    pub fn get_slew_rate(&mut self, channel: impl Into<Channel>) -> Result<SlewRate, N6700Error> {
        let index = self.addresses.resolve(channel)?;
        let transport = &mut self.transport;
        self.cache.get(index, Attribute::SlewRate, || {
            let command = "SOUR:VOLT:SLEW?";
            let reply = Protocol::query_channel(transport, command, index)?;
            slew_from_reply(command, &reply)
        })
    }

    /// Set the voltage slew rate, given in V/ms (or a sentinel).
    ///
    /// A non-positive rate is rejected rather than clamped.
    ///
    /// ```
    /// use agilent_n6700::{MockTransport, ModuleSpec, N6700, SlewRate};
    ///
    /// let spec = ModuleSpec::new(51.0, 10.2, 55.0, 10.2);
    /// let mut psu = N6700::simulated(MockTransport::new(), vec![spec]);
    /// psu.set_slew_rate(0, 2.0)?;
    /// assert_eq!(psu.get_slew_rate(0)?, SlewRate::VoltsPerMs(2.0));
    /// assert!(psu.set_slew_rate(0, 0.0).is_err());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn set_slew_rate(
        &mut self,
        channel: impl Into<Channel>,
        rate: impl Into<SlewRate>,
    ) -> Result<(), N6700Error> {
        let index = self.addresses.resolve(channel)?;
        let (argument, cached) = slew_argument(index, rate.into())?;
        self.send_channel(&format!("SOUR:VOLT:SLEW {argument}"), index)?;
        self.cache.set(
            index,
            Attribute::SlewRate,
            cached,
            InvalidationScope::AllAttrsAllChannels,
        );
        Ok(())
    }

    /// Delay between an output being enabled and it turning on.
    pub fn get_turn_on_delay(
        &mut self,
        channel: impl Into<Channel>,
    ) -> Result<OutputDelay, N6700Error> {
        self.get_delay(channel, Attribute::TurnOnDelay, "OUTP:DEL:RISE?")
    }

    pub fn set_turn_on_delay(
        &mut self,
        channel: impl Into<Channel>,
        delay: impl Into<OutputDelay>,
    ) -> Result<(), N6700Error> {
        self.set_delay(
            channel,
            Attribute::TurnOnDelay,
            "OUTP:DEL:RISE",
            delay.into(),
        )
    }

    /// Delay between an output being disabled and it turning off.
    pub fn get_turn_off_delay(
        &mut self,
        channel: impl Into<Channel>,
    ) -> Result<OutputDelay, N6700Error> {
        self.get_delay(channel, Attribute::TurnOffDelay, "OUTP:DEL:FALL?")
    }

    pub fn set_turn_off_delay(
        &mut self,
        channel: impl Into<Channel>,
        delay: impl Into<OutputDelay>,
    ) -> Result<(), N6700Error> {
        self.set_delay(
            channel,
            Attribute::TurnOffDelay,
            "OUTP:DEL:FALL",
            delay.into(),
        )
    }

    fn get_delay(
        &mut self,
        channel: impl Into<Channel>,
        attribute: Attribute,
        query: &str,
    ) -> Result<OutputDelay, N6700Error> {
        let index = self.addresses.resolve(channel)?;
        let transport = &mut self.transport;
        self.cache.get(index, attribute, || {
            Protocol::query_channel_f64(transport, query, index).map(OutputDelay::Seconds)
        })
    }

    fn set_delay(
        &mut self,
        channel: impl Into<Channel>,
        attribute: Attribute,
        mnemonic: &str,
        delay: OutputDelay,
    ) -> Result<(), N6700Error> {
        let index = self.addresses.resolve(channel)?;
        let (argument, cached) = delay_argument(index, delay)?;
        self.send_channel(&format!("{mnemonic} {argument}"), index)?;
        self.cache.set(
            index,
            attribute,
            cached,
            InvalidationScope::AllAttrsAllChannels,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::n6700::modules::ModuleSpec;
    use crate::n6700::transport::MockTransport;

    fn live() -> N6700<MockTransport> {
        let mock = MockTransport::new()
            .with_reply("SYST:CHAN?", "+2")
            .with_reply("SYST:CHAN:MOD? (@1)", "N6752A")
            .with_reply("SYST:CHAN:MOD? (@2)", "N6752A");
        let mut psu = N6700::connect(mock, &crate::ModuleTable::builtin()).unwrap();
        psu.transport_mut().clear_log();
        psu
    }

    #[test]
    fn slew_is_sent_in_volts_per_second() {
        assert_eq!(
            slew_argument(0, SlewRate::VoltsPerMs(2.0)).unwrap().0,
            "2.00e+03"
        );
        assert_eq!(slew_argument(0, SlewRate::Infinite).unwrap().0, "INF");
        assert_eq!(
            slew_argument(0, SlewRate::VoltsPerMs(1.0e36)).unwrap(),
            ("MAX".to_string(), SlewRate::Max)
        );
        assert_eq!(
            slew_argument(0, SlewRate::VoltsPerMs(f64::INFINITY)).unwrap(),
            ("INF".to_string(), SlewRate::Infinite)
        );
        assert!(
            slew_argument(0, SlewRate::VoltsPerMs(f64::NEG_INFINITY)).is_err()
        );
        assert!(slew_argument(0, SlewRate::VoltsPerMs(0.0)).is_err());
        assert!(slew_argument(0, SlewRate::VoltsPerMs(-1.0)).is_err());
    }

    #[test]
    fn delays_clamp_to_sentinels() {
        assert_eq!(
            delay_argument(0, OutputDelay::Seconds(0.0)).unwrap().1,
            OutputDelay::Min
        );
        assert_eq!(
            delay_argument(0, OutputDelay::Seconds(1.03e-4)).unwrap().0,
            "MIN"
        );
        assert_eq!(
            delay_argument(0, OutputDelay::Seconds(2000.0)).unwrap().0,
            "MAX"
        );
        assert_eq!(
            delay_argument(0, OutputDelay::Seconds(1.023e3)).unwrap(),
            ("MAX".to_string(), OutputDelay::Max)
        );
        assert_eq!(
            delay_argument(0, OutputDelay::Seconds(1.0229e3)).unwrap(),
            ("1.023e+03".to_string(), OutputDelay::Seconds(1.0229e3))
        );
        assert_eq!(
            delay_argument(0, OutputDelay::Seconds(0.02)).unwrap().0,
            "2.000e-02"
        );
        assert_eq!(delay_argument(0, OutputDelay::Max).unwrap().0, "MAX");
        assert!(delay_argument(0, OutputDelay::Seconds(f64::NAN)).is_err());
    }

    #[test]
    fn slew_write_and_simulated_read_back() {
        let mut psu = live();
        psu.set_slew_rate(0, 2.0).unwrap();
        assert_eq!(
            psu.transport().writes(),
            &["SOUR:VOLT:SLEW 2.00e+03, (@1)".to_string()]
        );
        assert_eq!(psu.get_slew_rate(0).unwrap(), SlewRate::VoltsPerMs(2.0));

        let spec = ModuleSpec::new(51.0, 10.2, 55.0, 10.2);
        let mut sim = N6700::simulated(MockTransport::new(), vec![spec]);
        sim.set_slew_rate(0, 2.0).unwrap();
        assert_eq!(sim.get_slew_rate(0).unwrap(), SlewRate::VoltsPerMs(2.0));
    }

    #[test]
    fn slew_reply_is_converted() {
        let mut psu = live();
        psu.transport_mut().set_reply("SOUR:VOLT:SLEW? (@2)", "+8.00000E+03");
        assert_eq!(psu.get_slew_rate(1).unwrap(), SlewRate::VoltsPerMs(8.0));
        psu.transport_mut().set_reply("SOUR:VOLT:SLEW? (@1)", "9.9E+37");
        assert_eq!(psu.get_slew_rate(0).unwrap(), SlewRate::Infinite);
    }

    #[test]
    fn turn_on_and_turn_off_are_distinct() {
        let mut psu = live();
        psu.transport_mut().set_reply("OUTP:DEL:RISE? (@1)", "2.0E-02");
        psu.transport_mut().set_reply("OUTP:DEL:FALL? (@1)", "1.0E-02");
        assert_eq!(
            psu.get_turn_on_delay(0).unwrap(),
            OutputDelay::Seconds(0.02)
        );
        assert_eq!(
            psu.get_turn_off_delay(0).unwrap(),
            OutputDelay::Seconds(0.01)
        );

        psu.set_turn_on_delay(1, 0.005).unwrap();
        psu.set_turn_off_delay(1, OutputDelay::Max).unwrap();
        assert_eq!(
            psu.transport().writes(),
            &[
                "OUTP:DEL:RISE 5.000e-03, (@2)".to_string(),
                "OUTP:DEL:FALL MAX, (@2)".to_string(),
            ]
        );
    }

    #[test]
    fn delay_write_invalidates_other_channels() {
        let mut psu = live();
        psu.set_voltage_level(0, 3.3).unwrap();
        psu.set_turn_on_delay(1, 0.0).unwrap();
        assert!(!psu.is_cached(0, Attribute::VoltageLevel));
        assert_eq!(psu.get_turn_on_delay(1).unwrap(), OutputDelay::Min);
    }
}
