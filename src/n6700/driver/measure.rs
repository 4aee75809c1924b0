use super::N6700;
use crate::error::N6700Error;
use crate::n6700::address::Channel;
use crate::n6700::protocol::Protocol;
use crate::n6700::transport::ScpiTransport;
use crate::types::{MeasurementKind, parse_option};

impl<T: ScpiTransport> N6700<T> {
    /// Measure a quantity at the output terminals. Never cached.
    ///
    /// In simulation this returns `0.0` without touching the instrument;
    /// check [`N6700::is_simulating`] before trusting the value.
    pub fn measure(
        &mut self,
        channel: impl Into<Channel>,
        kind: MeasurementKind,
    ) -> Result<f64, N6700Error> {
        let index = self.addresses.resolve(channel)?;
        if self.simulate {
            return Ok(0.0);
        }
        let command = format!("MEAS:{}?", kind.scpi_token());
        Protocol::query_channel_f64(&mut self.transport, &command, index)
    }

    /// [`N6700::measure`] with the kind given by name, e.g. `"voltage_rms"`.
    pub fn measure_named(
        &mut self,
        channel: impl Into<Channel>,
        kind: &str,
    ) -> Result<f64, N6700Error> {
        let kind: MeasurementKind = parse_option("measurement kind", kind)?;
        self.measure(channel, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::n6700::modules::ModuleSpec;
    use crate::n6700::transport::MockTransport;

    #[test]
    fn measurement_queries_are_never_cached() {
        let mock = MockTransport::new()
            .with_reply("SYST:CHAN?", "+1")
            .with_reply("SYST:CHAN:MOD? (@1)", "N6752A")
            .with_reply("MEAS:VOLT? (@1)", "+3.29871E+00")
            .with_reply("MEAS:POW? (@1)", "1.5");
        let mut psu = N6700::connect(mock, &crate::ModuleTable::builtin()).unwrap();
        assert_eq!(psu.measure(0, MeasurementKind::Voltage).unwrap(), 3.29871);
        assert_eq!(psu.measure(0, MeasurementKind::Voltage).unwrap(), 3.29871);
        assert_eq!(psu.measure_named("output1", "power").unwrap(), 1.5);
        let measured = psu
            .transport()
            .queries()
            .iter()
            .filter(|q| q.starts_with("MEAS:"))
            .count();
        assert_eq!(measured, 3);
    }

    #[test]
    fn unsupported_kind_and_simulation() {
        let spec = ModuleSpec::new(51.0, 10.2, 55.0, 10.2);
        let mut psu = N6700::simulated(MockTransport::new(), vec![spec]);
        assert!(matches!(
            psu.measure_named(0, "resistance"),
            Err(N6700Error::UnsupportedValue { .. })
        ));
        assert_eq!(psu.measure(0, MeasurementKind::CurrentRms).unwrap(), 0.0);
        assert!(psu.transport().queries().is_empty());
    }
}
