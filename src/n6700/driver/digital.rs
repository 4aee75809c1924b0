//! Rear-panel digital control port.

use super::N6700;
use crate::error::N6700Error;
use crate::n6700::protocol::Protocol;
use crate::n6700::transport::ScpiTransport;
use crate::types::{PinFunction, PinPolarity};

pub const DIGITAL_PIN_COUNT: u8 = 7;

impl<T: ScpiTransport> N6700<T> {
    /// State of the digital port inputs as a bit mask (pin 1 is bit 0).
    pub fn digital_input(&mut self) -> Result<u8, N6700Error> {
        if self.simulate {
            return Ok(0);
        }
        let command = "SOUR:DIG:INP:DATA?";
        let reply = Protocol::query(&mut self.transport, command)?;
        let value = Protocol::parse_f64(command, &reply)?;
        if !(0.0..=255.0).contains(&value) || value.fract() != 0.0 {
            return Err(N6700Error::parse(command, &reply));
        }
        Ok(value as u8)
    }

    /// Drive the digital port outputs from a bit mask.
    pub fn set_digital_output(&mut self, value: u8) -> Result<(), N6700Error> {
        self.send(&format!("SOUR:DIG:OUTP:DATA {value}"))
    }

    pub fn configure_digital_pin(
        &mut self,
        pin: u8,
        function: PinFunction,
        polarity: PinPolarity,
    ) -> Result<(), N6700Error> {
        if !(1..=DIGITAL_PIN_COUNT).contains(&pin) {
            return Err(N6700Error::unsupported("digital pin", pin.to_string()));
        }
        self.send(&format!("SOUR:DIG:PIN{pin}:FUNC {function}"))?;
        self.send(&format!("SOUR:DIG:PIN{pin}:POL {polarity}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::n6700::modules::ModuleSpec;
    use crate::n6700::transport::MockTransport;

    fn live() -> N6700<MockTransport> {
        let mock = MockTransport::new()
            .with_reply("SYST:CHAN?", "+1")
            .with_reply("SYST:CHAN:MOD? (@1)", "N6752A");
        let mut psu = N6700::connect(mock, &crate::ModuleTable::builtin()).unwrap();
        psu.transport_mut().clear_log();
        psu
    }

    #[test]
    fn input_mask() {
        let mut psu = live();
        psu.transport_mut().set_reply("SOUR:DIG:INP:DATA?", "+5");
        assert_eq!(psu.digital_input().unwrap(), 5);
        psu.transport_mut().set_reply("SOUR:DIG:INP:DATA?", "512");
        assert!(matches!(psu.digital_input(), Err(N6700Error::Protocol(_))));
    }

    #[test]
    fn output_and_pin_configuration() {
        let mut psu = live();
        psu.set_digital_output(0x2a).unwrap();
        psu.configure_digital_pin(3, PinFunction::TInput, PinPolarity::Negative)
            .unwrap();
        assert_eq!(
            psu.transport().writes(),
            &[
                "SOUR:DIG:OUTP:DATA 42".to_string(),
                "SOUR:DIG:PIN3:FUNC TINPUT".to_string(),
                "SOUR:DIG:PIN3:POL NEG".to_string(),
            ]
        );
    }

    #[test]
    fn pin_number_is_checked_in_simulation() {
        let spec = ModuleSpec::new(51.0, 10.2, 55.0, 10.2);
        let mut psu = N6700::simulated(MockTransport::new(), vec![spec]);
        for pin in [0, 8] {
            assert!(matches!(
                psu.configure_digital_pin(pin, PinFunction::Dio, PinPolarity::Positive),
                Err(N6700Error::UnsupportedValue { .. })
            ));
        }
        psu.configure_digital_pin(7, PinFunction::Fault, PinPolarity::Positive)
            .unwrap();
        assert_eq!(psu.digital_input().unwrap(), 0);
    }
}
