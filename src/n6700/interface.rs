use crate::error::N6700Error;
use crate::n6700::address::Channel;
use crate::n6700::cache::{Attribute, InvalidationScope};
use crate::n6700::modules::ModuleSpec;
use crate::n6700::protocol::Protocol;

/// A numeric per-channel setting bounded by the installed module.
///
/// Implementors only describe the setting: its cache slot, its SCPI
/// mnemonic and wire precision, and which module limit bounds it. The
/// driver supplies the get/set plumbing once for all of them.
pub trait RangedProperty {
    const ATTRIBUTE: Attribute;
    /// Mnemonic without the trailing `?`, e.g. `SOUR:VOLT`.
    const MNEMONIC: &'static str;
    /// Decimal places sent on the wire.
    const PRECISION: usize;
    const SCOPE: InvalidationScope = InvalidationScope::ThisAttrOnly;

    /// Upper bound for this setting on a module; the lower bound is 0.
    fn limit(spec: &ModuleSpec) -> f64;

    fn validate(channel: usize, spec: &ModuleSpec, value: f64) -> Result<f64, N6700Error> {
        let max = Self::limit(spec);
        if !value.is_finite() || value < 0.0 || value > max {
            return Err(N6700Error::OutOfRange {
                attribute: Self::ATTRIBUTE.name(),
                channel,
                value,
                min: 0.0,
                max,
            });
        }
        Ok(value)
    }

    fn query() -> String {
        format!("{}?", Self::MNEMONIC)
    }

    fn command(value: f64) -> String {
        format!(
            "{} {}",
            Self::MNEMONIC,
            Protocol::fixed(value, Self::PRECISION)
        )
    }
}

/// Operations that address several channels with a single command so the
/// instrument applies them on the same hardware cycle.
pub trait BatchAddressable {
    fn set_outputs_enabled<I, C>(&mut self, enabled: bool, channels: I) -> Result<(), N6700Error>
    where
        I: IntoIterator<Item = C>,
        C: Into<Channel>;

    fn set_channel_coupling<I, C>(&mut self, enabled: bool, channels: I) -> Result<(), N6700Error>
    where
        I: IntoIterator<Item = C>,
        C: Into<Channel>;

    fn trigger_initiate<I, C>(&mut self, channels: I) -> Result<(), N6700Error>
    where
        I: IntoIterator<Item = C>,
        C: Into<Channel>;
}

/// The ranged settings of an N6700 output.
pub mod ranged {
    use super::*;

    pub struct VoltageLevel;
    pub struct CurrentLimit;
    pub struct OvpLimit;
    pub struct TriggeredVoltageLevel;
    pub struct TriggeredCurrentLimit;

    impl RangedProperty for VoltageLevel {
        const ATTRIBUTE: Attribute = Attribute::VoltageLevel;
        const MNEMONIC: &'static str = "SOUR:VOLT";
        const PRECISION: usize = 2;

        fn limit(spec: &ModuleSpec) -> f64 {
            spec.voltage_max
        }
    }

    impl RangedProperty for CurrentLimit {
        const ATTRIBUTE: Attribute = Attribute::CurrentLimit;
        const MNEMONIC: &'static str = "SOUR:CURR";
        const PRECISION: usize = 2;

        fn limit(spec: &ModuleSpec) -> f64 {
            spec.current_max
        }
    }

    impl RangedProperty for OvpLimit {
        const ATTRIBUTE: Attribute = Attribute::OvpLimit;
        const MNEMONIC: &'static str = "SOUR:VOLT:PROT:LEV";
        const PRECISION: usize = 1;

        fn limit(spec: &ModuleSpec) -> f64 {
            spec.ovp_max
        }
    }

    impl RangedProperty for TriggeredVoltageLevel {
        const ATTRIBUTE: Attribute = Attribute::TriggeredVoltageLevel;
        const MNEMONIC: &'static str = "SOUR:VOLT:LEV:TRIG";
        const PRECISION: usize = 6;

        fn limit(spec: &ModuleSpec) -> f64 {
            spec.voltage_max
        }
    }

    impl RangedProperty for TriggeredCurrentLimit {
        const ATTRIBUTE: Attribute = Attribute::TriggeredCurrentLimit;
        const MNEMONIC: &'static str = "SOUR:CURR:LEV:TRIG";
        const PRECISION: usize = 6;

        fn limit(spec: &ModuleSpec) -> f64 {
            spec.current_max
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ranged::*;
    use super::*;

    #[test]
    fn ranged_commands() {
        assert_eq!(VoltageLevel::command(3.3), "SOUR:VOLT 3.30");
        assert_eq!(OvpLimit::command(4.3), "SOUR:VOLT:PROT:LEV 4.3");
        assert_eq!(
            TriggeredCurrentLimit::command(0.5),
            "SOUR:CURR:LEV:TRIG 0.500000"
        );
        assert_eq!(CurrentLimit::query(), "SOUR:CURR?");
    }

    #[test]
    fn ranged_validation() {
        let spec = ModuleSpec::new(51.0, 10.2, 55.0, 10.2);
        assert_eq!(VoltageLevel::validate(0, &spec, 51.0).unwrap(), 51.0);
        assert!(VoltageLevel::validate(0, &spec, 51.01).is_err());
        assert!(CurrentLimit::validate(0, &spec, -0.1).is_err());
        assert!(OvpLimit::validate(0, &spec, f64::NAN).is_err());
        match OvpLimit::validate(2, &spec, 60.0) {
            Err(N6700Error::OutOfRange { attribute, channel, max, .. }) => {
                assert_eq!(attribute, "ovp_limit");
                assert_eq!(channel, 2);
                assert_eq!(max, 55.0);
            }
            other => panic!("Unexpected result: {:?}", other),
        }
    }
}
