use crate::error::N6700Error;
use crate::n6700::address::ChannelList;
use crate::n6700::transport::ScpiTransport;
use log::debug;

/// Upper bound the instrument reports for an infinite slew rate, in V/s.
pub const INFINITE_SLEW_REPLY: f64 = 9.9e37;

/// SCPI line formatting and reply parsing.
///
/// Every command that carries a channel list is built here, so the
/// 0-based to 1-based shift only ever happens inside [`ChannelList`].
pub struct Protocol;

impl Protocol {
    pub fn write<T: ScpiTransport + ?Sized>(
        transport: &mut T,
        command: &str,
    ) -> Result<(), N6700Error> {
        debug!(">> {command}");
        transport.write(command)
    }

    pub fn query<T: ScpiTransport + ?Sized>(
        transport: &mut T,
        command: &str,
    ) -> Result<String, N6700Error> {
        debug!(">> {command}");
        let reply = transport.query(command)?;
        let reply = reply.trim().to_string();
        debug!("<< {reply}");
        Ok(reply)
    }

    /// Send `<command>, (@n[,m...])`.
    pub fn write_channels<T: ScpiTransport + ?Sized>(
        transport: &mut T,
        command: &str,
        channels: &ChannelList,
    ) -> Result<(), N6700Error> {
        Self::write(
            transport,
            &format!("{command}{}", channels.parameter_suffix()),
        )
    }

    /// Send `<command> (@n[,m...])` for commands that take no other parameter.
    pub fn write_channels_bare<T: ScpiTransport + ?Sized>(
        transport: &mut T,
        command: &str,
        channels: &ChannelList,
    ) -> Result<(), N6700Error> {
        Self::write(transport, &format!("{command}{}", channels.bare_suffix()))
    }

    pub fn query_channel<T: ScpiTransport + ?Sized>(
        transport: &mut T,
        command: &str,
        channel: usize,
    ) -> Result<String, N6700Error> {
        let channels = ChannelList::single(channel);
        Self::query(transport, &format!("{command}{}", channels.bare_suffix()))
    }

    pub fn query_channel_f64<T: ScpiTransport + ?Sized>(
        transport: &mut T,
        command: &str,
        channel: usize,
    ) -> Result<f64, N6700Error> {
        let reply = Self::query_channel(transport, command, channel)?;
        Self::parse_f64(command, &reply)
    }

    pub fn query_channel_bool<T: ScpiTransport + ?Sized>(
        transport: &mut T,
        command: &str,
        channel: usize,
    ) -> Result<bool, N6700Error> {
        let reply = Self::query_channel(transport, command, channel)?;
        Self::parse_bool(command, &reply)
    }

    pub fn parse_f64(command: &str, reply: &str) -> Result<f64, N6700Error> {
        reply
            .trim()
            .parse::<f64>()
            .map_err(|_| N6700Error::parse(command, reply))
    }

    /// Accepts `0`/`1` as well as `OFF`/`ON`.
    pub fn parse_bool(command: &str, reply: &str) -> Result<bool, N6700Error> {
        let reply = reply.trim();
        if reply.eq_ignore_ascii_case("on") {
            return Ok(true);
        }
        if reply.eq_ignore_ascii_case("off") {
            return Ok(false);
        }
        Self::parse_f64(command, reply).map(|value| value != 0.0)
    }

    /// Parse an integer reply, tolerating a leading `+` such as `+4`.
    pub fn parse_count(command: &str, reply: &str) -> Result<usize, N6700Error> {
        reply
            .trim()
            .trim_start_matches('+')
            .parse::<usize>()
            .map_err(|_| N6700Error::parse(command, reply))
    }

    pub fn strip_quotes(reply: &str) -> &str {
        reply.trim().trim_matches('"').trim()
    }

    /// Split a comma separated reply of quoted strings: `"054","J01"`.
    pub fn parse_string_list(reply: &str) -> Vec<String> {
        reply
            .split(',')
            .map(Self::strip_quotes)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Fixed-point argument, e.g. `fixed(12.0, 2)` gives `12.00`.
    pub fn fixed(value: f64, precision: usize) -> String {
        format!("{value:.precision$}")
    }

    /// Exponential argument in the C `%.Ne` layout the instrument expects,
    /// e.g. `scientific(2000.0, 2)` gives `2.00e+03`.
    pub fn scientific(value: f64, precision: usize) -> String {
        let formatted = format!("{value:.precision$e}");
        match formatted.split_once('e') {
            Some((mantissa, exponent)) => {
                let exponent: i32 = exponent.parse().unwrap_or(0);
                let sign = if exponent < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exponent.abs())
            }
            None => formatted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scientific_matches_c_layout() {
        assert_eq!(Protocol::scientific(2000.0, 2), "2.00e+03");
        assert_eq!(Protocol::scientific(0.02, 3), "2.000e-02");
        assert_eq!(Protocol::scientific(1.5e-4, 2), "1.50e-04");
        assert_eq!(Protocol::scientific(0.0, 2), "0.00e+00");
        assert_eq!(Protocol::scientific(1.0e120, 2), "1.00e+120");
    }

    #[test]
    fn fixed_precision() {
        assert_eq!(Protocol::fixed(3.3, 2), "3.30");
        assert_eq!(Protocol::fixed(14.0, 1), "14.0");
        assert_eq!(Protocol::fixed(0.25, 6), "0.250000");
    }

    #[test]
    fn replies() {
        assert_eq!(Protocol::parse_count("SYST:CHAN?", "+4\n").unwrap(), 4);
        assert!(Protocol::parse_count("SYST:CHAN?", "four").is_err());
        assert!(Protocol::parse_bool(":OUTP?", "1").unwrap());
        assert!(!Protocol::parse_bool(":OUTP?", "OFF").unwrap());
        assert_eq!(
            Protocol::parse_f64("SOUR:VOLT?", "+1.20000E+01").unwrap(),
            12.0
        );
        assert_eq!(Protocol::strip_quotes("\"N6752A\"\n"), "N6752A");
        assert_eq!(
            Protocol::parse_string_list("\"054\",\"J01\""),
            vec!["054".to_string(), "J01".to_string()]
        );
        assert!(Protocol::parse_string_list("\"\"").is_empty());
    }
}
