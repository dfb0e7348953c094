//! Host side of the link.

use core::marker::PhantomData;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::serial::{Read, Write};

use crate::protocol::{Channel, Mode, Opcode, TERMINATOR};
use crate::Error;

/// Longest payload accepted before a response is considered invalid
pub const MAX_RESPONSE: usize = 16;

pub trait SerialPort<E>: Write<u8, Error = E> + Read<u8, Error = E> {
    fn set_rts(&mut self, level: bool) -> Result<(), E>;
    fn set_dtr(&mut self, level: bool) -> Result<(), E>;
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "structopt", derive(structopt::StructOpt))]
pub struct Options {
    /// Reset the device via DTR/RTS on connection
    #[cfg_attr(feature = "structopt", structopt(long))]
    pub reset: bool,

    /// Timeout to wait for a response terminator
    #[cfg_attr(feature = "structopt", structopt(long, default_value = "500"))]
    pub response_timeout_ms: u32,

    /// Period to poll for response bytes
    #[cfg_attr(feature = "structopt", structopt(long, default_value = "1"))]
    pub poll_delay_ms: u32,

    /// Period to wait for the device to boot after reset
    #[cfg_attr(feature = "structopt", structopt(long, default_value = "2000"))]
    pub init_delay_ms: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            reset: false,
            response_timeout_ms: 500,
            poll_delay_ms: 1,
            init_delay_ms: 2000,
        }
    }
}

pub struct Client<P, D, E> {
    options: Options,
    port: P,
    delay: D,
    _err: PhantomData<E>,
}

impl<P, D, E> Client<P, D, E>
where
    P: SerialPort<E>,
    D: DelayMs<u32>,
    E: core::fmt::Debug,
{
    /// Create a new client instance
    pub fn new(port: P, delay: D, options: Options) -> Self {
        Self {
            options,
            port,
            delay,
            _err: PhantomData,
        }
    }

    /// Optionally reset the device, then check it responds
    pub fn init(&mut self) -> Result<(), Error<E>> {
        if self.options.reset {
            debug!("Resetting device");

            self.port.set_dtr(true)?;
            self.port.set_rts(true)?;

            self.delay.delay_ms(100u32);

            self.port.set_dtr(false)?;
            self.port.set_rts(false)?;

            self.delay.delay_ms(self.options.init_delay_ms);
        }

        debug!("Pinging device");
        self.ping()
    }

    /// Send one opcode and collect the payload preceding the terminator
    pub fn transact(&mut self, opcode: u8) -> Result<Vec<u8>, Error<E>> {
        self.drain()?;

        debug!("Sending opcode 0x{:02x}", opcode);
        block!(self.port.write(opcode))?;
        block!(self.port.flush())?;

        let mut data = Vec::new();
        let mut t = 0;

        loop {
            match self.port.read() {
                Err(nb::Error::WouldBlock) => (),
                Err(nb::Error::Other(e)) => return Err(e.into()),
                Ok(v) if v == TERMINATOR => {
                    debug!("Received response: {:02x?}", data);
                    return Ok(data);
                }
                Ok(v) => {
                    data.push(v);
                    if data.len() > MAX_RESPONSE {
                        debug!("Response overrun: {:02x?}", data);
                        return Err(Error::InvalidResponse(data));
                    }
                    continue;
                }
            };

            // Wait for delay period
            self.delay.delay_ms(self.options.poll_delay_ms);
            t += self.options.poll_delay_ms;

            if t > self.options.response_timeout_ms {
                error!("Receive timeout");
                return Err(Error::ResponseTimeout);
            }
        }
    }

    /// Discard bytes left over from a reply that arrived after its timeout
    fn drain(&mut self) -> Result<(), Error<E>> {
        loop {
            match self.port.read() {
                Err(nb::Error::WouldBlock) => return Ok(()),
                Err(nb::Error::Other(e)) => return Err(e.into()),
                Ok(v) => debug!("Discarding stale byte 0x{:02x}", v),
            }
        }
    }

    fn status(&mut self, opcode: Opcode) -> Result<(), Error<E>> {
        let d = self.transact(opcode as u8)?;
        if d == [0] {
            Ok(())
        } else {
            Err(Error::InvalidResponse(d))
        }
    }

    fn uint(&mut self, opcode: Opcode) -> Result<u32, Error<E>> {
        let d = self.transact(opcode as u8)?;
        parse_uint(&d).ok_or(Error::InvalidResponse(d))
    }

    /// Check the device is responding
    pub fn ping(&mut self) -> Result<(), Error<E>> {
        self.status(Opcode::Ping)
    }

    /// Read an unfiltered ADC sample
    pub fn read_raw(&mut self, channel: Channel) -> Result<u16, Error<E>> {
        let opcode = match channel {
            Channel::A0 => Opcode::ReadA0,
            Channel::A1 => Opcode::ReadA1,
            Channel::A2 => Opcode::ReadA2,
            Channel::A3 => Opcode::ReadA3,
        };
        let d = self.transact(opcode as u8)?;
        match parse_uint(&d) {
            Some(v) if v <= u32::from(u16::MAX) => Ok(v as u16),
            _ => Err(Error::InvalidResponse(d)),
        }
    }

    /// Read the rolling average voltage in millivolts
    pub fn read_voltage(&mut self, channel: Channel) -> Result<u32, Error<E>> {
        let opcode = match channel {
            Channel::A0 => Opcode::ReadV,
            Channel::A1 => Opcode::ReadV1,
            Channel::A2 => Opcode::ReadV2,
            Channel::A3 => Opcode::ReadV3,
        };
        self.uint(opcode)
    }

    pub fn set_led(&mut self, on: bool) -> Result<(), Error<E>> {
        self.status(if on { Opcode::Led1 } else { Opcode::Led0 })
    }

    /// Invert the indicator, returning its new state
    pub fn toggle_led(&mut self) -> Result<bool, Error<E>> {
        let d = self.transact(Opcode::LedToggle as u8)?;
        match d.first() {
            Some(&v) if d.len() == 1 && v <= 1 => Ok(v == 1),
            _ => Err(Error::InvalidResponse(d)),
        }
    }

    pub fn set_charge(&mut self, on: bool) -> Result<(), Error<E>> {
        self.status(if on { Opcode::PinCharge1 } else { Opcode::PinCharge0 })
    }

    pub fn set_discharge(&mut self, on: bool) -> Result<(), Error<E>> {
        self.status(if on {
            Opcode::PinDischarge1
        } else {
            Opcode::PinDischarge0
        })
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), Error<E>> {
        self.status(match mode {
            Mode::Idle => Opcode::ModeIdle,
            Mode::Charge => Opcode::ModeCharge,
            Mode::Discharge => Opcode::ModeDischarge,
        })
    }

    pub fn port(&mut self) -> &mut P {
        &mut self.port
    }
}

/// Parse a decimal payload, rejecting empty, signed or zero-padded text
pub fn parse_uint(d: &[u8]) -> Option<u32> {
    if d.is_empty() || !d.iter().all(u8::is_ascii_digit) || (d.len() > 1 && d[0] == b'0') {
        return None;
    }
    core::str::from_utf8(d).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::parse_uint;

    #[test]
    fn decimal_payloads() {
        assert_eq!(parse_uint(b"0"), Some(0));
        assert_eq!(parse_uint(b"1206"), Some(1206));
        assert_eq!(parse_uint(b""), None);
        assert_eq!(parse_uint(b"012"), None);
        assert_eq!(parse_uint(b"-1"), None);
        assert_eq!(parse_uint(b"12a"), None);
        assert_eq!(parse_uint(b"99999999999"), None);
    }
}
