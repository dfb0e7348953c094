//! Device side command dispatcher.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::serial::{Read, Write};

use crate::averager::{Config, SampleSource, VoltageAverager};
use crate::encoder::Encoder;
use crate::lines::{Line, LineDriver, Lines, PinState};
use crate::protocol::{Action, Mode, Response};
use crate::Error;

pub struct Controller<P, L, A, D, E> {
    port: P,
    lines: Lines<L, E>,
    averager: VoltageAverager<A, D, E>,
}

impl<P, L, A, D, E> Controller<P, L, A, D, E>
where
    P: Read<u8> + Write<u8>,
    <P as Read<u8>>::Error: core::fmt::Debug,
    <P as Write<u8>>::Error: core::fmt::Debug,
    L: LineDriver<E>,
    A: SampleSource<E>,
    D: DelayMs<u32>,
    E: core::fmt::Debug,
{
    /// Create a new controller instance, driving all lines to the safe
    /// startup state before any opcode is serviced
    pub fn new(port: P, lines: L, source: A, delay: D, config: Config) -> Result<Self, Error<E>> {
        let mut c = Self {
            port,
            lines: Lines::new(lines),
            averager: VoltageAverager::new(source, delay, config),
        };

        debug!("Applying startup line state");
        c.lines.apply(PinState::default())?;

        Ok(c)
    }

    /// Service requests forever
    pub fn run(&mut self) -> ! {
        loop {
            if let Err(e) = self.poll() {
                error!("Command failed: {:?}", e);
            }
        }
    }

    /// Handle at most one pending opcode.
    ///
    /// Returns the executed action, `None` if no byte was waiting. Unknown
    /// opcodes and failed actions emit nothing.
    pub fn poll(&mut self) -> Result<Option<Action>, Error<E>> {
        let b = match self.port.read() {
            Err(nb::Error::WouldBlock) => return Ok(None),
            Err(nb::Error::Other(e)) => {
                warn!("Serial read error: {:?}", e);
                return Ok(None);
            }
            Ok(b) => b,
        };

        let action = Action::from(b);
        debug!("Received opcode 0x{:02x}: {:?}", b, action);

        match self.execute(action)? {
            Some(response) => {
                debug!("Responding: {:?}", response);
                Encoder::new(&mut self.port).respond(response);
            }
            None => debug!("Ignoring unknown opcode 0x{:02x}", b),
        }

        Ok(Some(action))
    }

    /// Perform an action, returning the payload to send
    pub fn execute(&mut self, action: Action) -> Result<Option<Response>, Error<E>> {
        let r = match action {
            Action::ReadRaw(c) => Response::Uint(u32::from(self.averager.raw_sample(c)?)),
            Action::ReadVoltage(c) => Response::Uint(self.averager.averaged_voltage(c)?),
            Action::Led(on) => {
                self.lines.set(Line::Indicator, on)?;
                Response::Status
            }
            Action::LedToggle => {
                let on = !self.lines.get(Line::Indicator)?;
                self.lines.set(Line::Indicator, on)?;
                Response::Bool(on)
            }
            Action::Discharge(on) => {
                self.lines.set(Line::Discharge, on)?;
                Response::Status
            }
            Action::Charge(on) => {
                self.lines.set(Line::Charge, on)?;
                Response::Status
            }
            Action::Mode(m) => {
                self.set_mode(m)?;
                Response::Status
            }
            Action::Ping => Response::Status,
            Action::Unknown(_) => return Ok(None),
        };

        Ok(Some(r))
    }

    // The line being released is always written first so both are never on together
    fn set_mode(&mut self, mode: Mode) -> Result<(), E> {
        info!("Entering {:?} mode", mode);

        match mode {
            Mode::Idle => {
                self.lines.set(Line::Discharge, false)?;
                self.lines.set(Line::Charge, false)
            }
            Mode::Charge => {
                self.lines.set(Line::Discharge, false)?;
                self.lines.set(Line::Charge, true)
            }
            Mode::Discharge => {
                self.lines.set(Line::Charge, false)?;
                self.lines.set(Line::Discharge, true)
            }
        }
    }

    /// Logical line states
    pub fn pin_state(&mut self) -> Result<PinState, Error<E>> {
        Ok(self.lines.state()?)
    }

    pub fn lines(&self) -> &L {
        self.lines.driver()
    }

    pub fn lines_mut(&mut self) -> &mut L {
        self.lines.driver_mut()
    }

    pub fn averager(&mut self) -> &mut VoltageAverager<A, D, E> {
        &mut self.averager
    }

    pub fn port(&mut self) -> &mut P {
        &mut self.port
    }
}
