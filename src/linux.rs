use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

use serial_core::{
    BaudRate, CharSize, Error as SerialError, FlowControl, Parity, SerialDevice as _,
    SerialPortSettings as _, StopBits,
};
use linux_embedded_hal::{Delay, Serial};

use crate::averager::Config;
use crate::protocol::CHANNELS;
use crate::sim::{SimLines, SimSource};
use crate::{Client, Controller, Options, SerialPort};

fn io_kind(e: SerialError) -> IoErrorKind {
    std::io::Error::from(e).kind()
}

impl SerialPort<IoErrorKind> for Serial {
    fn set_rts(&mut self, level: bool) -> Result<(), IoErrorKind> {
        self.0.set_rts(level).map_err(io_kind)
    }
    fn set_dtr(&mut self, level: bool) -> Result<(), IoErrorKind> {
        self.0.set_dtr(level).map_err(io_kind)
    }
}

/// Open a tty at the link settings (8N1, no flow control)
pub fn open<P: AsRef<Path>>(port: P, baud: usize) -> Result<Serial, SerialError> {
    // Open port
    let mut port = Serial::open(port.as_ref())?;

    // Apply settings
    let mut settings = port.0.read_settings()?;

    settings.set_char_size(CharSize::Bits8);
    settings.set_stop_bits(StopBits::Stop1);
    settings.set_baud_rate(BaudRate::from_speed(baud))?;
    settings.set_flow_control(FlowControl::FlowNone);
    settings.set_parity(Parity::ParityNone);

    port.0.write_settings(&settings)?;

    Ok(port)
}

impl Client<Serial, Delay, IoErrorKind> {
    /// Create a new linux serial port client instance
    pub fn linux<P: AsRef<Path>>(
        port: P,
        baud: usize,
        options: Options,
    ) -> Result<Self, SerialError> {
        let port = open(port, baud)?;

        // Return instance
        Ok(Self::new(port, Delay {}, options))
    }
}

impl Controller<Serial, SimLines, SimSource, Delay, IoErrorKind> {
    /// Run the dispatcher on a linux tty with simulated lines and samples
    pub fn linux_sim<P: AsRef<Path>>(
        port: P,
        baud: usize,
        raw: [u16; CHANNELS],
        config: Config,
    ) -> anyhow::Result<Self> {
        let port = open(port, baud)?;

        let c = Self::new(
            port,
            SimLines::default(),
            SimSource::new(raw),
            Delay {},
            config,
        )?;

        Ok(c)
    }
}
