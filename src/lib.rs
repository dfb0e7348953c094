//! Cell controller command link.
//!
//! Device side: a single byte opcode dispatcher driving the charge, discharge
//! and indicator lines and reporting raw or averaged analog voltages.
//! Host side: a client speaking the same protocol over a serial port.

#[macro_use]
extern crate log;

#[macro_use(block)]
extern crate nb;

extern crate embedded_hal;

#[cfg(feature = "structopt")]
extern crate structopt;

#[cfg(feature = "linux")]
extern crate linux_embedded_hal;

#[cfg(feature = "linux")]
pub mod linux;

pub mod averager;
pub mod client;
pub mod controller;
pub mod encoder;
pub mod lines;
pub mod protocol;
pub mod sim;

pub use averager::{Config, HistoryMode, SampleSource, VoltageAverager};
pub use client::{Client, Options, SerialPort};
pub use controller::Controller;
pub use lines::{Line, LineDriver, Lines, PinState};
pub use protocol::{Action, Channel, Mode, Opcode, Response};

#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum Error<E: core::fmt::Debug> {
    /// Underlying serial, line or ADC failure
    #[error("hardware error: {0:?}")]
    Hardware(E),

    /// No terminator received within the response timeout
    #[error("response timeout")]
    ResponseTimeout,

    /// Response payload did not match the expected shape
    #[error("invalid response: {0:02x?}")]
    InvalidResponse(Vec<u8>),
}

impl<E: core::fmt::Debug> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Self::Hardware(e)
    }
}
