#![allow(dead_code)]

use std::collections::VecDeque;
use std::convert::Infallible;

use embedded_hal::serial::{Read, Write};
use embedded_hal_mock::delay::MockNoop;

use cell_link::averager::Config;
use cell_link::protocol::CHANNELS;
use cell_link::sim::{SimLines, SimSource};
use cell_link::Controller;

/// Serial port backed by in-memory queues
#[derive(Debug, Default)]
pub struct Port {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
}

impl Read<u8> for Port {
    type Error = Infallible;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

impl Write<u8> for Port {
    type Error = Infallible;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        self.tx.push(word);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}

pub type SimController = Controller<Port, SimLines, SimSource, MockNoop, Infallible>;

pub fn controller(raw: [u16; CHANNELS], config: Config) -> SimController {
    Controller::new(
        Port::default(),
        SimLines::default(),
        SimSource::new(raw),
        MockNoop::new(),
        config,
    )
    .unwrap()
}

/// Deliver one opcode and return everything written in reply
pub fn send(c: &mut SimController, opcode: u8) -> Vec<u8> {
    c.port().rx.push_back(opcode);
    c.poll().unwrap();
    std::mem::take(&mut c.port().tx)
}
